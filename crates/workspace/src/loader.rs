//! Workspace discovery
//!
//! Starting from any path inside a multi-module project, the loader finds the
//! nearest descriptor and walks the graph depth-first: parents before children,
//! submodules declared by each loaded project, then enclosing projects above the
//! start. Every descriptor is read at most once per run.

use crate::error::{LoaderError, ModuleError};
use crate::model::profile::modules_with_profiles;
use crate::model::utils::{descriptor_in, descriptor_path, group_id, normalize_path};
use crate::model::{read_model, EffectiveModelBuilder, RawModel};
use crate::module::ModuleId;
use crate::repository::ArtifactCache;
use crate::workspace::Workspace;
use mvnspace_core::{FileSystem, WorkspaceConfig};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct WorkspaceLoader {
    fs: Arc<dyn FileSystem>,
    config: WorkspaceConfig,
    workspace: Workspace,
    /// Raw models by module directory
    raw_models: HashMap<PathBuf, Arc<RawModel>>,
    /// Registered modules by module directory
    projects: HashMap<PathBuf, ModuleId>,
    /// Directories on the current recursion path
    in_progress: HashSet<PathBuf>,
    requested: Option<PathBuf>,
}

impl WorkspaceLoader {
    pub fn new(fs: Arc<dyn FileSystem>, config: WorkspaceConfig) -> Self {
        let workspace = Workspace::from_config(Arc::clone(&fs), &config);
        Self {
            fs,
            config,
            workspace,
            raw_models: HashMap::new(),
            projects: HashMap::new(),
            in_progress: HashSet::new(),
            requested: None,
        }
    }

    pub fn with_model_builder(mut self, builder: Arc<dyn EffectiveModelBuilder>) -> Self {
        self.workspace = self.workspace.with_model_builder(builder);
        self
    }

    pub fn with_artifact_cache(mut self, cache: Arc<dyn ArtifactCache>) -> Self {
        self.workspace = self.workspace.with_artifact_cache(cache);
        self
    }

    /// Discovers the workspace around `start` and makes the module at `start` current
    pub fn load_workspace(mut self, start: &Path) -> Result<Workspace, LoaderError> {
        let start = normalize_path(start);
        let current_pom = self.locate_descriptor(&start)?;
        let current_dir = module_dir(&current_pom);
        self.requested = Some(current_dir.clone());
        info!(descriptor = %current_pom.display(), "Discovering workspace");

        let root = self.config.root_project_dir.as_deref().map(normalize_path);
        if let Some(root) = &root {
            match descriptor_in(self.fs.as_ref(), root, self.alternate_pom()) {
                Some(root_pom) => {
                    debug!(root = %root.display(), "Loading top-level project");
                    self.load_project(&root_pom, None)?;
                }
                None => warn!(
                    root = %root.display(),
                    "Top-level project directory has no descriptor"
                ),
            }
        }

        let current = match self.projects.get(&current_dir) {
            Some(id) => *id,
            None => self.load_project(&current_pom, None)?,
        };
        self.sweep_ancestors(&current_dir, root.as_deref())?;
        self.workspace.set_current(current);

        self.workspace
            .module(current)
            .version()
            .map_err(|e| LoaderError::module(&current_pom, e))?;
        for module in self.workspace.modules() {
            if let Err(e) = module.version() {
                warn!(module = %module.coordinate(), error = %e, "Module version is unresolved");
            }
        }

        info!(
            modules = self.workspace.len(),
            current = %self.workspace.module(current).coordinate(),
            "Workspace discovered"
        );
        Ok(self.workspace)
    }

    /// Loads only the module at `start` into a detached workspace. Falls back to
    /// full discovery when its version depends on the rest of the workspace.
    pub fn load_module(mut self, start: &Path) -> Result<Workspace, LoaderError> {
        let start = normalize_path(start);
        let pom = self.locate_descriptor(&start)?;
        let raw = self.raw_model(&pom)?;

        let mut detached = self.workspace.empty_copy(true);
        match detached.add_module(raw) {
            Ok(id) => {
                detached.set_current(id);
                if self.config.effective_model_builder {
                    detached
                        .module(id)
                        .effective_model()
                        .map_err(|source| LoaderError::ModelBuildFailure {
                            path: pom.clone(),
                            source,
                        })?;
                }
                debug!(descriptor = %pom.display(), "Loaded standalone module");
                Ok(detached)
            }
            Err(ModuleError::UnresolvedVersion { version, .. }) => {
                debug!(
                    descriptor = %pom.display(),
                    version = %version,
                    "Version needs the workspace, falling back to discovery"
                );
                self.load_workspace(&start)
            }
            Err(e) => Err(LoaderError::module(&pom, e)),
        }
    }

    fn alternate_pom(&self) -> Option<&str> {
        self.config.alternate_pom.as_deref()
    }

    /// The descriptor at `start`, or the nearest one in `start` and its ancestors
    fn locate_descriptor(&self, start: &Path) -> Result<PathBuf, LoaderError> {
        if self.fs.is_file(start) {
            return Ok(start.to_path_buf());
        }
        let mut dir = Some(start);
        while let Some(current) = dir {
            if let Some(pom) = descriptor_in(self.fs.as_ref(), current, self.alternate_pom()) {
                return Ok(pom);
            }
            dir = current.parent();
        }
        Err(LoaderError::NotFound(start.to_path_buf()))
    }

    fn raw_model(&mut self, pom: &Path) -> Result<Arc<RawModel>, LoaderError> {
        let dir = module_dir(pom);
        if let Some(model) = self.raw_models.get(&dir) {
            return Ok(Arc::clone(model));
        }
        let model = Arc::new(
            read_model(self.fs.as_ref(), pom).map_err(|e| LoaderError::module(pom, e))?,
        );
        self.raw_models.insert(dir, Arc::clone(&model));
        Ok(model)
    }

    /// Descriptor of the local parent, if `relativePath` leads to the declared parent
    fn local_parent(&mut self, raw: &RawModel) -> Result<Option<PathBuf>, LoaderError> {
        let Some(parent) = raw.parent.as_ref() else {
            return Ok(None);
        };
        let Some(relative) = parent.local_path() else {
            return Ok(None);
        };
        let candidate = normalize_path(&raw.dir().join(relative));
        let Some(pom) = descriptor_path(self.fs.as_ref(), &candidate, self.alternate_pom()) else {
            return Ok(None);
        };

        let model = self.raw_model(&pom)?;
        let matches = model.artifact_id == parent.artifact_id
            && group_id(&model).is_ok_and(|g| g == parent.group_id);
        if matches {
            Ok(Some(pom))
        } else {
            debug!(
                child = %raw.descriptor.display(),
                candidate = %pom.display(),
                parent = %parent.coordinate(),
                "Descriptor at the parent path is not the declared parent"
            );
            Ok(None)
        }
    }

    fn load_project(&mut self, pom: &Path, skip: Option<&Path>) -> Result<ModuleId, LoaderError> {
        let dir = module_dir(pom);
        if let Some(id) = self.projects.get(&dir) {
            return Ok(*id);
        }
        let raw = self.raw_model(pom)?;

        self.in_progress.insert(dir.clone());
        let result = self.load_project_in_progress(pom, &dir, raw, skip);
        self.in_progress.remove(&dir);
        result
    }

    fn load_project_in_progress(
        &mut self,
        pom: &Path,
        dir: &Path,
        raw: Arc<RawModel>,
        skip: Option<&Path>,
    ) -> Result<ModuleId, LoaderError> {
        if let Some(parent_pom) = self.local_parent(&raw)? {
            let parent_dir = module_dir(&parent_pom);
            if self.in_progress.contains(&parent_dir) {
                debug!(descriptor = %pom.display(), parent = %parent_pom.display(), "Parent is already being loaded");
            } else {
                match self.load_project(&parent_pom, Some(dir)) {
                    Ok(_) => {}
                    // the parent coordinate still resolves to the module loaded first
                    Err(LoaderError::DuplicateModule { existing, .. }) => debug!(
                        descriptor = %pom.display(),
                        parent = %parent_pom.display(),
                        existing = %existing.display(),
                        "Parent coordinate is loaded from another directory"
                    ),
                    Err(e) => return Err(e),
                }
            }
        }

        // loading the parent may have loaded this project as one of its modules
        if let Some(id) = self.projects.get(dir) {
            return Ok(*id);
        }

        let id = self.register(pom, dir, raw)?;
        self.load_project_modules(id, dir, skip)?;
        Ok(id)
    }

    fn register(&mut self, pom: &Path, dir: &Path, raw: Arc<RawModel>) -> Result<ModuleId, LoaderError> {
        let id = self
            .workspace
            .add_module(raw)
            .map_err(|e| LoaderError::module(pom, e))?;
        let registered = self.workspace.module(id);
        if registered.dir() != dir {
            return Err(LoaderError::DuplicateModule {
                path: pom.to_path_buf(),
                coordinate: registered.coordinate().clone(),
                existing: registered.dir().to_path_buf(),
            });
        }
        self.projects.insert(dir.to_path_buf(), id);

        if self.config.effective_model_builder {
            let model = self
                .workspace
                .module(id)
                .effective_model()
                .map_err(|source| LoaderError::ModelBuildFailure {
                    path: pom.to_path_buf(),
                    source,
                })?;
            self.workspace.set_effective_model(id, model);
        }
        Ok(id)
    }

    fn submodules(&self, id: ModuleId) -> Vec<String> {
        let module = self.workspace.module(id);
        match module.cached_effective_model() {
            Some(effective) => effective.modules.clone(),
            None => modules_with_profiles(
                module.raw(),
                self.workspace.system_properties(),
                self.workspace.profile_selection(),
            ),
        }
    }

    fn load_project_modules(&mut self, id: ModuleId, dir: &Path, skip: Option<&Path>) -> Result<(), LoaderError> {
        for module in self.submodules(id) {
            let path = normalize_path(&dir.join(&module));
            let Some(module_pom) = descriptor_path(self.fs.as_ref(), &path, self.alternate_pom()) else {
                warn!(module = %module, parent = %dir.display(), "Module has no descriptor, skipping");
                continue;
            };
            let module_dir = module_dir(&module_pom);
            if skip == Some(module_dir.as_path())
                || self.projects.contains_key(&module_dir)
                || self.in_progress.contains(&module_dir)
            {
                continue;
            }

            if let Err(e) = self.load_project(&module_pom, None) {
                if e.is_always_fatal() || self.requested.as_deref() == Some(module_dir.as_path()) {
                    return Err(e);
                }
                warn!(
                    descriptor = %module_pom.display(),
                    error = %error_chain(&e),
                    "Skipping module that failed to load"
                );
            }
        }
        Ok(())
    }

    /// Loads enclosing projects above `start` while each parent directory holds a
    /// descriptor, never leaving `root` when one is pinned
    fn sweep_ancestors(&mut self, start: &Path, root: Option<&Path>) -> Result<(), LoaderError> {
        let mut dir = start.to_path_buf();
        while let Some(parent_dir) = dir.parent().map(Path::to_path_buf) {
            if root.is_some_and(|root| !parent_dir.starts_with(root)) {
                break;
            }
            let Some(pom) = descriptor_in(self.fs.as_ref(), &parent_dir, self.alternate_pom()) else {
                break;
            };
            if !self.projects.contains_key(&parent_dir) {
                if let Err(e) = self.load_project(&pom, Some(&dir)) {
                    if e.is_always_fatal() {
                        return Err(e);
                    }
                    warn!(
                        descriptor = %pom.display(),
                        error = %error_chain(&e),
                        "Stopping at enclosing project that failed to load"
                    );
                    break;
                }
            }
            dir = parent_dir;
        }
        Ok(())
    }
}

fn module_dir(pom: &Path) -> PathBuf {
    pom.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// `outer: cause: root cause`
pub fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

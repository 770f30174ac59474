//! Discovered modules
//!
//! A [`LocalModule`] lives in the [`Workspace`] arena. Anything that needs the rest
//! of the graph (parent lookup, inherited directory overrides, the shared version
//! slot) goes through a [`ModuleRef`], a borrowed handle pairing the module with its
//! workspace.

pub mod descriptor;

use crate::coords::Coordinate;
use crate::error::{ModelBuildError, ModuleError};
use crate::model::utils::{self, interpolate, is_unresolved_version, normalize_path, resolve_version};
use crate::model::{Build, ModelBuildRequest, RawModel, Resource};
use crate::workspace::Workspace;
use serde::Serialize;
use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub use descriptor::{ModuleDependency, ModuleDescriptor, PathFilter, SourceDir, SourceSet};

pub const DEFAULT_OUTPUT_DIR: &str = "target";
pub const DEFAULT_CLASSES_DIR: &str = "classes";
pub const DEFAULT_TEST_CLASSES_DIR: &str = "test-classes";
pub const DEFAULT_SOURCES_DIR: &str = "src/main/java";
pub const DEFAULT_TEST_SOURCES_DIR: &str = "src/test/java";
pub const DEFAULT_GENERATED_SOURCES_DIR: &str = "generated-sources/annotations";
pub const DEFAULT_RESOURCES_DIR: &str = "src/main/resources";
pub const DEFAULT_TEST_RESOURCES_DIR: &str = "src/test/resources";

/// Index of a module in its workspace arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId(pub(crate) usize);

/// A resource directory and where its content lands in the build output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDir {
    pub dir: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Default)]
struct DirCache {
    output: OnceCell<PathBuf>,
    classes: OnceCell<PathBuf>,
    test_classes: OnceCell<PathBuf>,
    sources: OnceCell<PathBuf>,
    test_sources: OnceCell<PathBuf>,
    generated_sources: OnceCell<PathBuf>,
    resources: OnceCell<Vec<ResourceDir>>,
    test_resources: OnceCell<Vec<ResourceDir>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildDir {
    Output,
    Classes,
    TestClasses,
    Sources,
    TestSources,
}

impl BuildDir {
    fn declared(self, build: &Build) -> Option<&str> {
        match self {
            BuildDir::Output => build.directory.as_deref(),
            BuildDir::Classes => build.output_directory.as_deref(),
            BuildDir::TestClasses => build.test_output_directory.as_deref(),
            BuildDir::Sources => build.source_directory.as_deref(),
            BuildDir::TestSources => build.test_source_directory.as_deref(),
        }
    }
}

pub struct LocalModule {
    id: ModuleId,
    coordinate: Coordinate,
    raw_version: String,
    version: OnceCell<String>,
    raw: Arc<RawModel>,
    effective: OnceCell<Arc<RawModel>>,
    dirs: DirCache,
    pub(crate) descriptor: OnceCell<Arc<ModuleDescriptor>>,
}

impl fmt::Debug for LocalModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalModule")
            .field("id", &self.id)
            .field("coordinate", &self.coordinate)
            .field("raw_version", &self.raw_version)
            .field("version", &self.version.get())
            .field("dir", &self.dir())
            .finish()
    }
}

impl LocalModule {
    /// Builds a module from its raw model.
    ///
    /// Returns the module and, when this module turned a placeholder into a
    /// concrete version, that version so the workspace can publish it.
    pub(crate) fn new(
        id: ModuleId,
        raw: Arc<RawModel>,
        ws: &Workspace,
    ) -> Result<(Self, Option<String>), ModuleError> {
        let group_id = utils::group_id(&raw)?.to_string();
        let raw_version = utils::raw_version(&raw)?.to_string();
        let coordinate = Coordinate::new(group_id, &raw.artifact_id);

        let version = OnceCell::new();
        let mut published = None;
        if is_unresolved_version(&raw_version) {
            let lineage = raw
                .parent
                .as_ref()
                .and_then(|p| ws.project_by(&p.coordinate()))
                .map(|p| p.lineage())
                .unwrap_or_default();
            let maps = std::iter::once(&raw.properties)
                .chain(lineage.iter().map(|m| &m.module.raw.properties));

            match resolve_version(&raw_version, maps, ws.system_properties()) {
                Some(resolved) => {
                    debug!(module = %coordinate, raw = %raw_version, version = %resolved, "Resolved version placeholder");
                    published = Some(resolved.clone());
                    let _ = version.set(resolved);
                }
                None if ws.is_detached() => {
                    return Err(ModuleError::UnresolvedVersion {
                        coordinate,
                        version: raw_version,
                        descriptor: raw.descriptor.clone(),
                    })
                }
                None => {
                    debug!(module = %coordinate, raw = %raw_version, "Version pending on the workspace");
                }
            }
        } else {
            let _ = version.set(raw_version.clone());
        }

        Ok((
            Self {
                id,
                coordinate,
                raw_version,
                version,
                raw,
                effective: OnceCell::new(),
                dirs: DirCache::default(),
                descriptor: OnceCell::new(),
            },
            published,
        ))
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn group_id(&self) -> &str {
        &self.coordinate.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.coordinate.artifact_id
    }

    /// Version as declared, possibly a placeholder
    pub fn raw_version(&self) -> &str {
        &self.raw_version
    }

    pub fn dir(&self) -> &Path {
        self.raw.dir()
    }

    pub fn descriptor_file(&self) -> &Path {
        &self.raw.descriptor
    }

    pub fn raw_model(&self) -> &RawModel {
        &self.raw
    }

    pub fn packaging(&self) -> &str {
        &self.raw.packaging
    }

    pub fn is_aggregator(&self) -> bool {
        self.raw.is_aggregator()
    }

    /// Coordinate of the declared parent, local or not
    pub fn parent_coordinate(&self) -> Option<Coordinate> {
        self.raw.parent.as_ref().map(|p| p.coordinate())
    }

    /// Effective model if it has been built already
    pub fn cached_effective_model(&self) -> Option<&Arc<RawModel>> {
        self.effective.get()
    }

    pub(crate) fn set_effective_model(&self, model: Arc<RawModel>) {
        let _ = self.effective.set(model);
    }
}

/// A module together with the workspace it belongs to
#[derive(Clone, Copy)]
pub struct ModuleRef<'a> {
    pub(crate) ws: &'a Workspace,
    pub(crate) module: &'a LocalModule,
}

impl<'a> Deref for ModuleRef<'a> {
    type Target = LocalModule;

    fn deref(&self) -> &LocalModule {
        self.module
    }
}

impl fmt::Debug for ModuleRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.module, f)
    }
}

impl<'a> ModuleRef<'a> {
    pub fn workspace(&self) -> &'a Workspace {
        self.ws
    }

    pub fn raw(&self) -> &'a RawModel {
        &self.module.raw
    }

    // These shadow the `Deref` accessors so borrows outlive the handle.

    pub fn coordinate(&self) -> &'a Coordinate {
        &self.module.coordinate
    }

    pub fn group_id(&self) -> &'a str {
        &self.module.coordinate.group_id
    }

    pub fn artifact_id(&self) -> &'a str {
        &self.module.coordinate.artifact_id
    }

    pub fn dir(&self) -> &'a Path {
        self.module.raw.dir()
    }

    pub fn descriptor_file(&self) -> &'a Path {
        &self.module.raw.descriptor
    }

    /// Resolved version, borrowed from the workspace slot for pending modules
    pub fn version(&self) -> Result<&'a str, ModuleError> {
        if let Some(version) = self.module.version.get() {
            return Ok(version);
        }
        match self.ws.resolved_version() {
            Some(resolved) => Ok(self.module.version.get_or_init(|| resolved.to_string())),
            None => Err(ModuleError::UnresolvedVersion {
                coordinate: self.module.coordinate.clone(),
                version: self.module.raw_version.clone(),
                descriptor: self.module.raw.descriptor.clone(),
            }),
        }
    }

    /// Parent module, when the declared parent is part of the workspace
    pub fn parent(&self) -> Option<ModuleRef<'a>> {
        let coordinate = self.module.parent_coordinate()?;
        let parent = self.ws.project_by(&coordinate)?;
        (parent.id() != self.id()).then_some(parent)
    }

    /// Local ancestors, nearest first. Stops at the first revisited module.
    pub fn ancestors(&self) -> Vec<ModuleRef<'a>> {
        let mut seen = HashSet::from([self.id()]);
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(module) = current {
            if !seen.insert(module.id()) {
                break;
            }
            chain.push(module);
            current = module.parent();
        }
        chain
    }

    /// Like [`ancestors`](Self::ancestors) but reports a parent cycle
    pub fn checked_ancestors(&self) -> Result<Vec<ModuleRef<'a>>, ModelBuildError> {
        let mut seen = HashSet::from([self.id()]);
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(module) = current {
            if !seen.insert(module.id()) {
                return Err(ModelBuildError::CyclicParent(self.coordinate.to_string()));
            }
            chain.push(module);
            current = module.parent();
        }
        Ok(chain)
    }

    /// This module followed by its ancestors
    pub fn lineage(&self) -> Vec<ModuleRef<'a>> {
        let mut lineage = vec![*self];
        lineage.extend(self.ancestors());
        lineage
    }

    /// Builds the effective model on first use
    pub fn effective_model(&self) -> Result<Arc<RawModel>, ModelBuildError> {
        if let Some(model) = self.module.effective.get() {
            return Ok(Arc::clone(model));
        }
        let parents: Vec<&RawModel> = self
            .checked_ancestors()?
            .into_iter()
            .map(|m| m.raw())
            .collect();
        let request = ModelBuildRequest {
            model: self.raw(),
            parents,
            system_properties: self.ws.system_properties(),
            profiles: self.ws.profile_selection(),
            resolved_version: self.version().ok(),
        };
        let model = Arc::new(self.ws.model_builder().build(&request)?);
        debug!(module = %self.coordinate, "Built effective model");
        Ok(Arc::clone(self.module.effective.get_or_init(|| model)))
    }

    /// Property lookup for this module: process-wide properties, then the
    /// module's own and inherited properties.
    pub fn property(&self, name: &str) -> Option<String> {
        if let Some(value) = self.ws.system_properties().get(name) {
            return Some(value);
        }
        self.lineage()
            .into_iter()
            .find_map(|m| m.raw().properties.get(name).cloned())
    }

    fn configured(&self, kind: BuildDir) -> Option<&'a str> {
        self.lineage()
            .into_iter()
            .find_map(|m| m.raw().build().and_then(|b| kind.declared(b)))
    }

    /// Expands a configured path against this module and makes it absolute
    fn resolve_path(&self, value: &str, with_build_dir: bool) -> PathBuf {
        let dir = self.dir().display().to_string();
        let lookup = |name: &str| -> Option<String> {
            match name {
                "project.basedir" | "basedir" => Some(dir.clone()),
                "project.build.directory" if with_build_dir => {
                    Some(self.output_dir().display().to_string())
                }
                "project.artifactId" => Some(self.artifact_id().to_string()),
                "project.groupId" => Some(self.group_id().to_string()),
                "project.version" => self.version().ok().map(str::to_string),
                _ => self.property(name),
            }
        };
        let expanded = interpolate(value, &lookup);
        normalize_path(&self.dir().join(expanded))
    }

    fn build_dir(&self, kind: BuildDir) -> PathBuf {
        match self.configured(kind) {
            Some(value) => self.resolve_path(value, kind != BuildDir::Output),
            None => match kind {
                BuildDir::Output => self.dir().join(DEFAULT_OUTPUT_DIR),
                BuildDir::Classes => self.output_dir().join(DEFAULT_CLASSES_DIR),
                BuildDir::TestClasses => self.output_dir().join(DEFAULT_TEST_CLASSES_DIR),
                BuildDir::Sources => self.dir().join(DEFAULT_SOURCES_DIR),
                BuildDir::TestSources => self.dir().join(DEFAULT_TEST_SOURCES_DIR),
            },
        }
    }

    pub fn output_dir(&self) -> &'a Path {
        self.module
            .dirs
            .output
            .get_or_init(|| self.build_dir(BuildDir::Output))
    }

    pub fn classes_dir(&self) -> &'a Path {
        self.module
            .dirs
            .classes
            .get_or_init(|| self.build_dir(BuildDir::Classes))
    }

    pub fn test_classes_dir(&self) -> &'a Path {
        self.module
            .dirs
            .test_classes
            .get_or_init(|| self.build_dir(BuildDir::TestClasses))
    }

    pub fn sources_dir(&self) -> &'a Path {
        self.module
            .dirs
            .sources
            .get_or_init(|| self.build_dir(BuildDir::Sources))
    }

    pub fn test_sources_dir(&self) -> &'a Path {
        self.module
            .dirs
            .test_sources
            .get_or_init(|| self.build_dir(BuildDir::TestSources))
    }

    pub fn generated_sources_dir(&self) -> &'a Path {
        self.module
            .dirs
            .generated_sources
            .get_or_init(|| self.output_dir().join(DEFAULT_GENERATED_SOURCES_DIR))
    }

    pub fn resources_dirs(&self) -> &'a [ResourceDir] {
        self.module.dirs.resources.get_or_init(|| {
            self.resource_dirs(|b| &b.resources, DEFAULT_RESOURCES_DIR, self.classes_dir())
        })
    }

    pub fn test_resources_dirs(&self) -> &'a [ResourceDir] {
        self.module.dirs.test_resources.get_or_init(|| {
            self.resource_dirs(
                |b| &b.test_resources,
                DEFAULT_TEST_RESOURCES_DIR,
                self.test_classes_dir(),
            )
        })
    }

    fn resource_dirs(
        &self,
        select: impl Fn(&Build) -> &Vec<Resource>,
        default: &str,
        output: &Path,
    ) -> Vec<ResourceDir> {
        let declared = self
            .lineage()
            .into_iter()
            .filter_map(|m| m.raw().build())
            .map(&select)
            .find(|resources| !resources.is_empty());

        match declared {
            Some(resources) => resources
                .iter()
                .map(|r| {
                    let dir = match r.directory.as_deref() {
                        Some(d) => self.resolve_path(d, true),
                        None => self.dir().join(default),
                    };
                    let target = match r.target_path.as_deref() {
                        Some(t) => normalize_path(&output.join(t)),
                        None => output.to_path_buf(),
                    };
                    ResourceDir { dir, target }
                })
                .collect(),
            None => vec![ResourceDir {
                dir: self.dir().join(default),
                target: output.to_path_buf(),
            }],
        }
    }

    /// Builds the module descriptor on first use
    pub fn to_module_descriptor(&self) -> Result<Arc<ModuleDescriptor>, ModuleError> {
        descriptor::module_descriptor(*self)
    }
}

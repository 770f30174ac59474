//! The workspace graph and the resolver-facing protocols
//!
//! A [`Workspace`] owns every discovered module in an arena indexed by
//! [`Coordinate`]. Dependency resolvers consult it through two callbacks:
//! model lookup ([`Workspace::resolve_raw_model`], [`Workspace::resolve_effective_model`])
//! and artifact location ([`Workspace::find_artifact`], [`Workspace::find_versions`]).
//! Both answer `NotFound` when the workspace cannot satisfy a request, which tells
//! the resolver to fall through to remote repositories.

use crate::coords::{ArtifactCoords, Coordinate, TESTS_CLASSIFIER, TYPE_JAR};
use crate::error::{Lookup, LookupError, ModuleError};
use crate::model::profile::ProfileSelection;
use crate::model::utils::is_unresolved_version;
use crate::model::{EffectiveModelBuilder, InheritanceModelBuilder, RawModel};
use crate::module::{LocalModule, ModuleDescriptor, ModuleId, ModuleRef};
use crate::repository::{ArtifactCache, LocalRepository};
use mvnspace_core::{FileSystem, SystemProperties, WorkspaceConfig};
use sha2::{Digest, Sha256};
use std::cell::{OnceCell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub struct Workspace {
    modules: Vec<LocalModule>,
    index: HashMap<Coordinate, ModuleId>,
    /// First concrete value a placeholder version resolved to
    resolved_version: OnceCell<String>,
    detached: bool,
    current: Option<ModuleId>,
    last_modified: Option<SystemTime>,
    fs: Arc<dyn FileSystem>,
    artifact_cache: Option<Arc<dyn ArtifactCache>>,
    model_builder: Arc<dyn EffectiveModelBuilder>,
    system_properties: SystemProperties,
    active_profiles: Vec<String>,
    inactive_profiles: Vec<String>,
    prefer_poms_from_workspace: bool,
    last_versions: RefCell<Option<(ArtifactCoords, Vec<String>)>>,
    descriptors_in_progress: RefCell<HashSet<ModuleId>>,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("modules", &self.modules.len())
            .field("resolved_version", &self.resolved_version.get())
            .field("detached", &self.detached)
            .field("current", &self.current)
            .field("last_modified", &self.last_modified)
            .finish()
    }
}

/// Marks a module descriptor as under construction until dropped
pub(crate) struct DescriptorGuard<'a> {
    ws: &'a Workspace,
    id: ModuleId,
}

impl Drop for DescriptorGuard<'_> {
    fn drop(&mut self) {
        self.ws.descriptors_in_progress.borrow_mut().remove(&self.id);
    }
}

impl Workspace {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            modules: Vec::new(),
            index: HashMap::new(),
            resolved_version: OnceCell::new(),
            detached: false,
            current: None,
            last_modified: None,
            fs,
            artifact_cache: None,
            model_builder: Arc::new(InheritanceModelBuilder),
            system_properties: SystemProperties::new(),
            active_profiles: Vec::new(),
            inactive_profiles: Vec::new(),
            prefer_poms_from_workspace: false,
            last_versions: RefCell::new(None),
            descriptors_in_progress: RefCell::new(HashSet::new()),
        }
    }

    /// A workspace holding a single module loaded outside of discovery.
    /// Placeholder versions must resolve on their own.
    pub fn detached(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            detached: true,
            ..Self::new(fs)
        }
    }

    pub fn from_config(fs: Arc<dyn FileSystem>, config: &WorkspaceConfig) -> Self {
        let repository = LocalRepository::new(&config.local_repository, Arc::clone(&fs));
        Self::new(fs)
            .with_artifact_cache(Arc::new(repository))
            .with_system_properties(config.system_properties.clone())
            .with_profiles(config.active_profiles.clone(), config.inactive_profiles.clone())
            .with_prefer_poms_from_workspace(config.prefer_poms_from_workspace)
    }

    pub fn with_artifact_cache(mut self, cache: Arc<dyn ArtifactCache>) -> Self {
        self.artifact_cache = Some(cache);
        self
    }

    pub fn with_model_builder(mut self, builder: Arc<dyn EffectiveModelBuilder>) -> Self {
        self.model_builder = builder;
        self
    }

    pub fn with_system_properties(mut self, properties: SystemProperties) -> Self {
        self.system_properties = properties;
        self
    }

    pub fn with_profiles(mut self, active: Vec<String>, inactive: Vec<String>) -> Self {
        self.active_profiles = active;
        self.inactive_profiles = inactive;
        self
    }

    pub fn with_prefer_poms_from_workspace(mut self, prefer: bool) -> Self {
        self.prefer_poms_from_workspace = prefer;
        self
    }

    /// Same settings, no modules
    pub(crate) fn empty_copy(&self, detached: bool) -> Self {
        Self {
            detached,
            artifact_cache: self.artifact_cache.clone(),
            model_builder: Arc::clone(&self.model_builder),
            system_properties: self.system_properties.clone(),
            active_profiles: self.active_profiles.clone(),
            inactive_profiles: self.inactive_profiles.clone(),
            prefer_poms_from_workspace: self.prefer_poms_from_workspace,
            ..Self::new(Arc::clone(&self.fs))
        }
    }

    /// Registers a module. A coordinate that is already registered keeps its
    /// first module; the newcomer is reported and dropped.
    pub fn add_module(&mut self, raw: Arc<RawModel>) -> Result<ModuleId, ModuleError> {
        let id = ModuleId(self.modules.len());
        let (module, published) = LocalModule::new(id, raw, self)?;

        if let Some(existing) = self.index.get(module.coordinate()) {
            warn!(
                module = %module.coordinate(),
                descriptor = %module.descriptor_file().display(),
                existing = %self.modules[existing.0].descriptor_file().display(),
                "Ignoring duplicate module"
            );
            return Ok(*existing);
        }

        if let Some(version) = published {
            if self.resolved_version.get().is_none() {
                debug!(version = %version, "Publishing resolved workspace version");
                let _ = self.resolved_version.set(version);
            }
        }

        if let Some(modified) = self.fs.modified(module.descriptor_file()) {
            self.last_modified = Some(self.last_modified.map_or(modified, |t| t.max(modified)));
        }

        debug!(module = %module.coordinate(), dir = %module.dir().display(), "Registered module");
        self.index.insert(module.coordinate().clone(), id);
        self.modules.push(module);
        Ok(id)
    }

    pub(crate) fn set_effective_model(&self, id: ModuleId, model: Arc<RawModel>) {
        self.modules[id.0].set_effective_model(model);
    }

    pub fn set_current(&mut self, id: ModuleId) {
        self.current = Some(id);
    }

    pub fn current_module(&self) -> Option<ModuleRef<'_>> {
        self.current.map(|id| self.module(id))
    }

    /// Handle for a module of this workspace. Panics on an id from another workspace.
    pub fn module(&self, id: ModuleId) -> ModuleRef<'_> {
        ModuleRef {
            ws: self,
            module: &self.modules[id.0],
        }
    }

    pub fn project(&self, group_id: &str, artifact_id: &str) -> Option<ModuleRef<'_>> {
        self.project_by(&Coordinate::new(group_id, artifact_id))
    }

    pub fn project_by(&self, coordinate: &Coordinate) -> Option<ModuleRef<'_>> {
        self.index.get(coordinate).map(|id| self.module(*id))
    }

    /// Modules in registration order
    pub fn modules(&self) -> impl Iterator<Item = ModuleRef<'_>> {
        self.modules.iter().map(move |module| ModuleRef { ws: self, module })
    }

    /// Modules whose declared parent is `id`
    pub fn children(&self, id: ModuleId) -> Vec<ModuleRef<'_>> {
        self.modules()
            .filter(|m| m.id() != id && m.parent().is_some_and(|p| p.id() == id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn resolved_version(&self) -> Option<&str> {
        self.resolved_version.get().map(String::as_str)
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn system_properties(&self) -> &SystemProperties {
        &self.system_properties
    }

    pub fn profile_selection(&self) -> ProfileSelection<'_> {
        ProfileSelection::new(&self.active_profiles, &self.inactive_profiles)
    }

    pub fn model_builder(&self) -> &dyn EffectiveModelBuilder {
        self.model_builder.as_ref()
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn prefer_poms_from_workspace(&self) -> bool {
        self.prefer_poms_from_workspace
    }

    /// Newest descriptor modification time
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// Content id: sha256 over the sorted module coordinates and the newest
    /// descriptor timestamp. Changes whenever a module is added or a descriptor is touched.
    pub fn id(&self) -> String {
        let mut coordinates: Vec<String> = self.index.keys().map(Coordinate::to_string).collect();
        coordinates.sort();

        let mut hasher = Sha256::new();
        for coordinate in &coordinates {
            hasher.update(coordinate.as_bytes());
            hasher.update(b"\n");
        }
        let millis = self
            .last_modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_millis());
        hasher.update(millis.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    pub(crate) fn enter_descriptor(&self, id: ModuleId) -> Option<DescriptorGuard<'_>> {
        self.descriptors_in_progress
            .borrow_mut()
            .insert(id)
            .then(|| DescriptorGuard { ws: self, id })
    }

    pub fn to_module_descriptor(&self, coordinate: &Coordinate) -> Lookup<Arc<ModuleDescriptor>> {
        match self.project_by(coordinate) {
            Some(module) => match module.to_module_descriptor() {
                Ok(descriptor) => Lookup::Found(descriptor),
                Err(e) => Lookup::Error(e.into()),
            },
            None => Lookup::NotFound,
        }
    }

    /// Raw model of a module whose declared version string equals `version`
    pub fn resolve_raw_model(&self, group_id: &str, artifact_id: &str, version: &str) -> Lookup<&RawModel> {
        match self.project(group_id, artifact_id) {
            Some(module) if module.raw_version() == version => Lookup::Found(module.raw()),
            _ => Lookup::NotFound,
        }
    }

    /// Effective model of a module whose resolved version equals `version`
    pub fn resolve_effective_model(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Lookup<Arc<RawModel>> {
        let Some(module) = self.project(group_id, artifact_id) else {
            return Lookup::NotFound;
        };
        if module.version().ok() != Some(version) {
            return Lookup::NotFound;
        }
        match module.effective_model() {
            Ok(model) => Lookup::Found(model),
            Err(source) => Lookup::Error(LookupError::ModelBuild {
                coordinate: module.coordinate().clone(),
                source,
            }),
        }
    }

    /// Locates a workspace artifact on disk: a packaged file, a compiled output
    /// directory or the descriptor itself.
    pub fn find_artifact(&self, coords: &ArtifactCoords) -> Lookup<PathBuf> {
        let Some(module) = self.project(&coords.group_id, &coords.artifact_id) else {
            return Lookup::NotFound;
        };
        let version = match module.version() {
            Ok(version) => version,
            Err(e) => return Lookup::Error(e.into()),
        };
        if !coords.version.is_empty()
            && coords.version != version
            && !(is_unresolved_version(&coords.version) && self.resolved_version() == Some(version))
        {
            debug!(artifact = %coords, version, "Workspace module version does not match");
            return Lookup::NotFound;
        }

        let fs = self.file_system();
        if coords.is_pom() {
            let pom = module.descriptor_file();
            if fs.is_file(pom) {
                let usable = module.is_aggregator()
                    || self.prefer_poms_from_workspace
                    || fs.exists(module.output_dir());
                if usable {
                    return Lookup::Found(pom.to_path_buf());
                }
                match self.empty_jar_output(module, &coords.with_version(version)) {
                    Ok(Some(_)) => return Lookup::Found(pom.to_path_buf()),
                    Ok(None) => {}
                    Err(e) => return Lookup::Error(e),
                }
            }
        }

        let packaged = module.output_dir().join(coords.file_name(version));
        if fs.exists(&packaged) {
            return Lookup::Found(packaged);
        }

        let classifier = coords.effective_classifier();
        if !classifier.is_empty() {
            if classifier == TESTS_CLASSIFIER && fs.exists(module.test_classes_dir()) {
                return Lookup::Found(module.test_classes_dir().to_path_buf());
            }
            return Lookup::NotFound;
        }

        if coords.extension() == TYPE_JAR {
            if fs.exists(module.classes_dir()) {
                return Lookup::Found(module.classes_dir().to_path_buf());
            }
            return match self.empty_jar_output(module, &coords.with_version(version)) {
                Ok(Some(dir)) => Lookup::Found(dir),
                Ok(None) => Lookup::NotFound,
                Err(e) => Lookup::Error(e),
            };
        }

        Lookup::NotFound
    }

    /// A module without sources or resources packages an empty jar. Unless the
    /// requested artifact is already in the local repository, an empty classes
    /// directory stands in.
    fn empty_jar_output(&self, module: ModuleRef<'_>, artifact: &ArtifactCoords) -> Result<Option<PathBuf>, LookupError> {
        let fs = self.file_system();
        if fs.exists(module.sources_dir()) || module.resources_dirs().iter().any(|r| fs.exists(&r.dir)) {
            return Ok(None);
        }

        if self
            .artifact_cache
            .as_ref()
            .is_some_and(|cache| cache.contains(artifact))
        {
            return Ok(None);
        }

        let classes = module.classes_dir();
        if !fs.is_dir(classes) {
            debug!(module = %module.coordinate(), dir = %classes.display(), "Creating empty classes directory");
            fs.create_dir_all(classes).map_err(|source| LookupError::Io {
                path: classes.to_path_buf(),
                source,
            })?;
        }
        Ok(Some(classes.to_path_buf()))
    }

    /// Versions the workspace can serve for `coords`: none or exactly one.
    /// The previous answer is memoized because resolvers ask repeatedly.
    pub fn find_versions(&self, coords: &ArtifactCoords) -> Vec<String> {
        if let Some((last, versions)) = self.last_versions.borrow().as_ref() {
            if last == coords {
                return versions.clone();
            }
        }

        let versions = match self.find_artifact(coords) {
            Lookup::Found(_) if !coords.version.is_empty() => vec![coords.version.clone()],
            Lookup::Found(_) => self
                .project(&coords.group_id, &coords.artifact_id)
                .and_then(|m| m.version().ok().map(str::to_string))
                .into_iter()
                .collect(),
            Lookup::NotFound => Vec::new(),
            Lookup::Error(e) => {
                warn!(artifact = %coords, error = %e, "Failed to look up workspace versions");
                Vec::new()
            }
        };
        *self.last_versions.borrow_mut() = Some((coords.clone(), versions.clone()));
        versions
    }

    /// Path of a workspace module's directory, if the coordinate is known
    pub fn module_dir(&self, coordinate: &Coordinate) -> Option<&Path> {
        self.index
            .get(coordinate)
            .map(|id| self.modules[id.0].dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_model;
    use mvnspace_core::MockFileSystem;
    use std::time::Duration;

    struct FixedCache(Vec<ArtifactCoords>);

    impl ArtifactCache for FixedCache {
        fn path_for(&self, coords: &ArtifactCoords) -> PathBuf {
            PathBuf::from("/repo").join(coords.file_name(&coords.version))
        }

        fn contains(&self, coords: &ArtifactCoords) -> bool {
            self.0.contains(coords)
        }
    }

    fn add(ws: &mut Workspace, fs: &MockFileSystem, path: &str, xml: &str) -> ModuleId {
        fs.add_file(path, xml);
        let full = fs.root().join(path);
        ws.add_module(Arc::new(parse_model(xml, &full).unwrap())).unwrap()
    }

    const APP: &str = "<project><groupId>org.acme</groupId><artifactId>app</artifactId><version>1.0</version></project>";

    fn setup() -> (Arc<MockFileSystem>, Workspace) {
        let fs = Arc::new(MockFileSystem::new());
        let ws = Workspace::new(fs.clone());
        (fs, ws)
    }

    #[test]
    fn test_duplicate_coordinate_keeps_first() {
        let (fs, mut ws) = setup();
        let first = add(&mut ws, &fs, "a/pom.xml", APP);
        let second = add(&mut ws, &fs, "b/pom.xml", APP);
        assert_eq!(first, second);
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.module(first).dir(), Path::new("/mock/a"));
    }

    #[test]
    fn test_raw_and_effective_model_lookup() {
        let (fs, mut ws) = setup();
        add(
            &mut ws,
            &fs,
            "pom.xml",
            r#"<project><groupId>org.acme</groupId><artifactId>app</artifactId><version>${revision}</version>
               <properties><revision>2.0</revision></properties></project>"#,
        );

        assert!(ws.resolve_raw_model("org.acme", "app", "${revision}").is_found());
        assert!(ws.resolve_raw_model("org.acme", "app", "2.0").is_not_found());
        assert!(ws.resolve_raw_model("org.acme", "other", "${revision}").is_not_found());

        let effective = ws.resolve_effective_model("org.acme", "app", "2.0").found().unwrap();
        assert_eq!(effective.version.as_deref(), Some("2.0"));
        assert!(ws.resolve_effective_model("org.acme", "app", "${revision}").is_not_found());
    }

    #[test]
    fn test_find_artifact_prefers_packaged_file() {
        let (fs, mut ws) = setup();
        add(&mut ws, &fs, "pom.xml", APP);
        fs.add_file("target/app-1.0.jar", "");
        fs.add_dir("target/classes");

        let found = ws.find_artifact(&ArtifactCoords::jar("org.acme", "app", "1.0"));
        assert_eq!(found.found(), Some(PathBuf::from("/mock/target/app-1.0.jar")));

        let pom = ws.find_artifact(&ArtifactCoords::pom("org.acme", "app", "1.0"));
        assert_eq!(pom.found(), Some(PathBuf::from("/mock/pom.xml")));
    }

    #[test]
    fn test_find_artifact_version_mismatch() {
        let (fs, mut ws) = setup();
        add(&mut ws, &fs, "pom.xml", APP);
        fs.add_dir("target/classes");
        assert!(ws.find_artifact(&ArtifactCoords::jar("org.acme", "app", "2.0")).is_not_found());
        assert!(ws.find_artifact(&ArtifactCoords::jar("org.acme", "app", "")).is_found());
        assert!(ws.find_artifact(&ArtifactCoords::jar("org.acme", "nope", "1.0")).is_not_found());
    }

    #[test]
    fn test_find_artifact_classifiers() {
        let (fs, mut ws) = setup();
        add(&mut ws, &fs, "pom.xml", APP);
        fs.add_dir("target/classes");

        let tests = ArtifactCoords::new("org.acme", "app", "tests", "jar", "1.0");
        assert!(ws.find_artifact(&tests).is_not_found());
        fs.add_dir("target/test-classes");
        assert_eq!(
            ws.find_artifact(&tests).found(),
            Some(PathBuf::from("/mock/target/test-classes"))
        );
        let test_jar = ArtifactCoords::new("org.acme", "app", "", "test-jar", "1.0");
        assert!(ws.find_artifact(&test_jar).is_found());

        let other = ArtifactCoords::new("org.acme", "app", "linux", "jar", "1.0");
        assert!(ws.find_artifact(&other).is_not_found());
    }

    #[test]
    fn test_empty_jar_output_respects_local_repository() {
        let (fs, ws) = setup();
        let main = ArtifactCoords::jar("org.acme", "app", "1.0");
        let mut ws = ws.with_artifact_cache(Arc::new(FixedCache(vec![main.clone()])));
        add(&mut ws, &fs, "pom.xml", APP);

        assert!(ws.find_artifact(&main).is_not_found());
        assert!(!fs.exists(Path::new("/mock/target/classes")));
    }

    #[test]
    fn test_empty_output_checks_requested_artifact_in_repository() {
        let (fs, ws) = setup();
        let pom = ArtifactCoords::pom("org.acme", "app", "1.0");
        let mut ws = ws.with_artifact_cache(Arc::new(FixedCache(vec![pom.clone()])));
        add(&mut ws, &fs, "pom.xml", APP);

        assert!(ws.find_artifact(&pom).is_not_found());
        assert!(!fs.exists(Path::new("/mock/target/classes")));

        let main = ArtifactCoords::jar("org.acme", "app", "1.0");
        assert_eq!(ws.find_artifact(&main).found(), Some(PathBuf::from("/mock/target/classes")));
        assert_eq!(ws.find_artifact(&pom).found(), Some(PathBuf::from("/mock/pom.xml")));
    }

    #[test]
    fn test_empty_jar_output_not_used_when_sources_exist() {
        let (fs, mut ws) = setup();
        add(&mut ws, &fs, "pom.xml", APP);
        fs.add_dir("src/main/java");
        let main = ArtifactCoords::jar("org.acme", "app", "1.0");
        assert!(ws.find_artifact(&main).is_not_found());
        assert!(ws.find_artifact(&ArtifactCoords::pom("org.acme", "app", "1.0")).is_not_found());
    }

    #[test]
    fn test_find_versions_memo() {
        let (fs, mut ws) = setup();
        add(&mut ws, &fs, "pom.xml", APP);
        fs.add_dir("target/classes");

        let coords = ArtifactCoords::jar("org.acme", "app", "1.0");
        assert_eq!(ws.find_versions(&coords), vec!["1.0"]);
        assert!(ws.find_versions(&coords.with_version("3.0")).is_empty());
        assert_eq!(ws.find_versions(&coords.with_version("")), vec!["1.0"]);
    }

    #[test]
    fn test_fingerprint_tracks_modification_times() {
        let (fs, mut ws) = setup();
        fs.add_file("pom.xml", APP);
        fs.set_modified("pom.xml", UNIX_EPOCH + Duration::from_secs(100));
        let model = parse_model(APP, Path::new("/mock/pom.xml")).unwrap();
        ws.add_module(Arc::new(model)).unwrap();

        assert_eq!(ws.last_modified(), Some(UNIX_EPOCH + Duration::from_secs(100)));
        let id = ws.id();
        assert_eq!(id.len(), 64);

        let (fs2, mut other) = setup();
        fs2.add_file("pom.xml", APP);
        fs2.set_modified("pom.xml", UNIX_EPOCH + Duration::from_secs(200));
        other
            .add_module(Arc::new(parse_model(APP, Path::new("/mock/pom.xml")).unwrap()))
            .unwrap();
        assert_ne!(id, other.id());
    }

    #[test]
    fn test_workspace_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Workspace>();
    }
}

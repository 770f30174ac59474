//! Module descriptors: the build layout a dev-mode tool or IDE needs, derived once
//! per module from its descriptor and its position in the workspace.

use super::ModuleRef;
use crate::coords::{Coordinate, TESTS_CLASSIFIER};
use crate::error::ModuleError;
use crate::model::utils::interpolate;
use crate::model::{merge_configuration, Dependency, Plugin, RawModel, XmlNode};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const JAR_PLUGIN: &str = "maven-jar-plugin";
const JAR_GOAL: &str = "jar";
const TEST_JAR_GOAL: &str = "test-jar";
const DEFAULT_JAR_EXECUTION: &str = "default-jar";
const GENERATED_TEST_SOURCES_DIR: &str = "generated-test-sources/test-annotations";

/// Include/exclude patterns applied when packaging a source set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathFilter {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl PathFilter {
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }
}

/// A source (or resource) directory and the directory it is compiled or copied into
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDir {
    pub dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_sources_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSet {
    /// Empty for the main artifact
    pub classifier: String,
    pub sources: Vec<SourceDir>,
    pub resources: Vec<SourceDir>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<PathFilter>,
}

#[derive(Debug, Clone)]
pub enum ModuleDependency {
    External(Dependency),
    /// `import`-scoped BOM that is itself a workspace module
    WorkspaceImport(Arc<ModuleDescriptor>),
}

impl ModuleDependency {
    pub fn coordinate(&self) -> Coordinate {
        match self {
            ModuleDependency::External(dep) => Coordinate::new(&dep.group_id, &dep.artifact_id),
            ModuleDependency::WorkspaceImport(descriptor) => descriptor.coordinate.clone(),
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            ModuleDependency::External(dep) => dep.version.as_deref(),
            ModuleDependency::WorkspaceImport(descriptor) => Some(&descriptor.version),
        }
    }

    pub fn is_workspace_import(&self) -> bool {
        matches!(self, ModuleDependency::WorkspaceImport(_))
    }
}

#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub coordinate: Coordinate,
    pub version: String,
    pub packaging: String,
    pub module_dir: PathBuf,
    pub build_dir: PathBuf,
    pub build_file: PathBuf,
    pub source_sets: Vec<SourceSet>,
    pub dependencies: Vec<ModuleDependency>,
    pub dependency_constraints: Vec<ModuleDependency>,
    pub parent: Option<Arc<ModuleDescriptor>>,
}

impl ModuleDescriptor {
    pub fn source_set(&self, classifier: &str) -> Option<&SourceSet> {
        self.source_sets.iter().find(|s| s.classifier == classifier)
    }

    pub fn main_sources(&self) -> Option<&SourceSet> {
        self.source_set("")
    }

    /// The single test source set
    pub fn test_sources(&self) -> Option<&SourceSet> {
        self.source_sets.last()
    }

    /// Constraints of this module followed by those inherited through the parent chain
    pub fn all_constraints(&self) -> Vec<&ModuleDependency> {
        let mut constraints: Vec<&ModuleDependency> = self.dependency_constraints.iter().collect();
        let mut parent = self.parent.as_deref();
        while let Some(descriptor) = parent {
            constraints.extend(descriptor.dependency_constraints.iter());
            parent = descriptor.parent.as_deref();
        }
        constraints
    }

    pub fn workspace_imports(&self) -> impl Iterator<Item = &Arc<ModuleDescriptor>> {
        self.dependency_constraints.iter().filter_map(|c| match c {
            ModuleDependency::WorkspaceImport(d) => Some(d),
            ModuleDependency::External(_) => None,
        })
    }
}

/// Cached descriptor of `module`, built on first use
pub(crate) fn module_descriptor(module: ModuleRef<'_>) -> Result<Arc<ModuleDescriptor>, ModuleError> {
    if let Some(descriptor) = module.module.descriptor.get() {
        return Ok(Arc::clone(descriptor));
    }
    let Some(_guard) = module.ws.enter_descriptor(module.id()) else {
        return Err(ModuleError::DescriptorCycle(module.coordinate().clone()));
    };

    let descriptor = Arc::new(build(module)?);
    Ok(Arc::clone(module.module.descriptor.get_or_init(|| descriptor)))
}

fn build(module: ModuleRef<'_>) -> Result<ModuleDescriptor, ModuleError> {
    let version = module.version()?.to_string();
    let effective = module.cached_effective_model().cloned();
    let model: &RawModel = effective.as_deref().unwrap_or_else(|| module.raw());

    let mut source_sets = Vec::new();
    let mut test_customization = None;

    if !module.is_aggregator() {
        let (plugin, managed) = jar_plugin(module, effective.is_some());
        let mut add_default = true;

        match plugin {
            Some(plugin) => {
                let plugin_config = merge_configuration(plugin.configuration.as_ref(), managed);
                if plugin.executions.is_empty() {
                    if let Some((classifier, filter)) = customization(plugin_config.as_ref()) {
                        source_sets.push(main_source_set(module, classifier, filter));
                        add_default = false;
                    }
                }
                for execution in &plugin.executions {
                    let config = merge_configuration(execution.configuration.as_ref(), plugin_config.as_ref());
                    if execution.has_goal(TEST_JAR_GOAL) {
                        test_customization = customization(config.as_ref());
                    } else if execution.has_goal(JAR_GOAL)
                        || (execution.goals.is_empty() && execution.id == DEFAULT_JAR_EXECUTION)
                    {
                        if let Some((classifier, filter)) = customization(config.as_ref()) {
                            source_sets.push(main_source_set(module, classifier, filter));
                            add_default = false;
                        }
                    }
                }
            }
            None => {
                if let Some((classifier, filter)) = customization(managed) {
                    source_sets.push(main_source_set(module, classifier, filter));
                    add_default = false;
                }
            }
        }

        if add_default {
            source_sets.push(main_source_set(module, String::new(), None));
        }
    }

    let (test_classifier, test_filter) = match test_customization {
        Some((classifier, filter)) if !classifier.is_empty() => (classifier, filter),
        Some((_, filter)) => (TESTS_CLASSIFIER.to_string(), filter),
        None => (TESTS_CLASSIFIER.to_string(), None),
    };
    source_sets.push(test_source_set(module, test_classifier, test_filter));

    let dependencies = translate(module, &model.dependencies, &version);
    let dependency_constraints = translate(module, &model.dependency_management, &version);

    let parent = match module.parent() {
        Some(parent) => match module_descriptor(parent) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                debug!(module = %module.coordinate(), error = %e, "Parent descriptor unavailable");
                None
            }
        },
        None => None,
    };

    Ok(ModuleDescriptor {
        coordinate: module.coordinate().clone(),
        version,
        packaging: module.packaging().to_string(),
        module_dir: module.dir().to_path_buf(),
        build_dir: module.output_dir().to_path_buf(),
        build_file: module.descriptor_file().to_path_buf(),
        source_sets,
        dependencies,
        dependency_constraints,
        parent,
    })
}

/// Declared `maven-jar-plugin` and its managed configuration, nearest module first
fn jar_plugin<'a>(module: ModuleRef<'a>, effective: bool) -> (Option<&'a Plugin>, Option<&'a XmlNode>) {
    if effective {
        if let Some(model) = module.module.cached_effective_model() {
            let build = model.build();
            let plugin = build.and_then(|b| b.plugin(JAR_PLUGIN));
            let managed = build
                .and_then(|b| b.managed_plugin(JAR_PLUGIN))
                .and_then(|p| p.configuration.as_ref());
            return (plugin, managed);
        }
    }

    let lineage = module.lineage();
    let plugin = lineage
        .iter()
        .find_map(|m| m.raw().build().and_then(|b| b.plugin(JAR_PLUGIN)));
    let managed = lineage
        .iter()
        .find_map(|m| m.raw().build().and_then(|b| b.managed_plugin(JAR_PLUGIN)))
        .and_then(|p| p.configuration.as_ref());
    (plugin, managed)
}

/// Classifier and filter if the configuration changes what gets packaged
fn customization(config: Option<&XmlNode>) -> Option<(String, Option<PathFilter>)> {
    let config = config?;
    let classifier = config.child_text("classifier").unwrap_or_default().to_string();
    let filter = PathFilter {
        includes: config.child_values("includes"),
        excludes: config.child_values("excludes"),
    };
    let filter = (!filter.is_empty()).then_some(filter);
    (!classifier.is_empty() || filter.is_some()).then_some((classifier, filter))
}

fn main_source_set(module: ModuleRef<'_>, classifier: String, filter: Option<PathFilter>) -> SourceSet {
    SourceSet {
        classifier,
        sources: vec![SourceDir {
            dir: module.sources_dir().to_path_buf(),
            output_dir: module.classes_dir().to_path_buf(),
            generated_sources_dir: Some(module.generated_sources_dir().to_path_buf()),
        }],
        resources: module
            .resources_dirs()
            .iter()
            .map(|r| SourceDir {
                dir: r.dir.clone(),
                output_dir: r.target.clone(),
                generated_sources_dir: None,
            })
            .collect(),
        filter,
    }
}

fn test_source_set(module: ModuleRef<'_>, classifier: String, filter: Option<PathFilter>) -> SourceSet {
    SourceSet {
        classifier,
        sources: vec![SourceDir {
            dir: module.test_sources_dir().to_path_buf(),
            output_dir: module.test_classes_dir().to_path_buf(),
            generated_sources_dir: Some(module.output_dir().join(GENERATED_TEST_SOURCES_DIR)),
        }],
        resources: module
            .test_resources_dirs()
            .iter()
            .map(|r| SourceDir {
                dir: r.dir.clone(),
                output_dir: r.target.clone(),
                generated_sources_dir: None,
            })
            .collect(),
        filter,
    }
}

fn translate(module: ModuleRef<'_>, dependencies: &[Dependency], version: &str) -> Vec<ModuleDependency> {
    let parent = module.raw().parent.as_ref();
    let lookup = |name: &str| -> Option<String> {
        match name {
            "project.groupId" | "pom.groupId" => Some(module.group_id().to_string()),
            "project.artifactId" => Some(module.artifact_id().to_string()),
            "project.version" | "pom.version" => Some(version.to_string()),
            "project.parent.version" => parent.map(|p| p.version.clone()),
            "project.parent.groupId" => parent.map(|p| p.group_id.clone()),
            _ => module.property(name),
        }
    };

    dependencies
        .iter()
        .map(|dep| {
            let mut dep = dep.clone();
            dep.group_id = interpolate(&dep.group_id, &lookup);
            dep.artifact_id = interpolate(&dep.artifact_id, &lookup);
            dep.classifier = interpolate(&dep.classifier, &lookup);
            dep.version = dep.version.as_deref().map(|v| interpolate(v, &lookup));

            if dep.is_import() {
                if let Some(import) = workspace_import(module, &dep) {
                    return ModuleDependency::WorkspaceImport(import);
                }
            }
            ModuleDependency::External(dep)
        })
        .collect()
}

fn workspace_import(module: ModuleRef<'_>, dep: &Dependency) -> Option<Arc<ModuleDescriptor>> {
    let sibling = module.ws.project(&dep.group_id, &dep.artifact_id)?;
    if sibling.id() == module.id() || sibling.version().ok() != dep.version.as_deref() {
        return None;
    }
    match module_descriptor(sibling) {
        Ok(descriptor) => Some(descriptor),
        Err(e) => {
            debug!(module = %module.coordinate(), import = %sibling.coordinate(), error = %e, "Keeping import as an external coordinate");
            None
        }
    }
}

//! Project descriptor model
//!
//! `RawModel` mirrors the subset of `pom.xml` the workspace engine needs: coordinates,
//! parent, modules, properties, dependencies, build layout, plugin configuration and
//! profiles. The same type carries effective (parent-flattened) models.

pub mod effective;
pub mod profile;
pub mod reader;
pub mod utils;

use crate::coords::{Coordinate, TYPE_JAR, TYPE_POM};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use effective::{EffectiveModelBuilder, InheritanceModelBuilder, ModelBuildRequest};
pub use reader::{parse_model, read_model};

pub const POM_XML: &str = "pom.xml";
pub const DEFAULT_PARENT_RELATIVE_PATH: &str = "../pom.xml";
pub const PACKAGING_POM: &str = TYPE_POM;
pub const SCOPE_IMPORT: &str = "import";
pub const SCOPE_COMPILE: &str = "compile";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawModel {
    /// Descriptor file the model was read from
    pub descriptor: PathBuf,
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub packaging: String,
    pub parent: Option<Parent>,
    pub modules: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<Dependency>,
    pub build: Option<Build>,
    pub profiles: Vec<Profile>,
}

impl RawModel {
    /// Directory containing the descriptor
    pub fn dir(&self) -> &Path {
        self.descriptor.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn is_aggregator(&self) -> bool {
        self.packaging == PACKAGING_POM
    }

    pub fn build(&self) -> Option<&Build> {
        self.build.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    /// `None` when the element is absent, `Some("")` when declared empty
    pub relative_path: Option<String>,
}

impl Parent {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.group_id, &self.artifact_id)
    }

    /// Path to look for the parent locally; an empty declaration disables the lookup
    pub fn local_path(&self) -> Option<&str> {
        match self.relative_path.as_deref() {
            None => Some(DEFAULT_PARENT_RELATIVE_PATH),
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(path.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub classifier: String,
    pub scope: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<Coordinate>,
}

impl Dependency {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: None,
            kind: TYPE_JAR.to_string(),
            classifier: String::new(),
            scope: None,
            optional: false,
            exclusions: Vec::new(),
        }
    }

    /// Identity used when a child declaration overrides an inherited one
    pub fn management_key(&self) -> (String, String, String, String) {
        (
            self.group_id.clone(),
            self.artifact_id.clone(),
            self.kind.clone(),
            self.classifier.clone(),
        )
    }

    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(SCOPE_COMPILE)
    }

    pub fn is_import(&self) -> bool {
        self.scope() == SCOPE_IMPORT && self.kind == TYPE_POM
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Build {
    pub directory: Option<String>,
    pub output_directory: Option<String>,
    pub test_output_directory: Option<String>,
    pub source_directory: Option<String>,
    pub test_source_directory: Option<String>,
    pub final_name: Option<String>,
    pub resources: Vec<Resource>,
    pub test_resources: Vec<Resource>,
    pub plugins: Vec<Plugin>,
    pub plugin_management: Vec<Plugin>,
}

impl Build {
    pub fn plugin(&self, artifact_id: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.artifact_id == artifact_id)
    }

    pub fn managed_plugin(&self, artifact_id: &str) -> Option<&Plugin> {
        self.plugin_management
            .iter()
            .find(|p| p.artifact_id == artifact_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub directory: Option<String>,
    pub target_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plugin {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub configuration: Option<XmlNode>,
    pub executions: Vec<PluginExecution>,
}

impl Plugin {
    pub fn key(&self) -> (&str, &str) {
        (&self.group_id, &self.artifact_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginExecution {
    pub id: String,
    pub phase: Option<String>,
    pub goals: Vec<String>,
    pub configuration: Option<XmlNode>,
}

impl PluginExecution {
    pub fn has_goal(&self, goal: &str) -> bool {
        self.goals.iter().any(|g| g == goal)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub id: String,
    pub activation: Option<Activation>,
    pub modules: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<Dependency>,
    pub build: Option<Build>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    pub active_by_default: bool,
    pub property: Option<PropertyActivation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyActivation {
    pub name: String,
    pub value: Option<String>,
}

/// Free-form plugin configuration, kept as a small element tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Trimmed, non-empty text of a direct child
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .and_then(|c| c.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Texts of the children of a list element, e.g. `<includes><include>..`
    pub fn child_values(&self, name: &str) -> Vec<String> {
        self.child(name)
            .map(|list| {
                list.children
                    .iter()
                    .filter_map(|c| c.text.as_deref())
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Merges `self` (dominant) over `recessive`: dominant children replace
    /// recessive children of the same name, recessive-only children are kept.
    pub fn merge_over(&self, recessive: &XmlNode) -> XmlNode {
        let mut merged = self.clone();
        if merged.text.is_none() {
            merged.text = recessive.text.clone();
        }
        for child in &recessive.children {
            if merged.child(&child.name).is_none() {
                merged.children.push(child.clone());
            }
        }
        merged
    }
}

/// Merges optional configurations, `dominant` wins
pub fn merge_configuration(dominant: Option<&XmlNode>, recessive: Option<&XmlNode>) -> Option<XmlNode> {
    match (dominant, recessive) {
        (Some(d), Some(r)) => Some(d.merge_over(r)),
        (Some(d), None) => Some(d.clone()),
        (None, Some(r)) => Some(r.clone()),
        (None, None) => None,
    }
}

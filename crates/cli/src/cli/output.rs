//! Output formatting for multiple formats
//!
//! Every command renders a serializable report: JSON and YAML for tooling, and a
//! compact human-readable listing for the terminal.
//!
//! # Example
//!
//! ```ignore
//! use mvnspace_cli::cli::output::{OutputFormat, OutputFormatter, WorkspaceReport};
//!
//! let report = WorkspaceReport::from_workspace(&workspace);
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_workspace(&report)?);
//! ```

use anyhow::{Context, Result};
use mvnspace_workspace::{ModuleDependency, ModuleDescriptor, ModuleRef, SourceSet, Workspace};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceReport {
    pub id: String,
    pub current: Option<String>,
    pub resolved_version: Option<String>,
    pub modules: Vec<ModuleReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub coordinate: String,
    /// `None` when the version could not be resolved
    pub version: Option<String>,
    pub packaging: String,
    pub dir: PathBuf,
    pub parent: Option<String>,
    pub output_dir: PathBuf,
    pub classes_dir: PathBuf,
    pub test_classes_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocateReport {
    pub artifact: String,
    pub path: Option<PathBuf>,
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DescriptorReport {
    pub coordinate: String,
    pub version: String,
    pub packaging: String,
    pub module_dir: PathBuf,
    pub build_dir: PathBuf,
    pub build_file: PathBuf,
    pub parent: Option<String>,
    pub source_sets: Vec<SourceSet>,
    pub dependencies: Vec<DependencyReport>,
    pub dependency_constraints: Vec<DependencyReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub coordinate: String,
    pub version: Option<String>,
    pub workspace_module: bool,
}

impl WorkspaceReport {
    pub fn from_workspace(ws: &Workspace) -> Self {
        Self {
            id: ws.id(),
            current: ws.current_module().map(|m| m.coordinate().to_string()),
            resolved_version: ws.resolved_version().map(str::to_string),
            modules: ws.modules().map(ModuleReport::from_module).collect(),
        }
    }
}

impl ModuleReport {
    pub fn from_module(module: ModuleRef<'_>) -> Self {
        Self {
            coordinate: module.coordinate().to_string(),
            version: module.version().ok().map(str::to_string),
            packaging: module.packaging().to_string(),
            dir: module.dir().to_path_buf(),
            parent: module.parent().map(|p| p.coordinate().to_string()),
            output_dir: module.output_dir().to_path_buf(),
            classes_dir: module.classes_dir().to_path_buf(),
            test_classes_dir: module.test_classes_dir().to_path_buf(),
        }
    }
}

impl DescriptorReport {
    pub fn from_descriptor(descriptor: &ModuleDescriptor) -> Self {
        Self {
            coordinate: descriptor.coordinate.to_string(),
            version: descriptor.version.clone(),
            packaging: descriptor.packaging.clone(),
            module_dir: descriptor.module_dir.clone(),
            build_dir: descriptor.build_dir.clone(),
            build_file: descriptor.build_file.clone(),
            parent: descriptor.parent.as_ref().map(|p| p.coordinate.to_string()),
            source_sets: descriptor.source_sets.clone(),
            dependencies: descriptor.dependencies.iter().map(DependencyReport::from).collect(),
            dependency_constraints: descriptor
                .all_constraints()
                .into_iter()
                .map(DependencyReport::from)
                .collect(),
        }
    }
}

impl From<&ModuleDependency> for DependencyReport {
    fn from(dep: &ModuleDependency) -> Self {
        Self {
            coordinate: dep.coordinate().to_string(),
            version: dep.version().map(str::to_string),
            workspace_module: dep.is_workspace_import(),
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_workspace(&self, report: &WorkspaceReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_json(report, "workspace"),
            OutputFormat::Yaml => self.format_yaml(report, "workspace"),
            OutputFormat::Human => Ok(self.format_workspace_human(report)),
        }
    }

    pub fn format_locate(&self, report: &LocateReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_json(report, "locate result"),
            OutputFormat::Yaml => self.format_yaml(report, "locate result"),
            OutputFormat::Human => Ok(match &report.path {
                Some(path) => path.display().to_string(),
                None => format!("{} is not provided by the workspace", report.artifact),
            }),
        }
    }

    pub fn format_descriptor(&self, report: &DescriptorReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_json(report, "module descriptor"),
            OutputFormat::Yaml => self.format_yaml(report, "module descriptor"),
            OutputFormat::Human => Ok(self.format_descriptor_human(report)),
        }
    }

    fn format_json<T: Serialize>(&self, value: &T, what: &str) -> Result<String> {
        serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {} to JSON", what))
    }

    fn format_yaml<T: Serialize>(&self, value: &T, what: &str) -> Result<String> {
        serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
    }

    fn format_workspace_human(&self, report: &WorkspaceReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Workspace {} ({} modules)", short_id(&report.id), report.modules.len());
        if let Some(version) = &report.resolved_version {
            let _ = writeln!(out, "Resolved version: {}", version);
        }
        out.push('\n');

        for module in &report.modules {
            let marker = if report.current.as_deref() == Some(module.coordinate.as_str()) {
                '*'
            } else {
                ' '
            };
            let _ = writeln!(
                out,
                "{} {}:{} [{}]",
                marker,
                module.coordinate,
                module.version.as_deref().unwrap_or("?"),
                module.packaging
            );
            let _ = writeln!(out, "    {}", module.dir.display());
        }
        out.trim_end().to_string()
    }

    fn format_descriptor_human(&self, report: &DescriptorReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}:{} [{}]", report.coordinate, report.version, report.packaging);
        let _ = writeln!(out, "  Directory:  {}", report.module_dir.display());
        let _ = writeln!(out, "  Build dir:  {}", report.build_dir.display());
        let _ = writeln!(out, "  Build file: {}", report.build_file.display());
        if let Some(parent) = &report.parent {
            let _ = writeln!(out, "  Parent:     {}", parent);
        }

        for set in &report.source_sets {
            let name = if set.classifier.is_empty() { "main" } else { set.classifier.as_str() };
            let _ = writeln!(out, "\nSource set '{}':", name);
            for dir in &set.sources {
                let _ = writeln!(out, "  src {} -> {}", dir.dir.display(), dir.output_dir.display());
            }
            for dir in &set.resources {
                let _ = writeln!(out, "  res {} -> {}", dir.dir.display(), dir.output_dir.display());
            }
        }

        write_dependencies(&mut out, "Dependencies", &report.dependencies);
        write_dependencies(&mut out, "Dependency constraints", &report.dependency_constraints);
        out.trim_end().to_string()
    }
}

fn write_dependencies(out: &mut String, title: &str, deps: &[DependencyReport]) {
    if deps.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{}:", title);
    for dep in deps {
        let _ = writeln!(
            out,
            "  {}:{}{}",
            dep.coordinate,
            dep.version.as_deref().unwrap_or("(managed)"),
            if dep.workspace_module { " (workspace)" } else { "" }
        );
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace_report() -> WorkspaceReport {
        WorkspaceReport {
            id: "0123456789abcdef0123".to_string(),
            current: Some("org.acme:app".to_string()),
            resolved_version: Some("1.2.3".to_string()),
            modules: vec![
                ModuleReport {
                    coordinate: "org.acme:root".to_string(),
                    version: Some("1.2.3".to_string()),
                    packaging: "pom".to_string(),
                    dir: PathBuf::from("/ws"),
                    parent: None,
                    output_dir: PathBuf::from("/ws/target"),
                    classes_dir: PathBuf::from("/ws/target/classes"),
                    test_classes_dir: PathBuf::from("/ws/target/test-classes"),
                },
                ModuleReport {
                    coordinate: "org.acme:app".to_string(),
                    version: None,
                    packaging: "jar".to_string(),
                    dir: PathBuf::from("/ws/app"),
                    parent: Some("org.acme:root".to_string()),
                    output_dir: PathBuf::from("/ws/app/target"),
                    classes_dir: PathBuf::from("/ws/app/target/classes"),
                    test_classes_dir: PathBuf::from("/ws/app/target/test-classes"),
                },
            ],
        }
    }

    #[test]
    fn test_workspace_json() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format_workspace(&workspace_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["current"], "org.acme:app");
        assert_eq!(value["modules"].as_array().unwrap().len(), 2);
        assert!(value["modules"][1]["version"].is_null());
    }

    #[test]
    fn test_workspace_yaml() {
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let output = formatter.format_workspace(&workspace_report()).unwrap();
        assert!(output.contains("resolved_version: 1.2.3"));
        assert!(output.contains("coordinate: org.acme:root"));
    }

    #[test]
    fn test_workspace_human_marks_current() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_workspace(&workspace_report()).unwrap();
        assert!(output.starts_with("Workspace 0123456789ab (2 modules)"));
        assert!(output.contains("  org.acme:root:1.2.3 [pom]"));
        assert!(output.contains("* org.acme:app:? [jar]"));
    }

    #[test]
    fn test_locate_human() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let found = LocateReport {
            artifact: "org.acme:app:jar:1.0".to_string(),
            path: Some(PathBuf::from("/ws/app/target/classes")),
            versions: vec!["1.0".to_string()],
        };
        assert_eq!(formatter.format_locate(&found).unwrap(), "/ws/app/target/classes");

        let missing = LocateReport {
            path: None,
            versions: Vec::new(),
            ..found
        };
        assert!(formatter
            .format_locate(&missing)
            .unwrap()
            .contains("is not provided by the workspace"));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
    }
}

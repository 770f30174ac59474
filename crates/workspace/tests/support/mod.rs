//! On-disk project trees for integration tests

#![allow(dead_code)]

use mvnspace_core::{RealFileSystem, WorkspaceConfig};
use mvnspace_workspace::{LoaderError, Workspace, WorkspaceLoader};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const GROUP: &str = "org.acme";

/// A temporary directory holding a multi-module project
pub struct ProjectTree {
    dir: TempDir,
}

impl ProjectTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        if relative.is_empty() || relative == "." {
            self.root().to_path_buf()
        } else {
            self.root().join(relative)
        }
    }

    /// Writes `<dir>/pom.xml`
    pub fn pom(&self, dir: &str, xml: &str) -> &Self {
        self.file(&format!("{}/pom.xml", dir.trim_end_matches('/')), xml)
    }

    pub fn file(&self, relative: &str, content: &str) -> &Self {
        let path = self.path(relative.trim_start_matches("./"));
        fs::create_dir_all(path.parent().expect("file has a parent")).expect("Failed to create dirs");
        fs::write(&path, content).expect("Failed to write file");
        self
    }

    pub fn dir(&self, relative: &str) -> &Self {
        fs::create_dir_all(self.path(relative)).expect("Failed to create dir");
        self
    }

    /// Default settings with an empty local repository inside the tree
    pub fn config(&self) -> WorkspaceConfig {
        config().with_local_repository(self.path(".m2/repository"))
    }

    pub fn load(&self, start: &str) -> Result<Workspace, LoaderError> {
        self.load_with(start, self.config())
    }

    pub fn load_with(&self, start: &str, config: WorkspaceConfig) -> Result<Workspace, LoaderError> {
        WorkspaceLoader::new(Arc::new(RealFileSystem::new()), config).load_workspace(&self.path(start))
    }
}

/// Settings independent of the `MVNSPACE_*` environment
pub fn config() -> WorkspaceConfig {
    WorkspaceConfig {
        root_project_dir: None,
        alternate_pom: None,
        local_repository: PathBuf::from("/nonexistent/.m2/repository"),
        prefer_poms_from_workspace: false,
        effective_model_builder: false,
        active_profiles: Vec::new(),
        inactive_profiles: Vec::new(),
        system_properties: Default::default(),
        log_level: "info".to_string(),
    }
}

/// A standalone project in [`GROUP`]
pub fn project(artifact: &str, version: &str, body: &str) -> String {
    format!(
        "<project>\n  <groupId>{GROUP}</groupId>\n  <artifactId>{artifact}</artifactId>\n  <version>{version}</version>\n  {body}\n</project>\n"
    )
}

/// An aggregator listing `modules`
pub fn aggregator(artifact: &str, version: &str, modules: &[&str], body: &str) -> String {
    let modules: String = modules
        .iter()
        .map(|m| format!("<module>{m}</module>"))
        .collect();
    project(
        artifact,
        version,
        &format!("<packaging>pom</packaging>\n  <modules>{modules}</modules>\n  {body}"),
    )
}

/// A module inheriting group and version from `parent`
pub fn child(parent: &str, parent_version: &str, artifact: &str, body: &str) -> String {
    format!(
        "<project>\n  <parent>\n    <groupId>{GROUP}</groupId>\n    <artifactId>{parent}</artifactId>\n    <version>{parent_version}</version>\n  </parent>\n  <artifactId>{artifact}</artifactId>\n  {body}\n</project>\n"
    )
}

/// Like [`child`] with an explicit `relativePath`, empty for `<relativePath/>`
pub fn child_at(parent: &str, parent_version: &str, relative_path: &str, artifact: &str, body: &str) -> String {
    format!(
        "<project>\n  <parent>\n    <groupId>{GROUP}</groupId>\n    <artifactId>{parent}</artifactId>\n    <version>{parent_version}</version>\n    <relativePath>{relative_path}</relativePath>\n  </parent>\n  <artifactId>{artifact}</artifactId>\n  {body}\n</project>\n"
    )
}

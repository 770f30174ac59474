use crate::properties::SystemProperties;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PREFER_WORKSPACE_POMS: bool = false;
const DEFAULT_EFFECTIVE_MODEL: bool = false;
const LOCAL_REPOSITORY_DIR: &str = ".m2/repository";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Settings for one discovery run.
///
/// `Default` reads the `MVNSPACE_*` environment variables; the `with_*` setters
/// override individual values afterwards (the CLI maps its flags onto them).
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Pinned top-level project directory, loaded as a whole tree before the current module
    pub root_project_dir: Option<PathBuf>,
    /// Descriptor file name tried before `pom.xml` in every directory
    pub alternate_pom: Option<String>,
    /// Local artifact cache consulted before an empty classes directory is handed out
    pub local_repository: PathBuf,
    /// Serve workspace descriptors even for modules that were never built
    pub prefer_poms_from_workspace: bool,
    /// Build effective models while loading
    pub effective_model_builder: bool,
    pub active_profiles: Vec<String>,
    pub inactive_profiles: Vec<String>,
    pub system_properties: SystemProperties,
    pub log_level: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        let root_project_dir = env::var("MVNSPACE_ROOT_PROJECT_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let alternate_pom = env::var("MVNSPACE_ALTERNATE_POM")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let local_repository = env::var("MVNSPACE_LOCAL_REPO")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(default_local_repository);

        let prefer_poms_from_workspace = env::var("MVNSPACE_PREFER_WORKSPACE_POMS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(DEFAULT_PREFER_WORKSPACE_POMS);

        let effective_model_builder = env::var("MVNSPACE_EFFECTIVE_MODEL")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(DEFAULT_EFFECTIVE_MODEL);

        let (active_profiles, inactive_profiles) = env::var("MVNSPACE_ACTIVE_PROFILES")
            .map(|v| parse_profiles(&v))
            .unwrap_or_default();

        let log_level = env::var("MVNSPACE_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            root_project_dir,
            alternate_pom,
            local_repository,
            prefer_poms_from_workspace,
            effective_model_builder,
            active_profiles,
            inactive_profiles,
            system_properties: SystemProperties::new(),
            log_level,
        }
    }
}

/// `~/.m2/repository`, or a relative `.m2/repository` when no home directory is known
pub fn default_local_repository() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(LOCAL_REPOSITORY_DIR))
        .unwrap_or_else(|| PathBuf::from(LOCAL_REPOSITORY_DIR))
}

/// Splits a `-P` style list (`a,b,!c`) into active and deactivated profile ids
pub fn parse_profiles(list: &str) -> (Vec<String>, Vec<String>) {
    let mut active = Vec::new();
    let mut inactive = Vec::new();
    for id in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if let Some(id) = id.strip_prefix('!').or_else(|| id.strip_prefix('-')) {
            inactive.push(id.to_string());
        } else {
            active.push(id.strip_prefix('+').unwrap_or(id).to_string());
        }
    }
    (active, inactive)
}

impl WorkspaceConfig {
    pub fn with_root_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_project_dir = Some(dir.into());
        self
    }

    pub fn with_alternate_pom(mut self, name: impl Into<String>) -> Self {
        self.alternate_pom = Some(name.into());
        self
    }

    pub fn with_local_repository(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_repository = dir.into();
        self
    }

    pub fn with_prefer_poms_from_workspace(mut self, prefer: bool) -> Self {
        self.prefer_poms_from_workspace = prefer;
        self
    }

    pub fn with_effective_model_builder(mut self, enabled: bool) -> Self {
        self.effective_model_builder = enabled;
        self
    }

    pub fn with_profiles(mut self, list: &str) -> Self {
        let (active, inactive) = parse_profiles(list);
        self.active_profiles.extend(active);
        self.inactive_profiles.extend(inactive);
        self
    }

    pub fn with_system_properties(mut self, props: SystemProperties) -> Self {
        self.system_properties = props;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.system_properties.set(name, value);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into().to_lowercase();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = &self.root_project_dir {
            if !root.exists() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Top-level project base directory {} does not exist",
                    root.display()
                )));
            }
            if !root.is_dir() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Top-level project base directory {} is not a directory",
                    root.display()
                )));
            }
        }

        if let Some(name) = &self.alternate_pom {
            if Path::new(name).file_name().is_none() {
                return Err(ConfigError::ParseError {
                    field: "alternate_pom".to_string(),
                    error: format!("'{}' does not name a file", name),
                });
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if let Some(id) = self
            .active_profiles
            .iter()
            .find(|id| self.inactive_profiles.contains(id))
        {
            return Err(ConfigError::ValidationFailed(format!(
                "Profile '{}' is both activated and deactivated",
                id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for var in [
            "MVNSPACE_ROOT_PROJECT_DIR",
            "MVNSPACE_ALTERNATE_POM",
            "MVNSPACE_LOCAL_REPO",
            "MVNSPACE_PREFER_WORKSPACE_POMS",
            "MVNSPACE_EFFECTIVE_MODEL",
            "MVNSPACE_ACTIVE_PROFILES",
            "MVNSPACE_LOG_LEVEL",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = WorkspaceConfig::default();
        assert!(config.root_project_dir.is_none());
        assert!(config.alternate_pom.is_none());
        assert!(config.local_repository.ends_with(".m2/repository"));
        assert!(!config.prefer_poms_from_workspace);
        assert!(!config.effective_model_builder);
        assert!(config.active_profiles.is_empty());
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("MVNSPACE_LOCAL_REPO", "/tmp/repo");
        env::set_var("MVNSPACE_PREFER_WORKSPACE_POMS", "true");
        env::set_var("MVNSPACE_ACTIVE_PROFILES", "native,!docs");
        env::set_var("MVNSPACE_LOG_LEVEL", "DEBUG");

        let config = WorkspaceConfig::default();
        assert_eq!(config.local_repository, PathBuf::from("/tmp/repo"));
        assert!(config.prefer_poms_from_workspace);
        assert_eq!(config.active_profiles, vec!["native".to_string()]);
        assert_eq!(config.inactive_profiles, vec!["docs".to_string()]);
        assert_eq!(config.log_level, "debug");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_root_dir_fails_validation() {
        clear_env();
        let config = WorkspaceConfig::default().with_root_project_dir("/definitely/not/here");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    #[serial]
    fn test_existing_root_dir_passes_validation() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let config = WorkspaceConfig::default().with_root_project_dir(temp.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_invalid_log_level() {
        clear_env();
        let config = WorkspaceConfig::default().with_log_level("loud");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    #[serial]
    fn test_conflicting_profiles() {
        clear_env();
        let config = WorkspaceConfig::default().with_profiles("a,!a");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_profiles() {
        let (active, inactive) = parse_profiles(" a, +b ,!c,-d,, ");
        assert_eq!(active, vec!["a", "b"]);
        assert_eq!(inactive, vec!["c", "d"]);
    }
}

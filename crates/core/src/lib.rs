pub mod config;
pub mod fs;
pub mod logging;
pub mod properties;

pub use config::{ConfigError, WorkspaceConfig};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use logging::{init_from_env, init_logging, LoggingConfig};
pub use properties::SystemProperties;

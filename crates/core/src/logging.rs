//! Structured logging setup
//!
//! Discovery reports through the `tracing` macros; this module installs the
//! subscriber. Console output is the default, JSON is available for CI logs, and
//! `RUST_LOG` always takes precedence over the configured level.
//!
//! ```no_run
//! use mvnspace_core::logging;
//!
//! logging::init_from_env();
//! tracing::debug!(module = "org.acme:app", "Loaded module");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g., mvnspace_workspace::loader) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs
    pub include_thread_ids: bool,

    /// Write to stderr instead of stdout
    pub use_stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
            use_stderr: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with full metadata, for CI pipelines
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
            use_stderr: true,
        }
    }

    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            ..Default::default()
        }
    }
}

/// Parses a log level from a string, falling back to INFO
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Installs the global subscriber. Subsequent calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();

        if env::var("RUST_LOG").is_err() {
            filter = filter.add_directive(format!("mvnspace={}", config.level).parse().unwrap());
        }

        let layer = fmt::layer()
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_thread_names(config.include_thread_ids);

        match (config.use_json, config.use_stderr) {
            (true, true) => tracing_subscriber::registry()
                .with(filter)
                .with(layer.json().with_writer(std::io::stderr))
                .init(),
            (true, false) => tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init(),
            (false, true) => tracing_subscriber::registry()
                .with(filter)
                .with(layer.with_writer(std::io::stderr))
                .init(),
            (false, false) => tracing_subscriber::registry().with(filter).with(layer).init(),
        }
    });
}

/// Reads `MVNSPACE_LOG_LEVEL` and `MVNSPACE_LOG_JSON`
pub fn init_from_env() {
    let level_str = env::var("MVNSPACE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let level = parse_level(&level_str);

    let use_json = env::var("MVNSPACE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}

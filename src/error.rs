use thiserror::Error;

/// Errors detected while loading configuration; all of them abort startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("More than one default registry configured: {}", .0.join(", "))]
    AmbiguousDefault(Vec<String>),

    #[error("Registry {0} is configured more than once")]
    DuplicateRegistry(String),

    #[error("Override refers to unknown registry {0}")]
    UnknownRegistry(String),

    #[error("Invalid image pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid override: {0}")]
    InvalidOverride(String),

    #[error("Invalid auth for registry {registry}: {reason}")]
    InvalidAuth { registry: String, reason: String },

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Errors raised while setting up logging
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to initialize tracing: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

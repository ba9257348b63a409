//! Error types for keel-core

use thiserror::Error;

/// Core error type for Keel
#[derive(Error, Debug)]
pub enum CoreError {
    /// K001: Configuration file not found
    #[error("[K001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// K002: Invalid configuration value
    #[error("[K002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// K003: Migration file name matches the naming pattern but is not usable
    #[error("[K003] Invalid migration name '{name}': {reason}")]
    InvalidMigrationName { name: String, reason: String },

    /// K004: IO error with file path context
    #[error("[K004] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// K005: Config/YAML parse error
    #[error("[K005] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

//! Error types for the guard.

use std::path::PathBuf;
use thiserror::Error;

use crate::plan::PlanError;

/// Guard setup result type.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Errors raised by the database client.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error (connection, query, etc.)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A table or schema name that cannot be quoted safely
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Failure reported by a non-sqlx client
    #[error("{0}")]
    Client(String),
}

impl DbError {
    /// Create a client error.
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }
}

/// Errors raised while loading configuration or resolving the environment.
#[derive(Error, Debug)]
pub enum GuardError {
    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A dotenv source that exists but cannot be parsed
    #[error("Invalid environment file {}: {message}", path.display())]
    EnvFile { path: PathBuf, message: String },

    /// An explicitly requested config file that does not exist
    #[error("Config file not found: {}", .0.display())]
    ConfigMissing(PathBuf),

    /// TOML syntax or schema error
    #[error("Invalid config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Identity rules that would make every check pass or fail
    #[error("Invalid identity rules: {0}")]
    InvalidRules(String),

    /// Deletion plan that cannot be ordered
    #[error("Invalid deletion plan: {0}")]
    Plan(#[from] PlanError),
}

impl GuardError {
    pub(crate) fn env_file(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::EnvFile {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

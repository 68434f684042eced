//! Error types for GHA OIDC Bootstrap

use std::path::{Path, PathBuf};

use crate::aws::AwsError;
use thiserror::Error;

/// Main error type for bootstrap operations
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// An input file the caller is expected to provide does not exist.
    #[error("Required input file not found: {}", path.display())]
    MissingInput { path: PathBuf, hint: String },

    #[error("Failed to {operation} '{}': {source}", path.display())]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("YAML serialization failed: {0}")]
    Yaml(String),

    #[error("Template rendering failed: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external program exited with a non-zero status.
    #[error("'{program}' exited with status {code}")]
    ExternalCommand {
        program: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("AWS operation failed: {0}")]
    Aws(#[from] AwsError),

    #[error("GitHub API error: {0}")]
    GitHub(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias
pub type BootstrapResult<T> = Result<T, BootstrapError>;

impl BootstrapError {
    pub fn missing_input(path: impl Into<PathBuf>, hint: impl Into<String>) -> Self {
        Self::MissingInput {
            path: path.into(),
            hint: hint.into(),
        }
    }
    pub fn file_system(
        operation: impl Into<String>,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }
    pub fn yaml(msg: impl Into<String>) -> Self {
        Self::Yaml(msg.into())
    }
    pub fn github(msg: impl Into<String>) -> Self {
        Self::GitHub(msg.into())
    }
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// True when the error reports an expected input that is absent.
    #[must_use]
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::MissingInput { .. })
    }
}

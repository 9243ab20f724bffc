//! Error types for the CLI

use std::path::PathBuf;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Driver(#[from] capstan_common::Error),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] capstan_common::telemetry::TelemetryError),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read {path}: {message}")]
    ReadFile { path: PathBuf, message: String },
}

impl Error {
    pub fn read_file(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::ReadFile {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

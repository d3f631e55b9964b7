//! # Application Errors

use customprops_core::PropertyError;
use std::path::PathBuf;
use thiserror::Error;

/// Everything a CLI command can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid schema: {0}")]
    Schema(#[from] toml::de::Error),

    #[error("Invalid JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Validation or saving left errors on this many properties.
    #[error("{0} propert(y/ies) failed validation")]
    Invalid(usize),

    #[error("Invalid argument: {0}")]
    Argument(String),
}

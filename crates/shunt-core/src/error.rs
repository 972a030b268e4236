//! Routing error types

use thiserror::Error;

/// Errors surfaced by routing resolution and rule administration
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("model {model:?} is not supported")]
    UnknownModel { model: String },

    #[error("invalid regex pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("a file rule for type {file_type:?} already exists")]
    DuplicateFileType { file_type: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

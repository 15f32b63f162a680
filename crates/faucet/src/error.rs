use std::path::PathBuf;

use fleet::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum DeployError {
    #[error("invalid arguments for {command}: expected {expected}, got {got}")]
    InvalidArguments {
        command: &'static str,
        expected: String,
        got: usize,
    },
    #[error("failed to load config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
    #[error("failed to list machines: {0:#}")]
    Api(anyhow::Error),
    #[error("{name} not found")]
    NotFound { name: String },
    #[error("source control: {0}")]
    SourceControl(String),
    #[error("failed to archive tag {tag}: {message}")]
    Archive { tag: String, message: String },
    #[error("failed to copy {file} to {machine}: {message}")]
    Transfer {
        file: String,
        machine: String,
        message: String,
    },
    #[error("`{command}` failed on {machine}: {message}")]
    Exec {
        machine: String,
        command: String,
        message: String,
    },
    #[error("invalid image reference {reference:?}: expected <repo>/<image>:<tag>")]
    InvalidImage { reference: String },
}

impl From<ResolveError> for DeployError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Api(cause) => Self::Api(cause),
            ResolveError::NotFound { name } => Self::NotFound { name },
        }
    }
}

pub(crate) type DeployResult<T> = Result<T, DeployError>;

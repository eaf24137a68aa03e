// ABOUTME: Application-wide error types for tideway.
// ABOUTME: Uses thiserror; wraps configuration, publishing and deployment failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::publish::PublishError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("region {0} is not configured for this deployment")]
    UnknownRegion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image publish failed")]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

pub type Result<T> = std::result::Result<T, Error>;

// src/errors.rs

//! Crate-wide error type and the strict/permissive helper.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum BuildclothError {
    /// A job spec has an unrecognised shape, names an unknown task, carries
    /// malformed arguments, or references an unresolved `{token}`.
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// Malformed stage membership or an unrecognised stage kind.
    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    #[error("Stage is closed: {0}")]
    ClosedStage(String),

    /// Structural misuse of a `System` or a `Generator`.
    #[error("Invalid system: {0}")]
    InvalidSystem(String),

    #[error("Stage run error: {0}")]
    StageRun(String),

    #[error("Unknown dependency check method: {0}")]
    UnknownCheckMethod(String),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Job timed out after {0:?}")]
    JobTimeout(Duration),

    #[error("Cycle detected in dependency graph: {0}")]
    DependencyCycle(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildclothError>;

/// Strict mode surfaces `err`; permissive mode logs it and yields `false`.
pub(crate) fn fail_or_false(strict: bool, err: BuildclothError) -> Result<bool> {
    if strict {
        Err(err)
    } else {
        warn!(error = %err, "permissive mode; returning false");
        Ok(false)
    }
}

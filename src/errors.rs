// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobgraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Node not found: {0}")]
    UnknownNode(String),

    #[error("Cycle detected in action graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// `collect` was called a second time for a node whose status is already
    /// recorded. The first recorded status is kept.
    #[error("Status already recorded for node '{0}'")]
    AlreadyCollected(String),

    /// A job raised a fatal error and the scheduler stopped the run.
    #[error("Job '{node}' aborted: {message}")]
    JobAborted { node: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobgraphError>;

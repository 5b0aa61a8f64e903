// src/errors.rs

//! Crate-wide error type and result alias.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in process dependencies: {0}")]
    DependencyCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The subprocess could not be started at all.
    #[error("could not start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// No result record was published within the caller's wait bound.
    #[error("timed out after {0:?} waiting for process result")]
    ResultTimeout(Duration),

    #[error("managed process was already started")]
    AlreadyStarted,

    #[error("no free ports left in range {start}..{end}")]
    PortsExhausted { start: u16, end: u16 },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, HarnessError>;

//! Error types for the fallible edges of the engine.
//!
//! Graph computation itself never fails; only configuration loading,
//! persistence and identifier parsing report errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read engine config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid engine config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode view state: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode view state: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("storage error at {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown intelligence layer: {0:?}")]
pub struct LayerParseError(pub String);

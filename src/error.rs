//! Startup error type
//!
//! Only loading and validating tuning/level data can fail. Simulation ticks
//! are total over validated state.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {what} data: {source}")]
    Json {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid tuning: {0}")]
    InvalidTuning(String),

    #[error("invalid level: {0}")]
    InvalidLevel(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Read a whole file, tagging failures with the path
pub(crate) fn read_file(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

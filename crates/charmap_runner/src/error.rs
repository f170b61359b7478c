// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runner errors.

use charmap_diagram::LoadError;
use std::path::PathBuf;

/// Errors that stop a runner command
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// File could not be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File could not be written
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Saved diagram is malformed
    #[error("{}: {source}", path.display())]
    Load {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: LoadError,
    },

    /// Config file is not valid RON
    #[error("invalid config: {0}")]
    Config(#[from] ron::error::SpannedError),

    /// Config could not be serialized
    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] ron::Error),

    /// Config written by a newer runner
    #[error("config version {found} is newer than supported version {supported}")]
    UnsupportedConfigVersion {
        /// Version in the file
        found: u32,
        /// Newest version this runner reads
        supported: u32,
    },

    /// JSON report could not be encoded
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),

    /// File watcher failure
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

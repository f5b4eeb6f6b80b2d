//! Error taxonomy for parsing and storage.
//!
//! Which variants are fatal is decided by the caller: the indexing
//! orchestrator logs and counts per-file errors, and fails the pass only
//! for an unusable root or a failed [`IndexError::Clear`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// A path could not be read during the directory walk.
    #[error("failed to access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A delimited frontmatter block was present but not valid YAML, or an
    /// exclude pattern did not compile.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The device row (or its full-text entry) could not be written.
    #[error("failed to write device {id}: {source}")]
    StorageWrite {
        id: String,
        #[source]
        source: sqlx::Error,
    },

    /// Pinout or specification rows could not be written for a device
    /// whose own row is already committed.
    #[error("failed to write secondary records for {id}: {source}")]
    SecondaryWrite {
        id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to clear index: {0}")]
    Clear(#[source] sqlx::Error),

    #[error("failed to encode metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;

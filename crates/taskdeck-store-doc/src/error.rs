//! Error types for document store operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during `DocumentStore` operations.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Another thread panicked while holding the document lock.
    #[error("Document lock poisoned")]
    LockPoisoned,

    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file does not hold a valid document list.
    #[error("Failed to parse documents in {path}: {source}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Documents could not be encoded for writing.
    #[error("Failed to serialize documents: {0}")]
    Serialize(#[from] serde_json::Error),
}


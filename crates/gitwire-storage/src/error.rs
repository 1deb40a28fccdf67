//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object data or identifier was malformed.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// No object with the given id is present in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// No repository with the given key is present in the store.
    #[error("repository not found: {0}")]
    RepoNotFound(String),

    /// A repository with the given key already exists.
    #[error("repository already exists: {0}")]
    RepoExists(String),

    /// No reference with the given name is present.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// A reference value could not be resolved or was malformed.
    #[error("invalid reference: {0}")]
    InvalidRef(String),

    /// Zlib compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

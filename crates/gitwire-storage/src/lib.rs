//! # gitwire-storage
//!
//! Content-addressed storage for Git objects (blobs, trees, commits) and refs.
//!
//! This crate has no notion of the network protocol; it provides the sync,
//! thread-safe primitives (`ObjectStore`, `RefStore`, `Repository`, `RepoStore`)
//! that a repository agent implementation is built on top of.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod object;
mod refs;
mod store;

pub use error::{Result, StorageError};
pub use object::{GitObject, ObjectId, ObjectType, TreeEntry};
pub use refs::{Reference, RefStore};
pub use store::{ObjectStore, RepoStore, Repository};

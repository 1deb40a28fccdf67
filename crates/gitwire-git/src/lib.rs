//! Git smart HTTP transport protocol: PKT-LINE framing, reference
//! advertisement, and the upload-pack/receive-pack state machines.
//!
//! This crate has no notion of HTTP; it is driven by an adapter that maps
//! routes to [`Service`] calls and owns auth, gzip, and status codes.
//! Storage is likewise external: everything here runs against the
//! [`RepositoryAgent`] trait, with [`InMemoryAgent`] provided as a reference
//! implementation for tests and local use.

mod agent;
mod error;
mod pack;
mod pktline;
mod protocol;

pub use agent::{Command, InMemoryAgent, Ref, RepositoryAgent, UpdateReport};
pub use error::GitError;
pub use pack::{PackBuilder, PackParser};
pub use pktline::{PktLine, PktLineReader, PktLineWriter};
pub use protocol::{
    advertise_refs, run_receive_pack, run_upload_pack, Service, ServiceKind,
    RECEIVE_PACK_CAPABILITIES, UPLOAD_PACK_CAPABILITIES,
};

/// Result type for git protocol operations.
pub type Result<T> = std::result::Result<T, GitError>;

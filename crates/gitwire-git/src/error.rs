//! Error types for the git smart HTTP transport.

use thiserror::Error;

/// Errors that can occur while decoding or driving the git wire protocol.
#[derive(Debug, Error)]
pub enum GitError {
    /// Invalid pack file format.
    #[error("invalid pack file: {0}")]
    InvalidPack(String),

    /// A PKT-LINE could not be decoded (bad length prefix, truncated body).
    #[error("malformed pkt-line: {0}")]
    MalformedPktLine(String),

    /// The stream ended in the middle of a token that required more bytes.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A `want`/`have`/update command line didn't parse.
    #[error("bad command line: {0}")]
    BadCommandLine(String),

    /// A 40-character hex object id failed to parse.
    #[error("bad object id: {0}")]
    BadOidHex(String),

    /// A client asked for an object id the repository doesn't have.
    #[error("not our ref: {0}")]
    NotOurRef(String),

    /// Unpacking (parsing and storing) the received pack failed.
    #[error("unpack failed: {0}")]
    UnpackFailed(String),

    /// A protocol step was invoked out of order for the service's state machine.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Requested object is missing from the backing store.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The named repository does not exist.
    #[error("repository not found: {0}")]
    RepoNotFound(String),

    /// The request carried no (or invalid) credentials.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The credentials were valid but lack the permission the operation needs.
    #[error("unauthorized")]
    Unauthorized,

    /// The repository agent backing this operation returned an error.
    #[error("repository agent error: {0}")]
    Agent(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] gitwire_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

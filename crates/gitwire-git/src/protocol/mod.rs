//! Git smart HTTP protocol state machines.
//!
//! The protocol core never touches storage directly — it runs entirely
//! against a [`RepositoryAgent`]. Each request gets a fresh [`Service`]
//! value for the duration of the call; nothing here is shared across
//! requests.
//!
//! [`RepositoryAgent`]: crate::agent::RepositoryAgent

mod advertise;
mod receive_pack;
mod upload_pack;

pub use advertise::{advertise_refs, RECEIVE_PACK_CAPABILITIES, UPLOAD_PACK_CAPABILITIES};
pub use receive_pack::run_receive_pack;
pub use upload_pack::run_upload_pack;

use crate::agent::RepositoryAgent;
use crate::Result;
use std::io::Read;

/// Which smart-HTTP service a request is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// `git-upload-pack` — fetch/clone.
    UploadPack,
    /// `git-receive-pack` — push.
    ReceivePack,
}

impl ServiceKind {
    /// Parses the `service=` query parameter / path segment used over HTTP.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "git-upload-pack" => Some(Self::UploadPack),
            "git-receive-pack" => Some(Self::ReceivePack),
            _ => None,
        }
    }

    /// The name used in `service=` query parameters and Content-Type headers.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UploadPack => "git-upload-pack",
            Self::ReceivePack => "git-receive-pack",
        }
    }

    /// The fixed capability set this service advertises.
    pub fn capabilities(&self) -> &'static str {
        match self {
            Self::UploadPack => UPLOAD_PACK_CAPABILITIES,
            Self::ReceivePack => RECEIVE_PACK_CAPABILITIES,
        }
    }
}

/// A tagged union over the two services the wire protocol drives.
///
/// Bound to a `&dyn RepositoryAgent` for the duration of one HTTP request;
/// never reused across requests or shared across threads.
pub enum Service<'a> {
    /// `git-upload-pack`.
    Upload(&'a dyn RepositoryAgent),
    /// `git-receive-pack`.
    Receive(&'a dyn RepositoryAgent),
}

impl<'a> Service<'a> {
    /// Builds a service bound to `agent` for the given service kind.
    pub fn new(kind: ServiceKind, agent: &'a dyn RepositoryAgent) -> Self {
        match kind {
            ServiceKind::UploadPack => Self::Upload(agent),
            ServiceKind::ReceivePack => Self::Receive(agent),
        }
    }

    /// The service kind this instance is driving.
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::Upload(_) => ServiceKind::UploadPack,
            Self::Receive(_) => ServiceKind::ReceivePack,
        }
    }

    /// Produces the `disco` state's output: the reference advertisement,
    /// tagged with this service's capability set.
    pub fn advertise(&self) -> Result<Vec<u8>> {
        let agent = match self {
            Self::Upload(a) | Self::Receive(a) => *a,
        };
        advertise_refs(agent, self.kind().capabilities())
    }

    /// Drives the remaining states (`wants`/`haves`/`done` or
    /// `commands`/`buffer`/`report`/`done`) from a fully-buffered request
    /// body, returning the fully-buffered response body.
    pub fn step<R: Read>(&self, input: &mut R) -> Result<Vec<u8>> {
        match self {
            Self::Upload(agent) => run_upload_pack(*agent, input),
            Self::Receive(agent) => run_receive_pack(*agent, input),
        }
    }
}

pub(crate) fn parse_capabilities(tail: &str, known: &[&str]) -> std::collections::HashSet<String> {
    tail.split_whitespace()
        .map(|s| s.to_string())
        .filter(|s| known.contains(&s.as_str()))
        .collect()
}

//! Credential decoding and authorization checks for the Git Smart HTTP adapter.
//!
//! This crate answers exactly two questions on behalf of the HTTP layer:
//! who is the caller (`authenticate`), and are they allowed to do what
//! they're asking to do against a given repository (`authorize`). It does
//! not model organizations, teams, webhooks, or any other forge-level
//! concept — those are out of scope and belong to an external identity
//! provider in a real deployment.
//!
//! ```
//! use gitwire_auth::{basic::decode_basic_auth, CredentialChecker, InMemoryCredentialStore, Permission};
//!
//! let store = InMemoryCredentialStore::new();
//! store.set_password("alice", "hunter2");
//! store.grant("alice/myrepo", "bob", Permission::Write);
//!
//! let header = "Basic YWxpY2U6aHVudGVyMg==";
//! let (login, password) = decode_basic_auth(header).unwrap();
//! let principal = store.authenticate(&login, &password).unwrap();
//! assert!(store.authorize(&principal, "alice/myrepo", Permission::Admin));
//! ```

pub mod basic;
mod error;
mod permission;
mod store;

pub use basic::decode_basic_auth;
pub use error::{AuthError, Result};
pub use permission::Permission;
pub use store::{CredentialChecker, InMemoryCredentialStore, Principal};

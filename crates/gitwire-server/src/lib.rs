//! # gitwire-server
//!
//! The HTTP adapter exposing the Git Smart HTTP transport protocol: it maps
//! HTTP requests onto the [`gitwire_git`] wire-protocol engine, backed by
//! repositories held in a [`gitwire_storage::RepoStore`] and gated by a
//! [`gitwire_auth::CredentialChecker`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      gitwire-server                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │                   HTTP Adapter (api)                │  │
//! │  │  • info/refs, HEAD, git-upload-pack, git-receive-pack│ │
//! │  │  • Basic-auth gate, gzip body inflation              │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                            │                               │
//! │  ┌───────────────┐  ┌───────────────┐  ┌───────────────┐  │
//! │  │  gitwire-git  │  │gitwire-storage│  │ gitwire-auth  │  │
//! │  │ wire protocol │  │  repositories │  │  credentials  │  │
//! │  └───────────────┘  └───────────────┘  └───────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Health probes, structured logging, and request-id tracking round out the
//! ambient stack; see [`health`] and [`observability`].
//!
//! ## Quick start
//!
//! ```bash
//! cargo run --bin gitwire-server -- --config gitwire.yaml
//! ```
//!
//! ## Modules
//!
//! - [`api`] — Git Smart HTTP routes and application state
//! - [`config`] — server configuration loading/validation
//! - [`health`] — liveness/readiness/startup probes
//! - [`observability`] — structured logging and request tracking

pub mod api;
pub mod config;
pub mod health;
pub mod observability;

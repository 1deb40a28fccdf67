//! # Observability Module
//!
//! Structured logging and request tracking for the HTTP adapter:
//!
//! - **Structured Logging**: JSON or pretty-formatted logs.
//! - **Request Tracing**: `x-request-id` propagation and a per-request span.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use axum::Router;
//! use gitwire_server::observability::{init_logging, request_id_middleware, LogFormat};
//!
//! init_logging("info", LogFormat::Json);
//!
//! let app: Router<()> = Router::new()
//!     .layer(axum::middleware::from_fn(request_id_middleware));
//! ```

mod logging;
pub mod middleware;

pub use logging::{init_logging, LogFormat};
pub use middleware::{request_id_middleware, RequestId, REQUEST_ID_HEADER};

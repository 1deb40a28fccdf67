//! Error types for the auth crate.

use thiserror::Error;

/// Errors that can occur while decoding credentials or checking capabilities.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The request carried no, or malformed, credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Credentials were valid but don't grant the required capability.
    #[error("forbidden")]
    Forbidden,
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

use thiserror::Error;

/// Errors related to signing in against the identity backend
#[derive(Error, Debug)]
pub enum AuthError {
    /// Email/password pair was refused
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Identity backend could not be reached or failed internally
    #[error("Auth service unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected auth response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

use thiserror::Error;

/// Errors that can occur when interacting with S3-compatible storage
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend unreachable, misconfigured, or the bucket does not exist
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Object with key {0} not found")]
    ObjectNotFound(String),

    #[error("Access denied for object {0}: {1}")]
    AccessDenied(String, String),

    #[error("Failed to read object {0}: {1}")]
    ReadError(String, String),

    #[error("Write rejected for object {0}: {1}")]
    WriteRejected(String, String),

    #[error("Other storage error: {0}")]
    Other(#[from] anyhow::Error),
}

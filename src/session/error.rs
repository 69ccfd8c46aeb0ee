use crate::annotation::AnnotationError;
use crate::auth::AuthError;
use crate::s3::StorageError;
use crate::session::workflow::WorkflowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Sign-in failed: {0}")]
    AuthFailure(#[from] AuthError),

    #[error("Bucket does not exist: {0}")]
    BucketMissing(String),

    #[error("Failed to save annotation for {0}: {1}")]
    WriteRejected(String, String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

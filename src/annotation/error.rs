use crate::s3::StorageError;
use thiserror::Error;

/// Errors raised while building, writing or reading annotation records
#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Unknown label '{0}'")]
    UnknownLabel(String),

    #[error("Annotation has no annotator identity")]
    MissingAnnotator,

    #[error("Failed to encode annotation: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

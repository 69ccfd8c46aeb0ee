pub mod error;
pub mod models;
pub mod reconciler;
pub mod writer;

pub use error::AnnotationError;
pub use models::{annotation_key, base_name, AnnotationRecord, ImageFormat, Label};
pub use reconciler::{progress, remaining, Progress};
pub use writer::AnnotationWriter;

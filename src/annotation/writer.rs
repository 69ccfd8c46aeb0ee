use crate::annotation::error::AnnotationError;
use crate::annotation::models::{annotation_key, AnnotationRecord, Label, ANNOTATION_CONTENT_TYPE};
use crate::s3::Storage;
use bytes::Bytes;
use tracing::{debug, info, warn};

/// Writes sidecar records into the annotations bucket.
///
/// A save overwrites any earlier record for the same image; there is no
/// merge and no conflict detection between concurrent annotators.
pub struct AnnotationWriter<S: Storage> {
    storage: S,
    bucket: String,
}

impl<S: Storage> AnnotationWriter<S> {
    pub fn new(storage: S, bucket: impl Into<String>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
        }
    }

    /// Persist a label for `image_key` and return the key it was written to
    pub async fn save(
        &self,
        image_key: &str,
        label: Label,
        comment: &str,
        annotator: &str,
    ) -> Result<String, AnnotationError> {
        if annotator.trim().is_empty() {
            return Err(AnnotationError::MissingAnnotator);
        }

        let record = AnnotationRecord {
            file: image_key.to_string(),
            label,
            comment: comment.to_string(),
            annotator: annotator.to_string(),
        };
        let key = annotation_key(image_key);
        let body = record.to_json_bytes()?;

        debug!("Writing annotation {}/{} for {}", self.bucket, key, image_key);

        if let Err(e) = self
            .storage
            .put_object(&self.bucket, &key, Bytes::from(body), ANNOTATION_CONTENT_TYPE)
            .await
        {
            warn!("Failed to save annotation {}: {}", key, e);
            return Err(e.into());
        }

        info!("Annotation saved: {} -> {} by {}", image_key, label, annotator);
        Ok(key)
    }

    /// Read back the record stored for `image_key`
    pub async fn load(&self, image_key: &str) -> Result<AnnotationRecord, AnnotationError> {
        let key = annotation_key(image_key);
        let data = self.storage.get_object(&self.bucket, &key).await?;
        AnnotationRecord::from_json_bytes(&data)
    }
}

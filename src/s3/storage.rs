use crate::s3::error::StorageError;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Storage trait defining the operations the annotator needs from an
/// S3-compatible object store. Keys are full object paths within a bucket.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// List every object key under `prefix`, recursively
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Get the full content of an object
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError>;

    /// Write or overwrite an object in a single request
    ///
    /// * `content_type` - MIME type stored with the object
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Check if a bucket exists
    async fn has_bucket(&self, bucket: &str) -> Result<bool, StorageError>;

    /// Remove an object from storage (test-only)
    #[cfg(test)]
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Create a bucket (test-only)
    #[cfg(test)]
    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError>;
}

/// Implementation of Storage trait for Arc<T> where T implements Storage
#[async_trait]
impl<T: Storage + ?Sized> Storage for Arc<T> {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        (**self).list_objects(bucket, prefix).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        (**self).get_object(bucket, key).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        (**self).put_object(bucket, key, data, content_type).await
    }

    async fn has_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        (**self).has_bucket(bucket).await
    }

    #[cfg(test)]
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        (**self).remove_object(bucket, key).await
    }

    #[cfg(test)]
    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        (**self).create_bucket(bucket).await
    }
}

/// Turn a configured folder name into a listing prefix.
///
/// `oakd_43` and `oakd_43/` both become `oakd_43/`; an empty folder lists the
/// whole bucket.
pub fn folder_prefix(folder: &str) -> String {
    let trimmed = folder.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

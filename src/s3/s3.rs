use crate::config::StorageConfig;
use crate::s3::error::StorageError;
use crate::s3::storage::Storage;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Number of fetched objects kept in memory
const OBJECT_CACHE_SIZE: usize = 64;

type ObjectCache = lru::LruCache<(String, String), Bytes>;

/// Real S3 implementation of the Storage trait, tuned for MinIO
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    cache: Arc<Mutex<ObjectCache>>,
}

impl S3Storage {
    /// Create a new S3Storage instance from configuration
    pub async fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        info!(
            "Creating S3Storage with config: endpoint={}, region={}, access_key={}",
            config.endpoint, config.region, config.access_key_id
        );

        let mut s3_config_builder = if config.uses_default_credentials() {
            // Fall back to the default credential chain (env, profile, ...)
            let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.region.clone()))
                .load()
                .await;
            aws_sdk_s3::config::Builder::from(&sdk_config)
        } else {
            let credentials = Credentials::new(
                &config.access_key_id,
                &config.secret_access_key,
                None,
                None,
                "StaticCredentialsProvider",
            );
            aws_sdk_s3::config::Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new(config.region.clone()))
                .credentials_provider(credentials)
        };

        // MinIO requires path-style requests
        s3_config_builder = s3_config_builder
            .force_path_style(true)
            .endpoint_url(&config.endpoint);

        let client = Client::from_conf(s3_config_builder.build());

        let cache_size = NonZeroUsize::new(OBJECT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        let cache = Arc::new(Mutex::new(lru::LruCache::new(cache_size)));

        info!("Created S3 client for endpoint {}", config.endpoint);

        Ok(Self { client, cache })
    }
}

fn error_code<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> Option<&str> {
    err.as_service_error().and_then(|e| e.code())
}

fn is_transport_failure<E, R>(err: &SdkError<E, R>) -> bool {
    matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ConstructionFailure(_)
    )
}

#[async_trait]
impl Storage for S3Storage {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        debug!("Listing objects in {}/{}", bucket, prefix);

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| match error_code(&e) {
                Some("NoSuchBucket") => {
                    StorageError::Unavailable(format!("Bucket '{}' does not exist", bucket))
                }
                Some("AccessDenied") => StorageError::AccessDenied(
                    format!("{}/{}", bucket, prefix),
                    DisplayErrorContext(&e).to_string(),
                ),
                _ => StorageError::Unavailable(format!(
                    "Failed to list '{}/{}': {}",
                    bucket,
                    prefix,
                    DisplayErrorContext(&e)
                )),
            })?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_string),
            );
        }

        debug!("Listed {} objects in {}/{}", keys.len(), bucket, prefix);
        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let cache_key = (bucket.to_string(), key.to_string());

        // Check cache first
        {
            let mut cache = self.cache.lock().await;
            if let Some(data) = cache.get(&cache_key) {
                debug!("Cache hit for object: {}/{}", bucket, key);
                return Ok(data.clone());
            }
        }

        debug!("Fetching object from S3: {}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if is_transport_failure(&e) {
                    return StorageError::Unavailable(DisplayErrorContext(&e).to_string());
                }

                match error_code(&e) {
                    Some("NoSuchKey") | Some("KeyNotFound") | Some("NotFound") => {
                        return StorageError::ObjectNotFound(key.to_string());
                    }
                    Some("NoSuchBucket") => {
                        return StorageError::Unavailable(format!(
                            "Bucket '{}' does not exist",
                            bucket
                        ));
                    }
                    Some("AccessDenied") => {
                        return StorageError::AccessDenied(key.to_string(), e.to_string());
                    }
                    _ => {}
                }

                // Fallback to string matching for gateways that omit the error code
                let error_str = DisplayErrorContext(&e).to_string();
                if error_str.contains("NoSuchKey")
                    || error_str.contains("404")
                    || error_str.contains("Not Found")
                {
                    StorageError::ObjectNotFound(key.to_string())
                } else {
                    StorageError::ReadError(key.to_string(), error_str)
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::ReadError(key.to_string(), e.to_string()))?
            .into_bytes();

        {
            let mut cache = self.cache.lock().await;
            cache.put(cache_key, data.clone());
        }

        debug!("Successfully fetched object from S3: {}/{}", bucket, key);
        Ok(data)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        debug!(
            "Putting object to S3: {}/{} ({} bytes, {})",
            bucket,
            key,
            data.len(),
            content_type
        );

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(data.len() as i64)
            .body(ByteStream::from(data.clone()))
            .send()
            .await
            .map_err(|e| {
                if is_transport_failure(&e) {
                    return StorageError::Unavailable(DisplayErrorContext(&e).to_string());
                }
                match error_code(&e) {
                    Some("NoSuchBucket") => {
                        StorageError::Unavailable(format!("Bucket '{}' does not exist", bucket))
                    }
                    _ => StorageError::WriteRejected(
                        key.to_string(),
                        DisplayErrorContext(&e).to_string(),
                    ),
                }
            })?;

        // Keep the read cache coherent with what was just written
        let mut cache = self.cache.lock().await;
        cache.put((bucket.to_string(), key.to_string()), data);

        info!("Stored object {}/{}", bucket, key);
        Ok(())
    }

    async fn has_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                debug!("Bucket '{}' exists", bucket);
                Ok(true)
            }
            Err(e) => {
                if is_transport_failure(&e) {
                    return Err(StorageError::Unavailable(
                        DisplayErrorContext(&e).to_string(),
                    ));
                }

                if let Some(code) = error_code(&e) {
                    debug!("has_bucket error for '{}': code={}", bucket, code);
                    if code == "NoSuchBucket" || code == "NotFound" {
                        info!("Bucket '{}' does not exist", bucket);
                        return Ok(false);
                    }
                }

                let error_str = DisplayErrorContext(&e).to_string();
                if error_str.contains("NoSuchBucket")
                    || error_str.contains("404")
                    || error_str.contains("NotFound")
                {
                    info!("Bucket '{}' does not exist", bucket);
                    Ok(false)
                } else {
                    warn!("Error checking bucket '{}': {}", bucket, error_str);
                    Err(StorageError::Unavailable(format!(
                        "Error checking bucket existence: {}",
                        error_str
                    )))
                }
            }
        }
    }

    #[cfg(test)]
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                StorageError::Other(anyhow::anyhow!("Failed to delete object '{}': {}", key, e))
            })?;

        let mut cache = self.cache.lock().await;
        cache.pop(&(bucket.to_string(), key.to_string()));

        debug!("Successfully removed object: {}/{}", bucket, key);
        Ok(())
    }

    #[cfg(test)]
    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        info!("Creating bucket '{}'", bucket);

        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => match error_code(&e) {
                Some("BucketAlreadyExists") | Some("BucketAlreadyOwnedByYou") => {
                    info!("Bucket '{}' already exists", bucket);
                    Ok(())
                }
                _ => Err(StorageError::Other(anyhow::anyhow!(
                    "Failed to create bucket '{}': {}",
                    bucket,
                    DisplayErrorContext(&e)
                ))),
            },
        }
    }
}

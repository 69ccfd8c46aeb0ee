use crate::s3::error::StorageError;
use crate::s3::storage::Storage;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// `FakeStorage` is an in-memory implementation of the `Storage` trait for testing purposes.
/// It allows simulating various storage scenarios, including outages and rejected writes.
#[derive(Clone)]
pub struct FakeStorage {
    buckets: Arc<Mutex<HashMap<String, BTreeMap<String, StoredObject>>>>,
    fail_objects: Arc<Mutex<HashSet<String>>>,
    reject_writes: Arc<Mutex<HashSet<String>>>,
    unavailable: Arc<AtomicBool>,
    list_calls: Arc<AtomicUsize>,
}

impl FakeStorage {
    /// Create a new FakeStorage with no buckets
    pub fn new() -> Self {
        FakeStorage {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            fail_objects: Arc::new(Mutex::new(HashSet::new())),
            reject_writes: Arc::new(Mutex::new(HashSet::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
            list_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a FakeStorage that already has the given buckets
    pub async fn with_buckets(buckets: &[&str]) -> Self {
        let storage = Self::new();
        for bucket in buckets {
            storage.create_bucket(bucket).await.unwrap();
        }
        storage
    }

    /// Add an object, creating its bucket if needed
    pub async fn fake_add_object(&self, bucket: &str, key: &str, data: Bytes) {
        let mut buckets = self.buckets.lock().await;
        buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    /// Simulate a read failure for a specific object key
    pub async fn fake_fail_object(&self, key: &str) {
        let mut fail_objects = self.fail_objects.lock().await;
        fail_objects.insert(key.to_string());
    }

    /// Reject every write to a specific object key
    pub async fn fake_reject_writes(&self, key: &str) {
        let mut reject_writes = self.reject_writes.lock().await;
        reject_writes.insert(key.to_string());
    }

    /// Simulate the whole backend being unreachable
    pub fn fake_set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of list calls served so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Content type an object was stored with
    pub async fn fake_content_type(&self, bucket: &str, key: &str) -> Option<String> {
        let buckets = self.buckets.lock().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.content_type.clone())
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable(
                "Simulated storage outage".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Storage for FakeStorage {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let buckets = self.buckets.lock().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StorageError::Unavailable(format!("Bucket '{}' does not exist", bucket)))?;

        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        self.check_available()?;

        let fail_objects = self.fail_objects.lock().await;
        if fail_objects.contains(key) {
            return Err(StorageError::ObjectNotFound(key.to_string()));
        }
        drop(fail_objects);

        let buckets = self.buckets.lock().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.data.clone())
            .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.check_available()?;

        let reject_writes = self.reject_writes.lock().await;
        if reject_writes.contains(key) {
            return Err(StorageError::WriteRejected(
                key.to_string(),
                "Simulated write rejection".to_string(),
            ));
        }
        drop(reject_writes);

        let mut buckets = self.buckets.lock().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::Unavailable(format!("Bucket '{}' does not exist", bucket)))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn has_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        self.check_available()?;
        let buckets = self.buckets.lock().await;
        Ok(buckets.contains_key(bucket))
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let mut buckets = self.buckets.lock().await;
        match buckets.get_mut(bucket).and_then(|objects| objects.remove(key)) {
            Some(_) => Ok(()),
            None => Err(StorageError::ObjectNotFound(key.to_string())),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut buckets = self.buckets.lock().await;
        buckets.entry(bucket.to_string()).or_default();
        Ok(())
    }
}

impl Default for FakeStorage {
    fn default() -> Self {
        Self::new()
    }
}

use crate::annotation::models::ANNOTATION_SUFFIX;
use crate::annotation::ImageFormat;
use crate::config::CacheConfig;
use crate::s3::Storage;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// The two listings the cache memoizes, each with its own time-to-live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listing {
    Images,
    Annotations,
}

struct CachedListing {
    keys: Vec<String>,
    fetched_at: Instant,
}

type EntryKey = (Listing, String, String);

/// Time-bounded memoization of bucket listings, one entry per (bucket, prefix).
///
/// A failed listing is logged and reported as empty without being cached, so
/// the next call goes back to storage.
pub struct ListingCache<S: Storage> {
    storage: S,
    images_ttl: Duration,
    annotations_ttl: Duration,
    entries: Mutex<HashMap<EntryKey, CachedListing>>,
}

impl<S: Storage> ListingCache<S> {
    pub fn new(storage: S, config: &CacheConfig) -> Self {
        Self {
            storage,
            images_ttl: config.images_ttl(),
            annotations_ttl: config.annotations_ttl(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Image keys under `prefix` with a recognized extension, sorted
    pub async fn images(&self, bucket: &str, prefix: &str) -> Vec<String> {
        self.cached_or_fetch(Listing::Images, bucket, prefix, |keys| {
            let mut images: Vec<String> = keys
                .into_iter()
                .filter(|key| ImageFormat::from_key(key).is_some())
                .collect();
            images.sort();
            images
        })
        .await
    }

    /// Annotation keys under `prefix`, in listing order
    pub async fn annotations(&self, bucket: &str, prefix: &str) -> Vec<String> {
        self.cached_or_fetch(Listing::Annotations, bucket, prefix, |keys| {
            keys.into_iter()
                .filter(|key| key.ends_with(ANNOTATION_SUFFIX))
                .collect()
        })
        .await
    }

    /// Force the next lookup of `listing` to go to storage, whatever its age
    pub async fn invalidate(&self, listing: Listing) {
        let mut entries = self.entries.lock().await;
        entries.retain(|(kind, _, _), _| *kind != listing);
        debug!("Invalidated cached {:?} listings", listing);
    }

    fn ttl(&self, listing: Listing) -> Duration {
        match listing {
            Listing::Images => self.images_ttl,
            Listing::Annotations => self.annotations_ttl,
        }
    }

    async fn cached_or_fetch<F>(
        &self,
        listing: Listing,
        bucket: &str,
        prefix: &str,
        refine: F,
    ) -> Vec<String>
    where
        F: FnOnce(Vec<String>) -> Vec<String>,
    {
        let entry_key = (listing, bucket.to_string(), prefix.to_string());
        let ttl = self.ttl(listing);

        {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(&entry_key) {
                if entry.fetched_at.elapsed() < ttl {
                    debug!("Cache hit for {:?} listing of {}/{}", listing, bucket, prefix);
                    return entry.keys.clone();
                }
            }
        }

        let keys = match self.storage.list_objects(bucket, prefix).await {
            Ok(keys) => refine(keys),
            Err(e) => {
                warn!(
                    "Failed to list {:?} in {}/{}, treating as empty: {}",
                    listing, bucket, prefix, e
                );
                return Vec::new();
            }
        };

        debug!(
            "Fetched {} {:?} keys from {}/{}",
            keys.len(),
            listing,
            bucket,
            prefix
        );

        let mut entries = self.entries.lock().await;
        entries.insert(
            entry_key,
            CachedListing {
                keys: keys.clone(),
                fetched_at: Instant::now(),
            },
        );
        keys
    }
}

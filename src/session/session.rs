use crate::annotation::{
    progress, remaining, AnnotationError, AnnotationRecord, AnnotationWriter, Label, Progress,
};
use crate::auth::{Authenticator, Identity};
use crate::config::Config;
use crate::s3::{folder_prefix, Storage};
use crate::session::cache::{Listing, ListingCache};
use crate::session::error::SessionError;
use crate::session::workflow::{Rotation, Workflow, WorkflowError, WorkflowState};
use bytes::Bytes;
use tracing::{debug, info};

/// Result of a successful save from the selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub image_key: String,
    pub annotation_key: String,
    pub state: WorkflowState,
}

/// Everything one annotator's session owns: identity, cached listings and
/// the current selection. Every operation goes through this context.
pub struct AnnotationSession<S: Storage + Clone, A: Authenticator> {
    storage: S,
    authenticator: A,
    cache: ListingCache<S>,
    writer: AnnotationWriter<S>,
    images_bucket: String,
    images_prefix: String,
    annotations_bucket: String,
    annotations_prefix: String,
    identity: Option<Identity>,
    workflow: Workflow,
    images: Vec<String>,
    annotations: Vec<String>,
}

impl<S: Storage + Clone, A: Authenticator> AnnotationSession<S, A> {
    pub fn new(storage: S, authenticator: A, config: &Config) -> Self {
        let storage_config = &config.storage;
        Self {
            cache: ListingCache::new(storage.clone(), &config.cache),
            writer: AnnotationWriter::new(storage.clone(), &storage_config.annotations_bucket),
            storage,
            authenticator,
            images_bucket: storage_config.images_bucket.clone(),
            images_prefix: folder_prefix(&storage_config.images_folder),
            annotations_bucket: storage_config.annotations_bucket.clone(),
            annotations_prefix: folder_prefix(&storage_config.annotations_folder),
            identity: None,
            workflow: Workflow::new(),
            images: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Check both configured buckets; a missing bucket is the only failure that halts startup
    pub async fn verify_buckets(&self) -> Result<(), SessionError> {
        for bucket in [&self.images_bucket, &self.annotations_bucket] {
            if !self.storage.has_bucket(bucket).await? {
                return Err(SessionError::BucketMissing(bucket.clone()));
            }
            debug!("Bucket {} is reachable", bucket);
        }
        Ok(())
    }

    /// Authenticate; a failed attempt leaves the session as it was
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&Identity, SessionError> {
        let identity = self
            .authenticator
            .sign_in_with_password(email, password)
            .await?;
        info!("Session authenticated for {}", identity.email);
        Ok(&*self.identity.insert(identity))
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn state(&self) -> &WorkflowState {
        self.workflow.state()
    }

    /// Remaining queue as of the last refresh or save
    pub fn queue(&self) -> &[String] {
        self.workflow.queue()
    }

    /// Completion counters as of the last refresh or save
    pub fn progress(&self) -> Progress {
        progress(&self.images, &self.annotations)
    }

    /// Whether the last image listing found anything at all
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// `<bucket>/<folder>` of the image listing, for messages
    pub fn images_location(&self) -> String {
        format!("{}/{}", self.images_bucket, self.images_prefix)
    }

    /// Re-enter the workflow with a freshly reconciled queue
    pub async fn refresh(&mut self) -> &WorkflowState {
        let remaining = self.reconcile().await;
        self.workflow.enter(remaining)
    }

    pub fn select(&mut self, image_key: &str) -> Result<&WorkflowState, SessionError> {
        Ok(self.workflow.select(image_key)?)
    }

    /// Select by zero-based position in the remaining queue
    pub fn select_index(&mut self, index: usize) -> Result<&WorkflowState, SessionError> {
        Ok(self.workflow.select_index(index)?)
    }

    pub fn rotate_left(&mut self) -> Result<Rotation, SessionError> {
        Ok(self.workflow.rotate_left()?)
    }

    pub fn rotate_right(&mut self) -> Result<Rotation, SessionError> {
        Ok(self.workflow.rotate_right()?)
    }

    /// Raw bytes of the selected image
    pub async fn current_image(&self) -> Result<Bytes, SessionError> {
        let image_key = self
            .workflow
            .selected_key()
            .ok_or(WorkflowError::NoSelection)?;
        self.image(image_key).await
    }

    pub async fn image(&self, image_key: &str) -> Result<Bytes, SessionError> {
        Ok(self.storage.get_object(&self.images_bucket, image_key).await?)
    }

    /// The sidecar record stored for `image_key`
    pub async fn annotation(&self, image_key: &str) -> Result<AnnotationRecord, SessionError> {
        Ok(self.writer.load(image_key).await?)
    }

    /// Label the selected image and advance to the next one.
    ///
    /// When the write fails the selection and queue are left untouched so the
    /// same image can be saved again.
    pub async fn save(&mut self, label: Label, comment: &str) -> Result<SaveOutcome, SessionError> {
        let annotator = self.annotator()?;
        let image_key = self
            .workflow
            .selected_key()
            .map(str::to_string)
            .ok_or(WorkflowError::NoSelection)?;

        let annotation_key = self.write(&image_key, label, comment, &annotator).await?;

        let remaining = self.reconcile().await;
        let state = self
            .workflow
            .advance_after_save(&image_key, remaining)
            .clone();
        debug!("After saving {} the workflow is {:?}", image_key, state);

        Ok(SaveOutcome {
            image_key,
            annotation_key,
            state,
        })
    }

    /// Label any image by key, queued or not, and re-enter the workflow.
    /// An existing record for the image is overwritten.
    pub async fn save_image(
        &mut self,
        image_key: &str,
        label: Label,
        comment: &str,
    ) -> Result<String, SessionError> {
        let annotator = self.annotator()?;
        let annotation_key = self.write(image_key, label, comment, &annotator).await?;
        self.refresh().await;
        Ok(annotation_key)
    }

    fn annotator(&self) -> Result<String, SessionError> {
        self.identity
            .as_ref()
            .map(|identity| identity.email.clone())
            .ok_or(SessionError::NotAuthenticated)
    }

    async fn write(
        &self,
        image_key: &str,
        label: Label,
        comment: &str,
        annotator: &str,
    ) -> Result<String, SessionError> {
        let annotation_key = self
            .writer
            .save(image_key, label, comment, annotator)
            .await
            .map_err(|e| match e {
                AnnotationError::Storage(e) => {
                    SessionError::WriteRejected(image_key.to_string(), e.to_string())
                }
                other => SessionError::Annotation(other),
            })?;

        self.cache.invalidate(Listing::Annotations).await;
        Ok(annotation_key)
    }

    async fn reconcile(&mut self) -> Vec<String> {
        self.images = self
            .cache
            .images(&self.images_bucket, &self.images_prefix)
            .await;
        self.annotations = self
            .cache
            .annotations(&self.annotations_bucket, &self.annotations_prefix)
            .await;

        let remaining = remaining(&self.images, &self.annotations);
        debug!(
            "{} images, {} annotations, {} remaining",
            self.images.len(),
            self.annotations.len(),
            remaining.len()
        );
        remaining
    }
}

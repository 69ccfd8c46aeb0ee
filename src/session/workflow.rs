use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("No image is selected")]
    NoSelection,

    #[error("Image {0} is not waiting for annotation")]
    NotInQueue(String),

    #[error("Position {0} is out of range, {1} images remain")]
    OutOfRange(usize, usize),
}

/// Counter-clockwise display angle of the selected image, always a multiple of 90 below 360
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation(u16);

impl Rotation {
    /// Angle applied whenever a new image is selected
    pub const DEFAULT: Rotation = Rotation(90);

    pub fn degrees(&self) -> u16 {
        self.0
    }

    pub fn left(self) -> Self {
        Rotation((self.0 + 90) % 360)
    }

    pub fn right(self) -> Self {
        Rotation((self.0 + 270) % 360)
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    NoSelection,
    Selected { image_key: String, rotation: Rotation },
    AllAnnotated,
}

impl WorkflowState {
    fn selected(image_key: &str) -> Self {
        WorkflowState::Selected {
            image_key: image_key.to_string(),
            rotation: Rotation::DEFAULT,
        }
    }
}

/// Selection state for one user working through the remaining queue.
///
/// Holds no I/O; the session feeds it freshly reconciled queues.
#[derive(Debug, Clone)]
pub struct Workflow {
    state: WorkflowState,
    queue: Vec<String>,
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            state: WorkflowState::NoSelection,
            queue: Vec::new(),
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Images still waiting for annotation, in presentation order
    pub fn queue(&self) -> &[String] {
        &self.queue
    }

    pub fn selected_key(&self) -> Option<&str> {
        match &self.state {
            WorkflowState::Selected { image_key, .. } => Some(image_key),
            _ => None,
        }
    }

    /// (Re-)enter the page with a freshly computed queue.
    ///
    /// A selection that is still queued survives; otherwise the first queued
    /// image is selected, or the workflow is complete when nothing is left.
    pub fn enter(&mut self, remaining: Vec<String>) -> &WorkflowState {
        self.queue = remaining;

        let keep = matches!(
            &self.state,
            WorkflowState::Selected { image_key, .. } if self.queue.contains(image_key)
        );
        if !keep {
            self.state = match self.queue.first() {
                Some(first) => WorkflowState::selected(first),
                None => WorkflowState::AllAnnotated,
            };
        }
        &self.state
    }

    /// Pick an image from the queue; picking a different image resets the rotation
    pub fn select(&mut self, image_key: &str) -> Result<&WorkflowState, WorkflowError> {
        if !self.queue.iter().any(|key| key == image_key) {
            return Err(WorkflowError::NotInQueue(image_key.to_string()));
        }
        if self.selected_key() != Some(image_key) {
            self.state = WorkflowState::selected(image_key);
        }
        Ok(&self.state)
    }

    /// Pick the image at a zero-based queue position
    pub fn select_index(&mut self, index: usize) -> Result<&WorkflowState, WorkflowError> {
        let key = self
            .queue
            .get(index)
            .cloned()
            .ok_or(WorkflowError::OutOfRange(index, self.queue.len()))?;
        self.select(&key)
    }

    pub fn rotate_left(&mut self) -> Result<Rotation, WorkflowError> {
        self.rotate(Rotation::left)
    }

    pub fn rotate_right(&mut self) -> Result<Rotation, WorkflowError> {
        self.rotate(Rotation::right)
    }

    fn rotate(&mut self, turn: fn(Rotation) -> Rotation) -> Result<Rotation, WorkflowError> {
        match &mut self.state {
            WorkflowState::Selected { rotation, .. } => {
                *rotation = turn(*rotation);
                Ok(*rotation)
            }
            _ => Err(WorkflowError::NoSelection),
        }
    }

    /// Move on after `saved_key` was annotated.
    ///
    /// Selects the first image that followed `saved_key` in the previous queue
    /// and is still queued, else the head of the new queue, else completes.
    pub fn advance_after_save(&mut self, saved_key: &str, remaining: Vec<String>) -> &WorkflowState {
        let still_queued: HashSet<&str> = remaining.iter().map(String::as_str).collect();
        let successor = self
            .queue
            .iter()
            .position(|key| key == saved_key)
            .and_then(|former| {
                self.queue[former + 1..]
                    .iter()
                    .find(|key| still_queued.contains(key.as_str()))
                    .cloned()
            });

        self.state = match successor.as_deref().or(remaining.first().map(String::as_str)) {
            Some(next) => WorkflowState::selected(next),
            None => WorkflowState::AllAnnotated,
        };
        self.queue = remaining;
        &self.state
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

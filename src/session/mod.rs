pub mod cache;
pub mod error;
#[allow(clippy::module_inception)]
pub mod session;
pub mod workflow;

pub use cache::{Listing, ListingCache};
pub use error::SessionError;
pub use session::AnnotationSession;
pub use workflow::{Rotation, Workflow, WorkflowError, WorkflowState};

use crate::annotation::models::{base_name, ANNOTATION_SUFFIX};
use std::collections::HashSet;
use std::fmt;

/// Base names claimed by annotation keys; keys without the `.json` suffix are ignored
fn annotated_base_names<A: AsRef<str>>(annotations: &[A]) -> HashSet<&str> {
    annotations
        .iter()
        .filter_map(|key| key.as_ref().strip_suffix(ANNOTATION_SUFFIX))
        .collect()
}

/// Images that still lack a sidecar record, in their listed order.
///
/// An image counts as annotated when its base name equals, byte for byte,
/// the base name of some annotation key.
pub fn remaining<I: AsRef<str>, A: AsRef<str>>(images: &[I], annotations: &[A]) -> Vec<String> {
    let annotated = annotated_base_names(annotations);

    images
        .iter()
        .map(AsRef::as_ref)
        .filter(|image| !annotated.contains(base_name(image)))
        .map(str::to_string)
        .collect()
}

/// Completion counters for one image listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub annotated: usize,
    pub remaining: usize,
}

impl Progress {
    /// Share of images annotated, in `0.0..=1.0`; zero when there are no images
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.annotated as f64 / self.total as f64
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "annotated {}/{} ({:.1}%), {} remaining",
            self.annotated,
            self.total,
            self.fraction() * 100.0,
            self.remaining
        )
    }
}

pub fn progress<I: AsRef<str>, A: AsRef<str>>(images: &[I], annotations: &[A]) -> Progress {
    let remaining = remaining(images, annotations).len();
    Progress {
        total: images.len(),
        annotated: images.len() - remaining,
        remaining,
    }
}

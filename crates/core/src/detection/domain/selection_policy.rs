use crate::shared::bounding_box::BoundingBox;

/// Which detected face the pipeline classifies.
///
/// Only one face is classified per request. `FirstDetected` takes the first
/// box in detector order, which is not sorted by size or position; it is a
/// single-face simplification, not a quality filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    #[default]
    FirstDetected,
}

impl SelectionPolicy {
    pub fn select(&self, boxes: &[BoundingBox]) -> Option<BoundingBox> {
        match self {
            SelectionPolicy::FirstDetected => boxes.first().copied(),
        }
    }
}

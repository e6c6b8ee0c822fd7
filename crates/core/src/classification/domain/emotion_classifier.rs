use thiserror::Error;

use crate::normalization::face_patch::FacePatch;

use super::emotion_distribution::EmotionDistribution;

#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("classifier produced {0} scores, expected 7")]
    WrongArity(usize),
    #[error("classifier produced a non-finite score")]
    NonFinite,
}

/// Domain interface for scoring a normalized face patch.
///
/// Shared between concurrent requests, so implementations take `&self` and
/// handle any interior locking themselves.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, patch: &FacePatch) -> Result<EmotionDistribution, ClassificationError>;
}

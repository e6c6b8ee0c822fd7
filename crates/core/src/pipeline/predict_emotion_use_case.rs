use thiserror::Error;

use crate::classification::domain::emotion::Emotion;
use crate::classification::domain::emotion_classifier::ClassificationError;
use crate::classification::domain::emotion_distribution::EmotionDistribution;
use crate::codec::image_decoder::{decode_image, DecodeError};
use crate::detection::domain::face_detector::DetectionError;
use crate::detection::domain::selection_policy::SelectionPolicy;
use crate::normalization::region_normalizer::{normalize, NormalizeError};
use crate::pipeline::model_context::ModelContext;

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Model not loaded")]
    ClassifierUnavailable,
    #[error("Face cascade not loaded")]
    DetectorUnavailable,
    #[error("Failed to decode image: {0}")]
    Decode(#[from] DecodeError),
    #[error("Failed to convert image to grayscale: {0}")]
    Grayscale(#[from] opencv::Error),
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

impl PredictError {
    /// True when the request itself was at fault rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::Decode(_))
    }
}

/// Terminal outcome of one prediction.
#[derive(Clone, Debug, PartialEq)]
pub enum Prediction {
    NoFace,
    Emotion {
        emotion: Emotion,
        confidence: f32,
        distribution: EmotionDistribution,
    },
}

/// Single-image emotion pipeline: decode → detect → normalize → classify.
pub struct PredictEmotionUseCase {
    models: ModelContext,
    policy: SelectionPolicy,
}

impl PredictEmotionUseCase {
    pub fn new(models: ModelContext) -> Self {
        Self {
            models,
            policy: SelectionPolicy::default(),
        }
    }

    pub fn models(&self) -> &ModelContext {
        &self.models
    }

    /// Fails fast when no classification could ever succeed, before the
    /// request body is looked at.
    pub fn ensure_ready(&self) -> Result<(), PredictError> {
        if self.models.classifier_loaded() {
            Ok(())
        } else {
            Err(PredictError::ClassifierUnavailable)
        }
    }

    /// Runs the whole pipeline on a base64 (optionally data-URL) image.
    ///
    /// CPU-bound; call from a blocking context.
    pub fn execute(&self, payload: &str) -> Result<Prediction, PredictError> {
        let classifier = self
            .models
            .classifier()
            .ok_or(PredictError::ClassifierUnavailable)?;

        let image = decode_image(payload)?;

        let detector = self
            .models
            .detector()
            .ok_or(PredictError::DetectorUnavailable)?;

        let gray = image.to_grayscale()?;
        let faces = detector.detect(&gray)?;
        let Some(face) = self.policy.select(&faces) else {
            log::info!("No face in {}x{} image", gray.width(), gray.height());
            return Ok(Prediction::NoFace);
        };

        let patch = match normalize(&gray, &face) {
            Ok(patch) => patch,
            Err(NormalizeError::DegenerateRegion(roi)) => {
                log::warn!("Face {face:?} collapses to empty region {roi:?}; reporting no face");
                return Ok(Prediction::NoFace);
            }
            Err(e) => return Err(e.into()),
        };

        let distribution = classifier.classify(&patch)?;
        let (emotion, confidence) = distribution.top();
        log::info!(
            "Predicted {emotion} ({confidence:.3}) from {} face(s) in {}x{} image",
            faces.len(),
            gray.width(),
            gray.height()
        );

        Ok(Prediction::Emotion {
            emotion,
            confidence,
            distribution,
        })
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::classification::domain::emotion_classifier::EmotionClassifier;
use crate::classification::infrastructure::onnx_emotion_classifier::{
    ClassifierLoadError, OnnxEmotionClassifier,
};
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::opencv_cascade_detector::{
    CascadeLoadError, OpenCvCascadeDetector,
};
use crate::shared::model_resolver::{self, ModelResolveError};

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error(transparent)]
    Resolve(#[from] ModelResolveError),
    #[error(transparent)]
    Cascade(#[from] CascadeLoadError),
    #[error(transparent)]
    Classifier(#[from] ClassifierLoadError),
}

/// Where the two startup models come from.
#[derive(Clone, Debug)]
pub struct ModelPaths {
    pub classifier: PathBuf,
    pub classifier_url: Option<String>,
    pub cascade: PathBuf,
    pub cascade_url: Option<String>,
}

/// The process-wide models, loaded once and shared read-only.
///
/// A model that failed to load is `None`; requests that need it fail
/// instead of retrying the load.
#[derive(Clone, Default)]
pub struct ModelContext {
    detector: Option<Arc<dyn FaceDetector>>,
    classifier: Option<Arc<dyn EmotionClassifier>>,
}

impl ModelContext {
    pub fn new(
        detector: Option<Arc<dyn FaceDetector>>,
        classifier: Option<Arc<dyn EmotionClassifier>>,
    ) -> Self {
        Self {
            detector,
            classifier,
        }
    }

    /// Resolve and load both models, logging each outcome once.
    ///
    /// Blocks on file I/O and possibly on a download.
    pub fn load(paths: &ModelPaths) -> Self {
        let classifier = match load_classifier(paths) {
            Ok(classifier) => Some(Arc::new(classifier) as Arc<dyn EmotionClassifier>),
            Err(e) => {
                log::error!("Emotion classifier unavailable: {e}");
                None
            }
        };
        let detector = match load_detector(paths) {
            Ok(detector) => Some(Arc::new(detector) as Arc<dyn FaceDetector>),
            Err(e) => {
                log::error!("Face cascade unavailable: {e}");
                None
            }
        };
        Self::new(detector, classifier)
    }

    pub fn detector(&self) -> Option<&Arc<dyn FaceDetector>> {
        self.detector.as_ref()
    }

    pub fn classifier(&self) -> Option<&Arc<dyn EmotionClassifier>> {
        self.classifier.as_ref()
    }

    pub fn detector_loaded(&self) -> bool {
        self.detector.is_some()
    }

    pub fn classifier_loaded(&self) -> bool {
        self.classifier.is_some()
    }
}

fn load_classifier(paths: &ModelPaths) -> Result<OnnxEmotionClassifier, ModelLoadError> {
    let path = model_resolver::resolve(&paths.classifier, paths.classifier_url.as_deref())?;
    Ok(OnnxEmotionClassifier::new(&path)?)
}

fn load_detector(paths: &ModelPaths) -> Result<OpenCvCascadeDetector, ModelLoadError> {
    let path = model_resolver::resolve(&paths.cascade, paths.cascade_url.as_deref())?;
    Ok(OpenCvCascadeDetector::load(&path)?)
}

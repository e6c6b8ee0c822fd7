/// Haar cascade face detector backed by OpenCV's `CascadeClassifier`.
///
/// `detect_multi_scale` takes `&mut self`, so the classifier sits behind a
/// mutex and concurrent requests take turns on it.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use opencv::core::{Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use thiserror::Error;

use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{DETECT_MIN_NEIGHBORS, DETECT_SCALE_FACTOR};
use crate::shared::raster_image::RasterImage;

#[derive(Error, Debug)]
pub enum CascadeLoadError {
    #[error("failed to load face cascade {path}: {source}")]
    OpenCv {
        path: PathBuf,
        #[source]
        source: opencv::Error,
    },
    #[error("face cascade {0} is empty or not a cascade file")]
    Empty(PathBuf),
}

pub struct OpenCvCascadeDetector {
    classifier: Mutex<CascadeClassifier>,
    scale_factor: f64,
    min_neighbors: i32,
}

impl OpenCvCascadeDetector {
    /// Detector with the service defaults (scale 1.3, 5 neighbours).
    pub fn load(path: &Path) -> Result<Self, CascadeLoadError> {
        Self::with_params(path, DETECT_SCALE_FACTOR, DETECT_MIN_NEIGHBORS)
    }

    pub fn with_params(
        path: &Path,
        scale_factor: f64,
        min_neighbors: i32,
    ) -> Result<Self, CascadeLoadError> {
        let opencv_err = |source| CascadeLoadError::OpenCv {
            path: path.to_path_buf(),
            source,
        };

        let classifier =
            CascadeClassifier::new(&path.to_string_lossy()).map_err(opencv_err)?;
        // A missing or unreadable file leaves the classifier empty rather
        // than failing the constructor.
        if classifier.empty().map_err(opencv_err)? {
            return Err(CascadeLoadError::Empty(path.to_path_buf()));
        }

        let window = classifier.get_original_window_size().map_err(opencv_err)?;
        log::info!(
            "Loaded face cascade {} ({}x{} window)",
            path.display(),
            window.width,
            window.height
        );

        Ok(Self {
            classifier: Mutex::new(classifier),
            scale_factor,
            min_neighbors,
        })
    }
}

impl FaceDetector for OpenCvCascadeDetector {
    fn detect(&self, gray: &RasterImage) -> Result<Vec<BoundingBox>, DetectionError> {
        if !gray.is_gray() {
            return Err(DetectionError::NotGrayscale(gray.channels()));
        }
        if gray.width() == 0 || gray.height() == 0 {
            return Ok(Vec::new());
        }

        let mat = gray.to_mat().map_err(detection_error)?;
        let mut faces = Vector::<Rect>::new();
        {
            let mut classifier = self
                .classifier
                .lock()
                .map_err(|e| DetectionError::Failed(format!("Lock poisoned: {e}")))?;
            classifier
                .detect_multi_scale(
                    &mat,
                    &mut faces,
                    self.scale_factor,
                    self.min_neighbors,
                    0,
                    Size::new(0, 0),
                    Size::new(0, 0),
                )
                .map_err(detection_error)?;
        }

        let boxes: Vec<BoundingBox> = faces
            .iter()
            .map(|r| BoundingBox::new(r.x, r.y, r.width, r.height))
            .collect();
        log::debug!(
            "Cascade scan of {}x{}: {} faces",
            gray.width(),
            gray.height(),
            boxes.len()
        );
        Ok(boxes)
    }
}

fn detection_error(e: opencv::Error) -> DetectionError {
    DetectionError::Failed(e.to_string())
}

use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::raster_image::RasterImage;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("face detection expects a single-channel image, got {0} channels")]
    NotGrayscale(u8),
    #[error("face detection failed: {0}")]
    Failed(String),
}

/// Domain interface for locating faces in a grayscale image.
///
/// Implementations are loaded once and shared read-only between requests,
/// hence `&self` and `Sync`. The order of the returned boxes is
/// implementation-defined.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, gray: &RasterImage) -> Result<Vec<BoundingBox>, DetectionError>;
}

//! Face crop to classifier patch.
use opencv::core::{Mat, Rect, Size};
use opencv::imgproc;
use opencv::prelude::*;
use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{FACE_INSET_RATIO, PATCH_SIZE};
use crate::shared::raster_image::RasterImage;

use super::face_patch::FacePatch;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("face region {0:?} is empty after insetting and clamping to the image")]
    DegenerateRegion(BoundingBox),
    #[error("region normalization expects a single-channel image, got {0} channels")]
    NotGrayscale(u8),
    #[error("failed to resize face region: {0}")]
    Resize(#[from] opencv::Error),
}

/// Rectangle actually cropped for `face`: trimmed by 10% of the box width
/// on every side, then clamped to the image.
pub fn face_roi(face: &BoundingBox, image_width: u32, image_height: u32) -> BoundingBox {
    let pad = (FACE_INSET_RATIO * face.width as f64) as i32;
    face.inset(pad).clamp_to(image_width, image_height)
}

/// Crop `face` out of `gray`, resize it to 48x48 (bilinear) and scale to
/// `[0, 1]`.
///
/// The resize runs on the 8-bit crop, so the patch holds exactly the
/// intensities an 8-bit resize produces.
pub fn normalize(gray: &RasterImage, face: &BoundingBox) -> Result<FacePatch, NormalizeError> {
    if !gray.is_gray() {
        return Err(NormalizeError::NotGrayscale(gray.channels()));
    }

    let roi = face_roi(face, gray.width(), gray.height());
    if roi.is_empty() {
        return Err(NormalizeError::DegenerateRegion(roi));
    }

    let mat = gray.to_mat()?;
    let crop = Mat::roi(&mat, Rect::new(roi.x, roi.y, roi.width, roi.height))?.try_clone()?;
    let side = PATCH_SIZE as i32;
    let mut resized = Mat::default();
    imgproc::resize(
        &crop,
        &mut resized,
        Size::new(side, side),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    let pixels = resized
        .data_bytes()?
        .iter()
        .map(|&v| v as f32 / 255.0)
        .collect();

    FacePatch::from_pixels(pixels).ok_or(NormalizeError::DegenerateRegion(roi))
}

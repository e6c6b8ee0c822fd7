//! Base64 / data-URL image payload decoding.

use std::io::Cursor;

use base64::Engine;
use image::error::LimitError;
use image::{ImageError, ImageReader, Limits};
use thiserror::Error;

use crate::shared::constants::MAX_IMAGE_DIMENSION;
use crate::shared::raster_image::RasterImage;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unrecognized image data: {0}")]
    Image(#[source] ImageError),
    #[error("image larger than {max}x{max} pixels: {0}", max = MAX_IMAGE_DIMENSION)]
    TooLarge(#[source] LimitError),
    #[error("empty image payload")]
    Empty,
}

/// Decode a base64 image payload into an RGB raster.
///
/// Anything up to and including the first comma is treated as a data-URL
/// header (`data:image/jpeg;base64,`) and dropped. Whitespace inside the
/// base64 text is ignored. Images wider or taller than
/// [`MAX_IMAGE_DIMENSION`] are refused before any pixels are allocated.
pub fn decode_image(payload: &str) -> Result<RasterImage, DecodeError> {
    let bytes = decode_base64(payload)?;
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| DecodeError::Image(ImageError::IoError(e)))?;
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    reader.limits(limits);

    let rgb = reader.decode().map_err(image_error)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(RasterImage::new(rgb.into_raw(), width, height, 3))
}

fn image_error(e: ImageError) -> DecodeError {
    match e {
        ImageError::Limits(limit) => DecodeError::TooLarge(limit),
        other => DecodeError::Image(other),
    }
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let body = strip_data_url_header(payload);
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}

fn strip_data_url_header(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    }
}

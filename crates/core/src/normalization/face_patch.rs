use ndarray::Array4;

use crate::shared::constants::PATCH_SIZE;

/// Classifier input: one 48x48 grayscale face in NHWC layout
/// (`1 x 48 x 48 x 1`), intensities scaled to `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FacePatch {
    tensor: Array4<f32>,
}

impl FacePatch {
    /// Build a patch from `PATCH_SIZE * PATCH_SIZE` row-major intensities.
    ///
    /// Returns `None` when the number of values is wrong.
    pub fn from_pixels(pixels: Vec<f32>) -> Option<Self> {
        Array4::from_shape_vec((1, PATCH_SIZE, PATCH_SIZE, 1), pixels)
            .ok()
            .map(|tensor| Self { tensor })
    }

    pub fn tensor(&self) -> &Array4<f32> {
        &self.tensor
    }

    pub fn pixel(&self, row: usize, col: usize) -> f32 {
        self.tensor[[0, row, col, 0]]
    }
}

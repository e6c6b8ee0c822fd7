use opencv::core::Mat;
use opencv::imgproc;
use opencv::prelude::*;

/// A decoded still image: contiguous 8-bit samples in row-major order,
/// interleaved when there is more than one channel.
///
/// Color images carry RGB order; grayscale images carry a single channel.
/// Pixel operations go through OpenCV via [`RasterImage::to_mat`].
#[derive(Clone, Debug, PartialEq)]
pub struct RasterImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl RasterImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn gray(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self::new(data, width, height, 1)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn is_gray(&self) -> bool {
        self.channels == 1
    }

    /// Copy the samples into an owned OpenCV matrix (`CV_8UC1` or `CV_8UC3`).
    pub fn to_mat(&self) -> opencv::Result<Mat> {
        let flat = Mat::from_slice(self.data.as_slice())?;
        let shaped = flat.reshape(self.channels as i32, self.height as i32)?;
        shaped.try_clone()
    }

    /// Copy a continuous 8-bit OpenCV matrix back into a raster.
    pub fn from_mat(mat: &Mat) -> opencv::Result<RasterImage> {
        let data = mat.data_bytes()?.to_vec();
        Ok(RasterImage::new(
            data,
            mat.cols() as u32,
            mat.rows() as u32,
            mat.channels() as u8,
        ))
    }

    /// Convert to a single-channel image with OpenCV's `RGB -> GRAY`
    /// (BT.601 luma), the conversion the Haar cascades were trained on.
    /// Single-channel images are returned as a copy.
    pub fn to_grayscale(&self) -> opencv::Result<RasterImage> {
        if self.is_gray() {
            return Ok(self.clone());
        }

        let mut gray = Mat::default();
        imgproc::cvt_color_def(&self.to_mat()?, &mut gray, imgproc::COLOR_RGB2GRAY)?;
        RasterImage::from_mat(&gray)
    }
}

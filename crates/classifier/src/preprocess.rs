//! Image decoding and conversion into the model's input layout.

use std::fs;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageReader, RgbImage};

use crate::error::{ClassifierError, Result};

/// Fixed input geometry of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl Default for InputSize {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
        }
    }
}

/// Read and decode an image file as RGB.
///
/// Empty files are rejected before the decoder sees them.
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let metadata = fs::metadata(path).map_err(|e| ClassifierError::invalid_image(path, e))?;
    if metadata.len() == 0 {
        return Err(ClassifierError::invalid_image(path, "file is empty"));
    }

    let image = ImageReader::open(path)
        .map_err(|e| ClassifierError::invalid_image(path, e))?
        .with_guessed_format()
        .map_err(|e| ClassifierError::invalid_image(path, e))?
        .decode()
        .map_err(|e| ClassifierError::invalid_image(path, e))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(ClassifierError::invalid_image(path, "image has no pixels"));
    }

    Ok(image.to_rgb8())
}

/// Resize to `size` and lay out pixels as NHWC `f32` in `[0, 1]`.
///
/// Nearest-neighbour sampling matches the resize used when the model was
/// trained.
pub fn to_nhwc(image: &RgbImage, size: InputSize) -> Vec<f32> {
    let resized = imageops::resize(image, size.width, size.height, FilterType::Nearest);

    resized
        .into_raw()
        .into_iter()
        .map(|channel| channel as f32 / 255.0)
        .collect()
}

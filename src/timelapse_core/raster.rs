use crate::timelapse_core::error::{Result, TimelapseError};
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::path::Path;

/// Decode the image at `path` into an 8-bit RGB raster.
pub fn decode_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| TimelapseError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Dimensions after scaling `width` x `height` by `percent`. Fractions are
/// truncated and each side is at least one pixel.
pub fn scaled_dimensions(width: u32, height: u32, percent: u32) -> (u32, u32) {
    let scale = |side: u32| ((u64::from(side) * u64::from(percent)) / 100).max(1) as u32;
    (scale(width), scale(height))
}

/// Resize by `percent`. 100 returns the raster untouched.
pub fn resize(img: RgbImage, percent: u32) -> RgbImage {
    if percent == 100 {
        return img;
    }
    let (width, height) = scaled_dimensions(img.width(), img.height(), percent);
    imageops::resize(&img, width, height, FilterType::Triangle)
}

/// Scale to exactly `width` x `height` if the raster is a different size.
pub fn fit_to(img: RgbImage, width: u32, height: u32) -> RgbImage {
    if img.dimensions() == (width, height) {
        return img;
    }
    imageops::resize(&img, width, height, FilterType::Triangle)
}

/// A black frame used in place of a missing day.
pub fn blank_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::new(width, height)
}

use crate::error::EnhanceError;
use image::{imageops::FilterType, RgbImage};

/// Upscale both axes by an integer factor with a Lanczos3 kernel.
///
/// Fails with `DimensionOverflow` before allocating anything if the output
/// would hold more than `max_pixels` pixels.
pub fn apply(image: RgbImage, factor: u32, max_pixels: u64) -> Result<RgbImage, EnhanceError> {
    if factor == 0 {
        return Err(EnhanceError::InvalidScaleFactor(0));
    }

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EnhanceError::EmptyImage { width, height });
    }

    let overflow = || EnhanceError::DimensionOverflow {
        width,
        height,
        factor,
    };
    let new_width = width.checked_mul(factor).ok_or_else(overflow)?;
    let new_height = height.checked_mul(factor).ok_or_else(overflow)?;
    if u64::from(new_width) * u64::from(new_height) > max_pixels {
        return Err(overflow());
    }

    Ok(image::imageops::resize(
        &image,
        new_width,
        new_height,
        FilterType::Lanczos3,
    ))
}

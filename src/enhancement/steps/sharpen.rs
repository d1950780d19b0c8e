use crate::error::EnhanceError;
use image::{Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;

/// Unsharp mask: `image * (1 + strength) - blur(image, sigma) * strength`
///
/// Larger `sigma` amplifies coarser detail; `strength` scales the boost.
/// Results are rounded and clamped to the 8-bit range per channel.
pub fn apply(image: RgbImage, sigma: f32, strength: f32) -> Result<RgbImage, EnhanceError> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(EnhanceError::InvalidParameter(format!(
            "blur sigma must be positive, got {}",
            sigma
        )));
    }
    if !strength.is_finite() || strength < 0.0 {
        return Err(EnhanceError::InvalidParameter(format!(
            "sharpening strength must be non-negative, got {}",
            strength
        )));
    }

    if strength == 0.0 {
        return Ok(image);
    }

    let blurred = gaussian_blur_f32(&image, sigma);

    let sharpened = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let s = image.get_pixel(x, y).0;
        let b = blurred.get_pixel(x, y).0;
        Rgb(std::array::from_fn(|c| {
            let v = s[c] as f32 * (1.0 + strength) - b[c] as f32 * strength;
            v.round().clamp(0.0, 255.0) as u8
        }))
    });

    Ok(sharpened)
}

use crate::enhancement::{clahe, lab::Lab};
use crate::error::EnhanceError;
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Apply CLAHE to the L* channel of the image in CIE L*a*b*
///
/// a* and b* are carried through untouched, so only lightness changes and
/// hues are not shifted the way a per-channel equalization would shift them.
pub fn apply(image: RgbImage, clip_limit: f32, grid: (u32, u32)) -> Result<RgbImage, EnhanceError> {
    if !clip_limit.is_finite() || clip_limit <= 0.0 {
        return Err(EnhanceError::InvalidParameter(format!(
            "CLAHE clip limit must be positive, got {}",
            clip_limit
        )));
    }
    if grid.0 == 0 || grid.1 == 0 {
        return Err(EnhanceError::InvalidParameter(format!(
            "CLAHE tile grid must be non-empty, got {}x{}",
            grid.0, grid.1
        )));
    }

    let (width, height) = image.dimensions();
    let lab: Vec<Lab> = image.pixels().map(|p| Lab::from_rgb(p.0)).collect();

    let lightness = to_lightness(&lab, width, height);
    let equalized = clahe::equalize(&lightness, grid, clip_limit);

    Ok(from_lab(&lab, &equalized))
}

fn to_lightness(lab: &[Lab], width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        Luma([lab[(y * width + x) as usize].l_u8()])
    })
}

fn from_lab(lab: &[Lab], lightness: &GrayImage) -> RgbImage {
    let width = lightness.width();
    RgbImage::from_fn(width, lightness.height(), |x, y| {
        let l = lightness.get_pixel(x, y).0[0];
        Rgb(lab[(y * width + x) as usize].with_l_u8(l).to_rgb())
    })
}

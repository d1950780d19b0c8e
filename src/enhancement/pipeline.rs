use crate::error::EnhanceError;
use image::{DynamicImage, RgbImage};
use std::time::Instant;

use super::steps;

/// Gaussian blur sigma for the unsharp mask
pub const SHARPEN_SIGMA: f32 = 1.0;
/// Unsharp mask strength
pub const SHARPEN_STRENGTH: f32 = 1.5;
/// CLAHE clip limit, as a multiple of the average bin count
pub const CLAHE_CLIP_LIMIT: f32 = 3.0;
/// CLAHE tile grid (columns, rows)
pub const CLAHE_TILE_GRID: (u32, u32) = (8, 8);

/// Largest output the pipeline will produce, in pixels
pub const DEFAULT_MAX_OUTPUT_PIXELS: u64 = 50_000_000;

/// Stage names, in execution order
pub const STAGES: [&str; 3] = ["upscale", "contrast", "sharpen"];

/// Upscaling factor restricted to the supported set {2, 3, 4}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleFactor(u32);

impl ScaleFactor {
    pub const SUPPORTED: [u32; 3] = [2, 3, 4];

    pub fn new(value: i64) -> Result<Self, EnhanceError> {
        match u32::try_from(value) {
            Ok(v) if Self::SUPPORTED.contains(&v) => Ok(Self(v)),
            _ => Err(EnhanceError::InvalidScaleFactor(value)),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self(2)
    }
}

/// Fixed numeric parameters of the contrast and sharpening stages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceParams {
    pub sigma: f32,
    pub strength: f32,
    pub clip_limit: f32,
    pub tile_grid: (u32, u32),
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            sigma: SHARPEN_SIGMA,
            strength: SHARPEN_STRENGTH,
            clip_limit: CLAHE_CLIP_LIMIT,
            tile_grid: CLAHE_TILE_GRID,
        }
    }
}

/// Timing information for a single pipeline stage
#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: &'static str,
    pub time_ms: u64,
}

/// Enhanced image plus timing stats
#[derive(Debug, Clone)]
pub struct EnhancementResult {
    pub image: RgbImage,
    /// Input dimensions (width, height)
    pub original_size: (u32, u32),
    pub scale_factor: ScaleFactor,
    /// Total pipeline time in milliseconds
    pub total_time_ms: u64,
    /// Individual stage timings, in execution order
    pub steps: Vec<StepTiming>,
}

/// Run the full pipeline with the default parameters
#[cfg(test)]
pub fn enhance(image: DynamicImage, scale_factor: i64) -> Result<EnhancementResult, EnhanceError> {
    Pipeline::default().process(image, scale_factor)
}

/// Upscale, equalize and sharpen, in that order
#[derive(Debug, Clone)]
pub struct Pipeline {
    params: EnhanceParams,
    max_output_pixels: u64,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(EnhanceParams::default(), DEFAULT_MAX_OUTPUT_PIXELS)
    }
}

impl Pipeline {
    pub fn new(params: EnhanceParams, max_output_pixels: u64) -> Self {
        Self {
            params,
            max_output_pixels,
        }
    }

    pub fn params(&self) -> &EnhanceParams {
        &self.params
    }

    /// Enhance an 8-bit RGB image. Fails before touching the pixels if the
    /// scale factor or the input layout is invalid.
    pub fn process(
        &self,
        image: DynamicImage,
        scale_factor: i64,
    ) -> Result<EnhancementResult, EnhanceError> {
        let factor = ScaleFactor::new(scale_factor)?;

        let rgb = match image {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => return Err(EnhanceError::MalformedChannelLayout(other.color())),
        };

        let original_size = rgb.dimensions();
        if original_size.0 == 0 || original_size.1 == 0 {
            return Err(EnhanceError::EmptyImage {
                width: original_size.0,
                height: original_size.1,
            });
        }

        let start = Instant::now();
        let mut steps_timing = Vec::with_capacity(STAGES.len());
        let params = self.params;
        let max_pixels = self.max_output_pixels;

        let mut img = rgb;
        img = self.run_step(STAGES[0], img, &mut steps_timing, |img| {
            steps::upscale::apply(img, factor.get(), max_pixels)
        })?;
        img = self.run_step(STAGES[1], img, &mut steps_timing, |img| {
            steps::contrast::apply(img, params.clip_limit, params.tile_grid)
        })?;
        img = self.run_step(STAGES[2], img, &mut steps_timing, |img| {
            steps::sharpen::apply(img, params.sigma, params.strength)
        })?;

        Ok(EnhancementResult {
            image: img,
            original_size,
            scale_factor: factor,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: steps_timing,
        })
    }

    fn run_step<F>(
        &self,
        name: &'static str,
        img: RgbImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<RgbImage, EnhanceError>
    where
        F: FnOnce(RgbImage) -> Result<RgbImage, EnhanceError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        let time_ms = step_start.elapsed().as_millis() as u64;

        tracing::debug!(
            step = name,
            time_ms,
            width = result.width(),
            height = result.height(),
            "Enhancement step finished"
        );

        timings.push(StepTiming { name, time_ms });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbaImage};

    fn luminance(p: &Rgb<u8>) -> i32 {
        p.0.iter().map(|&c| c as i32).sum::<i32>() / 3
    }

    #[test]
    fn test_scale_factor_accepts_supported_values() {
        for v in [2, 3, 4] {
            assert_eq!(ScaleFactor::new(v).unwrap().get(), v as u32);
        }
        assert_eq!(ScaleFactor::default().get(), 2);
    }

    #[test]
    fn test_scale_factor_rejects_everything_else() {
        for v in [-2, 0, 1, 5, 8, i64::from(u32::MAX) + 2] {
            assert!(matches!(
                ScaleFactor::new(v),
                Err(EnhanceError::InvalidScaleFactor(x)) if x == v
            ));
        }
    }

    #[test]
    fn test_enhance_output_dimensions() {
        for factor in [2u32, 3, 4] {
            let img = RgbImage::from_fn(13, 7, |x, y| Rgb([(x * 19) as u8, (y * 31) as u8, 100]));
            let result = enhance(DynamicImage::ImageRgb8(img), factor as i64).unwrap();

            assert_eq!(result.image.dimensions(), (13 * factor, 7 * factor));
            assert_eq!(result.original_size, (13, 7));
            assert_eq!(result.scale_factor.get(), factor);
        }
    }

    #[test]
    fn test_enhance_records_stage_timings_in_order() {
        let img = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
        let result = enhance(DynamicImage::ImageRgb8(img), 2).unwrap();

        let names: Vec<&str> = result.steps.iter().map(|s| s.name).collect();
        assert_eq!(names, STAGES);
    }

    #[test]
    fn test_enhance_flat_gray_stays_uniform_gray() {
        let img = RgbImage::from_pixel(100, 100, Rgb([128, 128, 128]));
        let result = enhance(DynamicImage::ImageRgb8(img), 2).unwrap();

        assert_eq!(result.image.dimensions(), (200, 200));
        let first = *result.image.get_pixel(0, 0);
        assert!(result.image.pixels().all(|p| *p == first));

        let [r, g, b] = first.0;
        assert!((r as i32 - g as i32).abs() <= 1, "not gray: {:?}", first);
        assert!((g as i32 - b as i32).abs() <= 1, "not gray: {:?}", first);
    }

    #[test]
    fn test_enhance_single_white_pixel() {
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(5, 5, Rgb([255, 255, 255]));

        let plain = steps::upscale::apply(img.clone(), 2, u64::MAX).unwrap();
        let enhanced = enhance(DynamicImage::ImageRgb8(img), 2).unwrap().image;

        assert_eq!(enhanced.dimensions(), (20, 20));

        let plain_peak = plain.pixels().map(luminance).max().unwrap();
        let enhanced_peak = enhanced.pixels().map(luminance).max().unwrap();
        assert!(
            enhanced_peak > plain_peak,
            "peak {} should exceed plain resize peak {}",
            enhanced_peak,
            plain_peak
        );

        // Dark halo around the peak, below the untouched background
        let background = luminance(enhanced.get_pixel(0, 0));
        let halo = (7..15)
            .flat_map(|y| (7..15).map(move |x| (x, y)))
            .map(|(x, y)| luminance(enhanced.get_pixel(x, y)))
            .min()
            .unwrap();
        assert!(
            halo < background,
            "halo {} should undershoot background {}",
            halo,
            background
        );
    }

    #[test]
    fn test_pipeline_with_custom_params() {
        let params = EnhanceParams {
            strength: 0.0,
            ..EnhanceParams::default()
        };
        let img = RgbImage::from_fn(9, 9, |x, y| Rgb([(x * 25) as u8, (y * 25) as u8, 40]));

        let unsharpened = Pipeline::new(params, DEFAULT_MAX_OUTPUT_PIXELS)
            .process(DynamicImage::ImageRgb8(img.clone()), 2)
            .unwrap();
        let default = enhance(DynamicImage::ImageRgb8(img), 2).unwrap();

        assert_eq!(unsharpened.image.dimensions(), default.image.dimensions());
        assert_ne!(unsharpened.image, default.image);
    }

    #[test]
    fn test_enhance_rejects_invalid_scale_factor() {
        let img = RgbImage::new(4, 4);
        for factor in [0, 1, 5, -3] {
            assert!(matches!(
                enhance(DynamicImage::ImageRgb8(img.clone()), factor),
                Err(EnhanceError::InvalidScaleFactor(f)) if f == factor
            ));
        }
    }

    #[test]
    fn test_enhance_rejects_wrong_channel_layout() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        assert!(matches!(
            enhance(gray, 2),
            Err(EnhanceError::MalformedChannelLayout(image::ColorType::L8))
        ));

        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        assert!(matches!(
            enhance(rgba, 2),
            Err(EnhanceError::MalformedChannelLayout(image::ColorType::Rgba8))
        ));
    }

    #[test]
    fn test_pipeline_rejects_output_above_pixel_limit() {
        let pipeline = Pipeline::new(EnhanceParams::default(), 30 * 30 - 1);
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 10));

        assert!(matches!(
            pipeline.process(img.clone(), 3),
            Err(EnhanceError::DimensionOverflow { factor: 3, .. })
        ));

        let result = pipeline.process(img, 2).unwrap();
        assert_eq!(result.image.dimensions(), (20, 20));
    }

    #[test]
    fn test_enhance_rejects_empty_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(matches!(
            enhance(img, 2),
            Err(EnhanceError::EmptyImage { .. })
        ));
    }

    #[test]
    fn test_scale_factor_checked_before_layout() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        assert!(matches!(
            enhance(gray, 5),
            Err(EnhanceError::InvalidScaleFactor(5))
        ));
    }
}

//! CIE L*a*b* conversion for 8-bit sRGB pixels
//!
//! Conversion goes through linear sRGB to `palette`'s D65 Lab. Lightness is
//! exposed both as the usual 0..=100 value and as an 8-bit sample scaled by
//! 255/100 so it can be histogram-equalized directly.

use palette::white_point::D65;
use palette::{FromColor, IntoColor, LinSrgb, Srgb};

type LabD65 = palette::Lab<D65, f32>;

/// A color in CIE L*a*b*.
///
/// `l` is lightness in 0.0..=100.0, `a` the green-red axis and `b` the
/// blue-yellow axis. Neutral grays have `a == b == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

impl Lab {
    /// Convert an 8-bit sRGB pixel `[r, g, b]`.
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        let srgb: Srgb<f32> = Srgb::new(rgb[0], rgb[1], rgb[2]).into_format();
        let linear: LinSrgb<f32> = srgb.into_linear();
        let lab = LabD65::from_color(linear);

        Self {
            l: lab.l,
            a: lab.a,
            b: lab.b,
        }
    }

    /// Convert back to an 8-bit sRGB pixel, clamping out-of-gamut values.
    pub fn to_rgb(self) -> [u8; 3] {
        let linear: LinSrgb<f32> = LabD65::new(self.l, self.a, self.b).into_color();
        let srgb: Srgb<f32> = Srgb::from_linear(linear);
        [to_u8(srgb.red), to_u8(srgb.green), to_u8(srgb.blue)]
    }

    /// Lightness as an 8-bit sample (`L * 255 / 100`).
    pub fn l_u8(&self) -> u8 {
        (self.l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8
    }

    /// Replace lightness with an 8-bit sample, keeping chroma.
    pub fn with_l_u8(self, l: u8) -> Self {
        Self {
            l: l as f32 * 100.0 / 255.0,
            ..self
        }
    }
}

fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

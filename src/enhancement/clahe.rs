//! Contrast Limited Adaptive Histogram Equalization
//!
//! The image is split into a `grid_x × grid_y` grid of equally sized tiles.
//! When the dimensions are not divisible by the grid, tiles reaching past the
//! border sample a mirror reflection of the image so every tile histogram has
//! the same pixel count. Each tile histogram is clipped, the excess is spread
//! back over all bins, and the resulting CDF becomes the tile's lookup table.
//! Pixels are remapped by bilinear interpolation between the lookup tables of
//! the four nearest tile centers.
//!
//! Reference: Zuiderveld (1994), "Contrast Limited Adaptive Histogram
//! Equalization", Graphics Gems IV.

use image::{GrayImage, Luma};

const BINS: usize = 256;

/// Equalize a single-channel 8-bit image.
///
/// `clip_limit` is a multiplier on the average bin count of a tile; values
/// around 2.0 to 4.0 are typical. Returns an unchanged copy for an empty image.
pub fn equalize(image: &GrayImage, grid: (u32, u32), clip_limit: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (grid_x, grid_y) = grid;

    if width == 0 || height == 0 || grid_x == 0 || grid_y == 0 {
        return image.clone();
    }

    let tile_w = width.div_ceil(grid_x);
    let tile_h = height.div_ceil(grid_y);
    let tile_area = (tile_w * tile_h) as usize;

    let clip = if clip_limit > 0.0 {
        Some(((clip_limit * tile_area as f32 / BINS as f32) as u32).max(1))
    } else {
        None
    };

    let mut luts = Vec::with_capacity((grid_x * grid_y) as usize);
    for ty in 0..grid_y {
        for tx in 0..grid_x {
            let mut hist = [0u32; BINS];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let sy = reflect(y, height);
                for x in tx * tile_w..(tx + 1) * tile_w {
                    let sx = reflect(x, width);
                    hist[image.get_pixel(sx, sy).0[0] as usize] += 1;
                }
            }

            if let Some(limit) = clip {
                clip_histogram(&mut hist, limit);
            }

            luts.push(build_lut(&hist, tile_area));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * grid_x + tx) as usize];

    GrayImage::from_fn(width, height, |x, y| {
        let (tx0, tx1, ax) = neighbours(x, tile_w, grid_x);
        let (ty0, ty1, ay) = neighbours(y, tile_h, grid_y);

        let v = image.get_pixel(x, y).0[0] as usize;

        let v00 = lut_at(tx0, ty0)[v] as f32;
        let v10 = lut_at(tx1, ty0)[v] as f32;
        let v01 = lut_at(tx0, ty1)[v] as f32;
        let v11 = lut_at(tx1, ty1)[v] as f32;

        let top = v00 + (v10 - v00) * ax;
        let bottom = v01 + (v11 - v01) * ax;
        let value = top + (bottom - top) * ay;

        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// The two tiles whose centers bracket `pos` along one axis, and the weight of
/// the second. Positions before the first center or after the last clamp to
/// that edge tile.
fn neighbours(pos: u32, tile: u32, count: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }

    let t0 = f.floor() as u32;
    if t0 + 1 >= count {
        return (count - 1, count - 1, 0.0);
    }

    (t0, t0 + 1, f - t0 as f32)
}

/// Mirror an out-of-range coordinate back into `0..len` (edge pixel not repeated).
fn reflect(pos: u32, len: u32) -> u32 {
    if len == 1 {
        return 0;
    }

    let period = 2 * (len - 1);
    let p = pos % period;
    if p < len {
        p
    } else {
        period - p
    }
}

/// Clip bins at `limit` and redistribute the excess.
///
/// The excess is split evenly over all bins; whatever does not divide evenly
/// is handed out one count at a time at a regular bin stride.
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let per_bin = excess / BINS as u32;
    let residual = (excess % BINS as u32) as usize;

    for bin in hist.iter_mut() {
        *bin += per_bin;
    }

    if residual > 0 {
        let step = (BINS / residual).max(1);
        for bin in hist.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }
}

/// Build a 256-entry lookup table from the tile's cumulative histogram.
fn build_lut(hist: &[u32; BINS], area: usize) -> [u8; BINS] {
    let scale = 255.0 / area as f32;
    let mut lut = [0u8; BINS];
    let mut cdf = 0u32;

    for (i, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

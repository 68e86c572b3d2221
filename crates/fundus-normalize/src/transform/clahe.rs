// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalization on a single 8-bit channel.
//
// The image is split into a `cols x rows` grid of tiles. Each tile gets its
// own equalization lookup table built from a clipped histogram, and every
// output pixel blends the tables of the four nearest tile centres
// bilinearly, which hides the tile seams.

use image::{GrayImage, Luma};
use tracing::trace;

const BINS: usize = 256;

/// CLAHE operator with a fixed clip limit and tile grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    clip_limit: f32,
    cols: u32,
    rows: u32,
}

impl Clahe {
    /// `clip_limit` is relative to a flat histogram: 1.0 allows each bin the
    /// tile's average bin height, 2.0 twice that.
    pub fn new(clip_limit: f32, cols: u32, rows: u32) -> Self {
        Self {
            clip_limit,
            cols: cols.max(1),
            rows: rows.max(1),
        }
    }

    pub fn apply(&self, src: &GrayImage) -> GrayImage {
        let (width, height) = src.dimensions();
        if width == 0 || height == 0 {
            return src.clone();
        }

        // Tiles cover a padded canvas that is an exact multiple of the grid;
        // pixels beyond the image edge are mirrored back in.
        let tile_w = width.div_ceil(self.cols);
        let tile_h = height.div_ceil(self.rows);
        let tile_area = tile_w as u64 * tile_h as u64;
        let clip = self.absolute_clip(tile_area);
        trace!(tile_w, tile_h, clip, "CLAHE tiling");

        let mut luts = Vec::with_capacity((self.cols * self.rows) as usize);
        for ty in 0..self.rows {
            for tx in 0..self.cols {
                let mut hist = [0u32; BINS];
                for py in ty * tile_h..(ty + 1) * tile_h {
                    let sy = reflect_101(py, height);
                    for px in tx * tile_w..(tx + 1) * tile_w {
                        let sx = reflect_101(px, width);
                        hist[src.get_pixel(sx, sy).0[0] as usize] += 1;
                    }
                }
                clip_histogram(&mut hist, clip);
                luts.push(equalization_lut(&hist, tile_area));
            }
        }

        let lut = |tx: u32, ty: u32| &luts[(ty * self.cols + tx) as usize];
        let x_weights: Vec<(u32, u32, f32)> = (0..width)
            .map(|x| neighbour_tiles(x, tile_w, self.cols))
            .collect();

        let mut out = GrayImage::new(width, height);
        for y in 0..height {
            let (ty1, ty2, ya) = neighbour_tiles(y, tile_h, self.rows);
            for x in 0..width {
                let (tx1, tx2, xa) = x_weights[x as usize];
                let v = src.get_pixel(x, y).0[0] as usize;
                let top = lut(tx1, ty1)[v] as f32 * (1.0 - xa) + lut(tx2, ty1)[v] as f32 * xa;
                let bottom = lut(tx1, ty2)[v] as f32 * (1.0 - xa) + lut(tx2, ty2)[v] as f32 * xa;
                let blended = top * (1.0 - ya) + bottom * ya;
                out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
            }
        }
        out
    }

    /// Per-bin count limit for a tile of `tile_area` pixels.
    fn absolute_clip(&self, tile_area: u64) -> u32 {
        let clip = (self.clip_limit as f64 * tile_area as f64 / BINS as f64) as u64;
        clip.clamp(1, u32::MAX as u64) as u32
    }
}

/// Cap every bin at `clip` and hand the excess back out evenly.
///
/// Whatever does not divide evenly over 256 bins is spread one count at a
/// time across bins at a fixed stride.
fn clip_histogram(hist: &mut [u32; BINS], clip: u32) {
    let mut excess: u32 = 0;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    let batch = excess / BINS as u32;
    let mut residual = excess - batch * BINS as u32;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS as u32 / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *bin += 1;
            residual -= 1;
        }
    }
}

/// Cumulative-distribution lookup table mapping input level to output level.
fn equalization_lut(hist: &[u32; BINS], tile_area: u64) -> [u8; BINS] {
    let scale = 255.0 / tile_area as f32;
    let mut lut = [0u8; BINS];
    let mut sum: u64 = 0;
    for (level, &count) in hist.iter().enumerate() {
        sum += count as u64;
        lut[level] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// The two tiles whose centres bracket `pos` along one axis, and the weight
/// of the second one.
fn neighbour_tiles(pos: u32, tile_len: u32, tiles: u32) -> (u32, u32, f32) {
    let t = pos as f32 / tile_len as f32 - 0.5;
    let first = t.floor();
    let weight = t - first;
    let first = first as i64;
    let lo = first.max(0) as u32;
    let hi = ((first + 1).max(0) as u32).min(tiles - 1);
    (lo.min(tiles - 1), hi, weight)
}

/// Mirror an index into `0..len` without repeating the edge sample
/// (`... 2 1 | 0 1 2 ... n-1 | n-2 n-3 ...`).
pub(crate) fn reflect_101(index: u32, len: u32) -> u32 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let m = index % period;
    if m < len { m } else { period - m }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 3x3 Gaussian smoothing.
//
// With the standard deviation derived from a 3-tap kernel size the Gaussian
// collapses to the binomial kernel [1 2 1] / 4 on each axis, so the 2-D
// weights are integers summing to 16 and the filter runs in exact integer
// arithmetic.

use image::{Rgb, RgbImage};

use super::clahe::reflect_101;

const TAPS: [u32; 3] = [1, 2, 1];
const NORM_SHIFT: u32 = 4;

/// Blur every channel with the 3x3 binomial kernel, mirroring at borders.
pub fn gaussian_blur_3x3(src: &RgbImage) -> RgbImage {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return src.clone();
    }

    let mirror = |pos: u32, delta: i64, len: u32| -> u32 {
        let p = pos as i64 + delta;
        if p < 0 {
            reflect_101((-p) as u32, len)
        } else {
            reflect_101(p as u32, len)
        }
    };

    RgbImage::from_fn(width, height, |x, y| {
        let mut acc = [0u32; 3];
        for (ky, wy) in TAPS.iter().enumerate() {
            let sy = mirror(y, ky as i64 - 1, height);
            for (kx, wx) in TAPS.iter().enumerate() {
                let sx = mirror(x, kx as i64 - 1, width);
                let weight = wy * wx;
                let Rgb(px) = *src.get_pixel(sx, sy);
                for (sum, channel) in acc.iter_mut().zip(px) {
                    *sum += weight * channel as u32;
                }
            }
        }
        let half = 1 << (NORM_SHIFT - 1);
        Rgb(acc.map(|sum| ((sum + half) >> NORM_SHIFT) as u8))
    })
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 8-bit CIE L*a*b* <-> sRGB conversion (D65 white point).
//
// The 8-bit encoding stores L* scaled from 0..100 to 0..255 and a*/b* offset
// by 128, so a Lab image fits in an `RgbImage` with channels (L, a, b).

use image::{Rgb, RgbImage};

const WHITE_X: f32 = 0.950_456;
const WHITE_Z: f32 = 1.088_754;

const EPSILON: f32 = 0.008_856;
const KAPPA: f32 = 903.3;

/// Convert an RGB image to packed 8-bit Lab.
pub fn rgb_to_lab(image: &RgbImage) -> RgbImage {
    map_pixels(image, rgb_pixel_to_lab)
}

/// Convert packed 8-bit Lab back to RGB.
pub fn lab_to_rgb(lab: &RgbImage) -> RgbImage {
    map_pixels(lab, lab_pixel_to_rgb)
}

fn map_pixels(image: &RgbImage, f: impl Fn(Rgb<u8>) -> Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| f(*image.get_pixel(x, y)))
}

pub fn rgb_pixel_to_lab(pixel: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = pixel.0.map(|c| srgb_to_linear(c as f32 / 255.0));

    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / WHITE_X;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / WHITE_Z;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = if y > EPSILON {
        116.0 * y.cbrt() - 16.0
    } else {
        KAPPA * y
    };
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);

    Rgb([
        to_u8(l * 255.0 / 100.0),
        to_u8(a + 128.0),
        to_u8(b + 128.0),
    ])
}

pub fn lab_pixel_to_rgb(pixel: Rgb<u8>) -> Rgb<u8> {
    let [l8, a8, b8] = pixel.0;
    let l = l8 as f32 * 100.0 / 255.0;
    let a = a8 as f32 - 128.0;
    let b = b8 as f32 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let y = if l > KAPPA * EPSILON {
        fy * fy * fy
    } else {
        l / KAPPA
    };
    let x = lab_f_inv(fx) * WHITE_X;
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
    let b = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

    Rgb([r, g, b].map(|c| to_u8(linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0)))
}

fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.040_45 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(f: f32) -> f32 {
    let cubed = f * f * f;
    if cubed > EPSILON {
        cubed
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_and_white_hit_lightness_extremes() {
        assert_eq!(rgb_pixel_to_lab(Rgb([0, 0, 0])), Rgb([0, 128, 128]));
        assert_eq!(rgb_pixel_to_lab(Rgb([255, 255, 255])), Rgb([255, 128, 128]));
    }

    #[test]
    fn neutral_grey_has_no_chroma() {
        let lab = rgb_pixel_to_lab(Rgb([119, 119, 119]));
        assert_eq!(lab.0[1], 128);
        assert_eq!(lab.0[2], 128);
    }

    #[test]
    fn red_has_positive_a() {
        let lab = rgb_pixel_to_lab(Rgb([200, 30, 20]));
        assert!(lab.0[1] > 160, "a* = {}", lab.0[1]);
    }

    #[test]
    fn conversion_is_close_to_invertible() {
        for rgb in [
            Rgb([0u8, 0, 0]),
            Rgb([255, 255, 255]),
            Rgb([180, 60, 30]),
            Rgb([20, 140, 90]),
            Rgb([90, 40, 10]),
        ] {
            let back = lab_pixel_to_rgb(rgb_pixel_to_lab(rgb));
            for (orig, got) in rgb.0.iter().zip(back.0.iter()) {
                assert!(
                    (*orig as i32 - *got as i32).abs() <= 4,
                    "{rgb:?} came back as {back:?}"
                );
            }
        }
    }
}

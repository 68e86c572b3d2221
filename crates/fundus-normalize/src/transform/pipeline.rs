// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalizer — the fixed three-stage transform applied to every fundus image:
//
// 1. exact resize to the target size (aspect ratio is not preserved)
// 2. CLAHE on the L* channel of L*a*b*, chroma untouched
// 3. 3x3 Gaussian denoise
//
// Stage order is part of the output contract.

use fundus_core::config::{NormalizeConfig, ResizeFilter};
use fundus_core::error::{FundusError, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};
use tracing::{debug, instrument};

use super::clahe::Clahe;
use super::color::{lab_to_rgb, rgb_to_lab};
use super::denoise::gaussian_blur_3x3;
use crate::image::buffer::{NormalizedImage, RawImage};

/// Applies the normalization chain with one fixed configuration.
///
/// Holds no mutable state, so one instance can be shared across threads and
/// the same input always yields the same output.
#[derive(Debug, Clone)]
pub struct Normalizer {
    target_width: u32,
    target_height: u32,
    filter: FilterType,
    clahe: Clahe,
}

impl Normalizer {
    /// Build a normalizer, rejecting configurations it cannot honour.
    pub fn new(config: &NormalizeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: &NormalizeConfig) -> Self {
        Self {
            target_width: config.target_width,
            target_height: config.target_height,
            filter: filter_type(config.resize_filter),
            clahe: Clahe::new(config.clip_limit, config.tile_grid_cols, config.tile_grid_rows),
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Run the full chain: resize, then contrast normalization, then denoise.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn normalize(&self, image: &RawImage) -> Result<NormalizedImage> {
        let rgb = image.as_rgb();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(FundusError::Pipeline(format!(
                "empty input buffer ({}x{})",
                rgb.width(),
                rgb.height()
            )));
        }
        let expected = rgb.width() as usize * rgb.height() as usize * 3;
        if rgb.as_raw().len() != expected {
            return Err(FundusError::Pipeline(format!(
                "buffer holds {} bytes, expected {} for {}x{} RGB",
                rgb.as_raw().len(),
                expected,
                rgb.width(),
                rgb.height()
            )));
        }

        let resized = self.resize(rgb);
        let equalized = self.equalize_contrast(&resized);
        let denoised = self.denoise(&equalized);
        debug!(
            out_w = denoised.width(),
            out_h = denoised.height(),
            "Normalization complete"
        );
        Ok(NormalizedImage::new(denoised))
    }

    /// Stage 1: resize to exactly the target size.
    pub fn resize(&self, image: &RgbImage) -> RgbImage {
        if image.dimensions() == (self.target_width, self.target_height) {
            return image.clone();
        }
        imageops::resize(image, self.target_width, self.target_height, self.filter)
    }

    /// Stage 2: equalize local contrast on lightness only.
    pub fn equalize_contrast(&self, image: &RgbImage) -> RgbImage {
        let lab = rgb_to_lab(image);
        let lightness = GrayImage::from_fn(lab.width(), lab.height(), |x, y| {
            Luma([lab.get_pixel(x, y).0[0]])
        });
        let equalized = self.clahe.apply(&lightness);
        let merged = RgbImage::from_fn(lab.width(), lab.height(), |x, y| {
            let Rgb([_, a, b]) = *lab.get_pixel(x, y);
            Rgb([equalized.get_pixel(x, y).0[0], a, b])
        });
        lab_to_rgb(&merged)
    }

    /// Stage 3: suppress the high-frequency noise stage 2 exposes.
    pub fn denoise(&self, image: &RgbImage) -> RgbImage {
        gaussian_blur_3x3(image)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_valid(&NormalizeConfig::default())
    }
}

fn filter_type(filter: ResizeFilter) -> FilterType {
    match filter {
        ResizeFilter::Nearest => FilterType::Nearest,
        ResizeFilter::Triangle => FilterType::Triangle,
        ResizeFilter::CatmullRom => FilterType::CatmullRom,
        ResizeFilter::Gaussian => FilterType::Gaussian,
        ResizeFilter::Lanczos3 => FilterType::Lanczos3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Vignetted disc with vessel-like stripes and pixel noise, roughly what a
    /// fundus photograph looks like to the pipeline.
    fn synthetic_fundus(width: u32, height: u32) -> RgbImage {
        let mut state = 0x2545_f491_u32;
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        let radius = cx.min(cy).max(1.0);
        RgbImage::from_fn(width, height, |x, y| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = (state >> 27) as f32 - 16.0;
            let dist = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt() / radius;
            let falloff = (1.0 - dist).max(0.0);
            let vessel = if (x / 6 + y / 9) % 5 == 0 { -35.0 } else { 0.0 };
            let shade = |base: f32| (base * falloff + vessel + noise).clamp(0.0, 255.0) as u8;
            Rgb([shade(190.0), shade(95.0), shade(45.0)])
        })
    }

    fn normalize(width: u32, height: u32) -> NormalizedImage {
        Normalizer::default()
            .normalize(&RawImage::from_rgb(synthetic_fundus(width, height)))
            .unwrap()
    }

    #[test]
    fn output_is_always_target_size() {
        for (w, h) in [(256, 256), (1, 1), (1000, 3), (3, 700), (640, 480), (512, 512)] {
            let out = normalize(w, h);
            assert_eq!((out.width(), out.height()), (512, 512), "input {w}x{h}");
        }
    }

    #[test]
    fn large_input_is_downscaled_to_target() {
        let out = normalize(1600, 1200);
        assert_eq!((out.width(), out.height()), (512, 512));
    }

    #[test]
    fn honours_configured_target_size() {
        let config = NormalizeConfig {
            target_width: 300,
            target_height: 128,
            ..Default::default()
        };
        let normalizer = Normalizer::new(&config).unwrap();
        let out = normalizer
            .normalize(&RawImage::from_rgb(synthetic_fundus(90, 90)))
            .unwrap();
        assert_eq!((out.width(), out.height()), (300, 128));
        assert_eq!(normalizer.target_size(), (300, 128));
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let raw = RawImage::from_rgb(synthetic_fundus(333, 257));
        let normalizer = Normalizer::default();
        let first = normalizer.normalize(&raw).unwrap();
        let second = normalizer.normalize(&raw).unwrap();
        assert_eq!(first.as_rgb().as_raw(), second.as_rgb().as_raw());
    }

    #[test]
    fn swapping_contrast_and_denoise_changes_output() {
        let normalizer = Normalizer::default();
        let raw = synthetic_fundus(400, 400);

        let canonical = normalizer
            .normalize(&RawImage::from_rgb(raw.clone()))
            .unwrap()
            .into_rgb();
        let resized = normalizer.resize(&raw);
        let swapped = normalizer.equalize_contrast(&normalizer.denoise(&resized));

        assert_ne!(canonical, swapped);
        let rmse = imageproc::stats::root_mean_squared_error(&canonical, &swapped);
        assert!(rmse > 0.5, "stage order barely matters: rmse {rmse}");
    }

    #[test]
    fn contrast_stage_leaves_neutral_pixels_neutral() {
        let normalizer = Normalizer::default();
        let grey = RgbImage::from_fn(64, 64, |x, y| {
            let v = 60 + ((x * 3 + y) % 40) as u8;
            Rgb([v, v, v])
        });
        let out = normalizer.equalize_contrast(&grey);
        for p in out.pixels() {
            let [r, g, b] = p.0;
            assert!(r.abs_diff(g) <= 3 && g.abs_diff(b) <= 3, "{:?}", p);
        }
    }

    #[test]
    fn empty_buffer_is_pipeline_error() {
        let raw = RawImage::from_rgb(RgbImage::new(0, 0));
        assert!(matches!(
            Normalizer::default().normalize(&raw),
            Err(FundusError::Pipeline(_))
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = NormalizeConfig {
            tile_grid_rows: 0,
            ..Default::default()
        };
        assert!(matches!(Normalizer::new(&config), Err(FundusError::Config(_))));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run configuration: normalization parameters and batch settings.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{FundusError, Result};

/// Interpolation filter used by the resize stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    Nearest,
    /// Bilinear.
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

/// Parameters of the per-image transform chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Output width in pixels (default 512).
    pub target_width: u32,
    /// Output height in pixels (default 512).
    pub target_height: u32,
    /// Resampling filter for the resize stage.
    pub resize_filter: ResizeFilter,
    /// CLAHE clip limit, relative to a uniform histogram (default 2.0).
    pub clip_limit: f32,
    /// Number of CLAHE tiles across (default 8).
    pub tile_grid_cols: u32,
    /// Number of CLAHE tiles down (default 8).
    pub tile_grid_rows: u32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            target_width: 512,
            target_height: 512,
            resize_filter: ResizeFilter::Triangle,
            clip_limit: 2.0,
            tile_grid_cols: 8,
            tile_grid_rows: 8,
        }
    }
}

impl NormalizeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(FundusError::Config(format!(
                "target size must be non-zero, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if !self.clip_limit.is_finite() || self.clip_limit <= 0.0 {
            return Err(FundusError::Config(format!(
                "clip limit must be a positive number, got {}",
                self.clip_limit
            )));
        }
        if self.tile_grid_cols == 0 || self.tile_grid_rows == 0 {
            return Err(FundusError::Config(format!(
                "tile grid must be non-zero, got {}x{}",
                self.tile_grid_cols, self.tile_grid_rows
            )));
        }
        Ok(())
    }
}

/// Settings of the batch executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// File extension of eligible inputs, without the leading dot.
    pub extension: String,
    /// Emit a progress report every time the processed count reaches a
    /// multiple of this value (default 1000).
    pub report_interval: u64,
    /// JPEG quality for JPEG outputs (1-100).
    pub jpeg_quality: u8,
    /// Items in flight at once. 1 selects the sequential executor.
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extension: "jpeg".into(),
            report_interval: 1000,
            jpeg_quality: 95,
            workers: 1,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(FundusError::Config("input extension must not be empty".into()));
        }
        if self.report_interval == 0 {
            return Err(FundusError::Config("report interval must be at least 1".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(FundusError::Config(format!(
                "JPEG quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.workers == 0 {
            return Err(FundusError::Config("worker count must be at least 1".into()));
        }
        Ok(())
    }

    /// The extension without any leading dot.
    pub fn bare_extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }
}

/// Complete configuration, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub normalize: NormalizeConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            FundusError::Config(format!("failed to read {}: {}", path.as_ref().display(), err))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.normalize.validate()?;
        self.batch.validate()
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fundus-normalize — Deterministic per-image normalization for fundus
// photographs.
//
// Provides decoded/normalized pixel buffers (decode from file or bytes,
// encode and atomically write) and the transform chain: exact resize,
// contrast-limited adaptive equalization of lightness, and 3x3 Gaussian
// denoise.

pub mod image;
pub mod transform;

// Re-export the primary structs so callers can use `fundus_normalize::Normalizer` etc.
pub use crate::image::buffer::{NormalizedImage, RawImage};
pub use crate::transform::clahe::Clahe;
pub use crate::transform::pipeline::Normalizer;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transform module — the resize → contrast → denoise chain and its stages.

pub mod clahe;
pub mod color;
pub mod denoise;
pub mod pipeline;

pub use clahe::Clahe;
pub use pipeline::Normalizer;

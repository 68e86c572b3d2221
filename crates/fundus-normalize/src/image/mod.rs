// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoded input buffers and normalized output buffers.

pub mod buffer;

pub use buffer::{NormalizedImage, RawImage};

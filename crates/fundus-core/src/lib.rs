// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fundus-prep — Core types, configuration, label table, and error definitions
// shared across all crates.

pub mod config;
pub mod error;
pub mod labels;
pub mod types;

pub use config::{AppConfig, BatchConfig, NormalizeConfig, ResizeFilter};
pub use error::{FundusError, Result};
pub use labels::{LabelRecord, LabelTable, Severity};
pub use types::*;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fundus-batch — Fault-isolated batch execution for fundus normalization.
//
// Enumerates input images, runs each through an `ItemProcessor` with failures
// contained to the item, and reports progress, throughput and ETA to a
// `ProgressSink` while the run is under way.

pub mod enumerate;
pub mod executor;
pub mod metrics;
pub mod processor;
pub mod report;

pub use enumerate::{ensure_output_dir, enumerate_items};
pub use executor::BatchExecutor;
pub use metrics::RunMetrics;
pub use processor::{ItemProcessor, NormalizeProcessor, process_isolated};
pub use report::{ProgressSink, RecordingSink, SinkEvent, TracingSink};

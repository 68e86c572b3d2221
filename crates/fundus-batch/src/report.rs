// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progress telemetry: where per-item failures, periodic reports and the final
// summary go.

use std::sync::Mutex;

use fundus_core::types::{ItemFailure, ProgressReport, RunSummary};
use tracing::{info, warn};

/// Receives run telemetry from the executor.
///
/// Calls arrive from the single loop that owns the run counters, in commit
/// order.
pub trait ProgressSink: Send + Sync {
    /// An item failed; called immediately, before the next item is committed.
    fn on_failure(&self, failure: &ItemFailure);

    /// The processed count reached a reporting point.
    fn on_progress(&self, report: &ProgressReport);

    /// The run is complete.
    fn on_summary(&self, summary: &RunSummary);
}

impl<S: ProgressSink + ?Sized> ProgressSink for &S {
    fn on_failure(&self, failure: &ItemFailure) {
        (**self).on_failure(failure)
    }

    fn on_progress(&self, report: &ProgressReport) {
        (**self).on_progress(report)
    }

    fn on_summary(&self, summary: &RunSummary) {
        (**self).on_summary(summary)
    }
}

/// Emits telemetry as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_failure(&self, failure: &ItemFailure) {
        warn!(
            item = %failure.item,
            kind = %failure.kind,
            reason = %failure.reason,
            "Error processing image"
        );
    }

    fn on_progress(&self, report: &ProgressReport) {
        info!(
            processed = report.processed,
            total = report.total,
            errors = report.errored,
            elapsed_secs = report.elapsed.as_secs_f64(),
            images_per_second = report.throughput,
            eta_minutes = report.eta.map(|d| d.as_secs_f64() / 60.0),
            "Progress update: {report}"
        );
    }

    fn on_summary(&self, summary: &RunSummary) {
        info!(
            run_id = %summary.run_id,
            processed = summary.processed,
            errors = summary.errored,
            total = summary.total,
            total_minutes = summary.elapsed.as_secs_f64() / 60.0,
            average_images_per_second = summary.average_throughput,
            "Processing complete: {summary}"
        );
    }
}

/// A telemetry event as captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Failure(ItemFailure),
    Progress(ProgressReport),
    Summary(RunSummary),
}

/// Keeps every event in memory. Useful for tests and for callers that want to
/// inspect a run after the fact.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().clone()
    }

    pub fn progress_reports(&self) -> Vec<ProgressReport> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Progress(report) => Some(report.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<ItemFailure> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Failure(failure) => Some(failure.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Summary(summary) => Some(summary.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SinkEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressSink for RecordingSink {
    fn on_failure(&self, failure: &ItemFailure) {
        self.lock().push(SinkEvent::Failure(failure.clone()));
    }

    fn on_progress(&self, report: &ProgressReport) {
        self.lock().push(SinkEvent::Progress(report.clone()));
    }

    fn on_summary(&self, summary: &RunSummary) {
        self.lock().push(SinkEvent::Summary(summary.clone()));
    }
}

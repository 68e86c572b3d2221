// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run counters and the pure functions that turn them into progress reports.
//
// `RunMetrics` belongs to whichever loop commits item outcomes; nothing else
// mutates it. Reports are recomputed from the counters each time rather than
// maintained incrementally.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fundus_core::types::{ItemFailure, ProgressReport, RunId, RunSummary};

/// Counters for one batch run.
#[derive(Debug)]
pub struct RunMetrics {
    run_id: RunId,
    started_at: DateTime<Utc>,
    started: Instant,
    total: u64,
    processed: u64,
    errored: u64,
    /// Every failure of the run, kept for the summary. Grows by one small
    /// record per failed item (file name and reason); pixel data is never held.
    failures: Vec<ItemFailure>,
}

impl RunMetrics {
    /// Start the clock for a run over `total` items.
    pub fn start(total: u64) -> Self {
        Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            started: Instant::now(),
            total,
            processed: 0,
            errored: 0,
            failures: Vec::new(),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn errored(&self) -> u64 {
        self.errored
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Every item has been accounted for.
    pub fn is_complete(&self) -> bool {
        self.processed + self.errored == self.total
    }

    /// Commit one success and return the new processed count.
    pub fn record_processed(&mut self) -> u64 {
        debug_assert!(self.processed + self.errored < self.total);
        self.processed += 1;
        self.processed
    }

    /// Commit one failure.
    pub fn record_failure(&mut self, failure: ItemFailure) {
        debug_assert!(self.processed + self.errored < self.total);
        self.errored += 1;
        self.failures.push(failure);
    }

    /// Progress as of now.
    pub fn report(&self) -> ProgressReport {
        progress_report(self.total, self.processed, self.errored, self.elapsed())
    }

    /// Close the run and produce its summary.
    pub fn finish(self) -> RunSummary {
        let elapsed = self.elapsed();
        RunSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            total: self.total,
            processed: self.processed,
            errored: self.errored,
            elapsed,
            average_throughput: throughput(self.processed, elapsed),
            failures: self.failures,
        }
    }
}

/// Successful items per second, if anything has succeeded.
pub fn throughput(processed: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    (processed > 0 && secs > 0.0).then(|| processed as f64 / secs)
}

/// Time to finish the remaining items at `rate` items per second.
pub fn eta(total: u64, processed: u64, rate: Option<f64>) -> Option<Duration> {
    let rate = rate.filter(|r| r.is_finite() && *r > 0.0)?;
    let remaining = total.saturating_sub(processed) as f64;
    Duration::try_from_secs_f64(remaining / rate).ok()
}

/// Snapshot of a run from its counters.
pub fn progress_report(total: u64, processed: u64, errored: u64, elapsed: Duration) -> ProgressReport {
    let rate = throughput(processed, elapsed);
    ProgressReport {
        total,
        processed,
        errored,
        elapsed,
        throughput: rate,
        eta: eta(total, processed, rate),
    }
}

/// Whether a success that brought the count to `processed` triggers a report.
pub fn is_report_point(processed: u64, interval: u64) -> bool {
    interval > 0 && processed > 0 && processed % interval == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundus_core::types::FailureKind;

    #[test]
    fn throughput_is_absent_before_first_success() {
        assert_eq!(throughput(0, Duration::from_secs(5)), None);
        assert_eq!(throughput(10, Duration::ZERO), None);
        assert_eq!(throughput(10, Duration::from_secs(4)), Some(2.5));
    }

    #[test]
    fn eta_uses_remaining_items_over_rate() {
        assert_eq!(eta(2500, 1000, Some(50.0)), Some(Duration::from_secs(30)));
        assert_eq!(eta(2500, 2500, Some(50.0)), Some(Duration::ZERO));
        assert_eq!(eta(2500, 0, None), None);
    }

    #[test]
    fn report_fields_follow_counters() {
        let report = progress_report(3000, 1000, 7, Duration::from_secs(100));
        assert_eq!(report.throughput, Some(10.0));
        assert_eq!(report.eta, Some(Duration::from_secs(200)));
        assert_eq!(report.errored, 7);

        let idle = progress_report(3000, 0, 7, Duration::from_secs(100));
        assert_eq!(idle.throughput, None);
        assert_eq!(idle.eta, None);
    }

    #[test]
    fn report_points_are_positive_multiples() {
        assert!(!is_report_point(0, 1000));
        assert!(!is_report_point(999, 1000));
        assert!(is_report_point(1000, 1000));
        assert!(is_report_point(2000, 1000));
        assert!(!is_report_point(2500, 1000));
        assert!(is_report_point(1, 1));
    }

    #[test]
    fn counters_close_at_total() {
        let mut metrics = RunMetrics::start(3);
        assert_eq!(metrics.record_processed(), 1);
        metrics.record_failure(ItemFailure {
            item: "broken.jpeg".into(),
            kind: FailureKind::Decode,
            reason: "truncated".into(),
        });
        assert!(!metrics.is_complete());
        assert_eq!(metrics.record_processed(), 2);
        assert!(metrics.is_complete());

        let summary = metrics.finish();
        assert_eq!((summary.processed, summary.errored, summary.total), (2, 1, 3));
        assert_eq!(summary.failures.len(), 1);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch executor — drives every enumerated item through an `ItemProcessor`,
// one at a time, isolating per-item failures and emitting progress reports.
//
// A run moves Idle → Enumerating → Running → Completed. Only enumeration and
// output directory creation can abort it; once Running, every item ends up
// counted as either processed or errored.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use fundus_core::config::BatchConfig;
use fundus_core::error::Result;
use fundus_core::types::{BatchItem, FailureKind, ItemFailure, ItemOutcome, RunState, RunSummary};
use tokio::task::{self, JoinSet};
use tracing::{debug, info, instrument, warn};

use crate::enumerate::{ensure_output_dir, enumerate_items};
use crate::metrics::{RunMetrics, is_report_point};
use crate::processor::{ItemProcessor, process_isolated};
use crate::report::ProgressSink;

/// Runs batches with a fixed configuration, processor and telemetry sink.
pub struct BatchExecutor<P, S> {
    config: BatchConfig,
    processor: Arc<P>,
    sink: S,
}

impl<P, S> BatchExecutor<P, S>
where
    P: ItemProcessor + 'static,
    S: ProgressSink,
{
    pub fn new(config: BatchConfig, processor: P, sink: S) -> Self {
        Self {
            config,
            processor: Arc::new(processor),
            sink,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Prepare the output directory and enumerate the inputs. The returned
    /// list fixes the run's total.
    #[instrument(skip_all, fields(input = %input_dir.display(), output = %output_dir.display()))]
    pub fn prepare(&self, input_dir: &Path, output_dir: &Path) -> Result<Vec<BatchItem>> {
        transition(RunState::Idle, RunState::Enumerating);
        ensure_output_dir(output_dir)?;
        enumerate_items(input_dir, output_dir, self.config.bare_extension())
    }

    /// Normalize every eligible file in `input_dir` into `output_dir`,
    /// sequentially.
    ///
    /// Fails only if the output directory cannot be created or the input
    /// directory cannot be listed; per-item failures are counted in the
    /// summary.
    pub fn run_batch(&self, input_dir: &Path, output_dir: &Path) -> Result<RunSummary> {
        let items = self.prepare(input_dir, output_dir)?;
        Ok(self.run_items(&items))
    }

    /// Process a fixed list of items in order.
    #[instrument(skip_all, fields(total = items.len()))]
    pub fn run_items(&self, items: &[BatchItem]) -> RunSummary {
        let mut metrics = RunMetrics::start(items.len() as u64);
        transition(RunState::Enumerating, RunState::Running);
        info!(run_id = %metrics.run_id(), total = metrics.total(), "Batch started");

        for item in items {
            let outcome = process_isolated(&*self.processor, item);
            self.commit(&mut metrics, outcome);
        }

        self.complete(metrics)
    }

    /// Process a fixed list of items with up to `config.workers` in flight.
    ///
    /// Each item runs on tokio's blocking pool with its own buffers; outcomes
    /// come back to this task, which alone updates the counters and emits
    /// reports. Completion order is not enumeration order, but the processed
    /// count seen by reports still only ever grows.
    #[instrument(skip_all, fields(total = items.len(), workers = self.config.workers))]
    pub async fn run_items_concurrent(&self, items: Vec<BatchItem>) -> RunSummary {
        let mut metrics = RunMetrics::start(items.len() as u64);
        transition(RunState::Enumerating, RunState::Running);
        info!(run_id = %metrics.run_id(), total = metrics.total(), "Concurrent batch started");

        let workers = self.config.workers.max(1);
        let mut pending = items.into_iter();
        let mut in_flight = JoinSet::new();
        let mut names: HashMap<task::Id, String> = HashMap::new();

        loop {
            while in_flight.len() < workers {
                let Some(item) = pending.next() else { break };
                let name = item.name();
                let processor = Arc::clone(&self.processor);
                let handle =
                    in_flight.spawn_blocking(move || process_isolated(&*processor, &item));
                names.insert(handle.id(), name);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };
            match joined {
                Ok((id, outcome)) => {
                    names.remove(&id);
                    self.commit(&mut metrics, outcome);
                }
                Err(err) => {
                    let item = names.remove(&err.id()).unwrap_or_default();
                    warn!(%item, error = %err, "Worker did not return an outcome");
                    let failure = ItemFailure {
                        item,
                        kind: FailureKind::Pipeline,
                        reason: format!("worker task failed: {err}"),
                    };
                    self.commit(&mut metrics, ItemOutcome::Failed(failure));
                }
            }
        }

        self.complete(metrics)
    }

    /// Record one outcome and emit whatever telemetry it triggers.
    fn commit(&self, metrics: &mut RunMetrics, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Processed { output } => {
                let processed = metrics.record_processed();
                debug!(processed, output = %output.display(), "Item committed");
                if is_report_point(processed, self.config.report_interval) {
                    self.sink.on_progress(&metrics.report());
                }
            }
            ItemOutcome::Failed(failure) => {
                self.sink.on_failure(&failure);
                metrics.record_failure(failure);
            }
        }
    }

    fn complete(&self, metrics: RunMetrics) -> RunSummary {
        debug_assert!(metrics.is_complete());
        transition(RunState::Running, RunState::Completed);
        let summary = metrics.finish();
        self.sink.on_summary(&summary);
        summary
    }
}

fn transition(from: RunState, to: RunState) {
    debug!(?from, ?to, "Run state change");
}

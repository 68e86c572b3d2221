// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: batch items, per-item outcomes, progress reports and
// run summaries.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a batch run. There is no pause or resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Enumerating,
    Running,
    Completed,
}

/// One unit of work: where to read from and where the result goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchItem {
    pub source: PathBuf,
    pub output: PathBuf,
}

impl BatchItem {
    /// Build an item whose output keeps the source file name under
    /// `output_dir`.
    pub fn mirrored(source: PathBuf, output_dir: &Path) -> Self {
        let output = match source.file_name() {
            Some(name) => output_dir.join(name),
            None => output_dir.to_path_buf(),
        };
        Self { source, output }
    }

    /// Short identifier used in diagnostics (the source file name).
    pub fn name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// Which step of an item's processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Unreadable, corrupt, or unsupported source file.
    Decode,
    /// A transform stage rejected a decoded buffer.
    Pipeline,
    /// The output could not be encoded or written.
    Write,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Decode => "decode",
            Self::Pipeline => "pipeline",
            Self::Write => "write",
        };
        f.write_str(label)
    }
}

/// A recorded per-item failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Item identifier (source file name).
    pub item: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl ItemFailure {
    pub fn new(item: &BatchItem, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            item: item.name(),
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} error): {}", self.item, self.kind, self.reason)
    }
}

/// Result of processing one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The normalized image was written to `output`.
    Processed { output: PathBuf },
    Failed(ItemFailure),
}

/// Point-in-time snapshot of a run's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub total: u64,
    pub processed: u64,
    pub errored: u64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    /// Successful items per second. `None` until something succeeded.
    pub throughput: Option<f64>,
    /// Remaining time at the current throughput.
    #[serde(with = "option_duration_secs")]
    pub eta: Option<Duration>,
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {}/{} images, {} errors, elapsed {:.1}s",
            self.processed,
            self.total,
            self.errored,
            self.elapsed.as_secs_f64()
        )?;
        if let Some(rate) = self.throughput {
            write!(f, ", {rate:.2} images/second")?;
        }
        if let Some(eta) = self.eta {
            write!(f, ", ~{:.2} minutes remaining", eta.as_secs_f64() / 60.0)?;
        }
        Ok(())
    }
}

/// Final account of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub total: u64,
    pub processed: u64,
    pub errored: u64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    /// `processed / elapsed`; `None` if nothing succeeded.
    pub average_throughput: Option<f64>,
    /// One entry per errored item, in commit order.
    pub failures: Vec<ItemFailure>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} complete: {} processed, {} errors of {} images in {:.2} minutes",
            self.run_id,
            self.processed,
            self.errored,
            self.total,
            self.elapsed.as_secs_f64() / 60.0
        )?;
        match self.average_throughput {
            Some(rate) => write!(f, ", average {rate:.2} images/second"),
            None => write!(f, ", no images processed"),
        }
    }
}

/// Serialize a `Duration` as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod option_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for fundus-prep.

use thiserror::Error;

use crate::types::FailureKind;

/// Top-level error type for all fundus-prep operations.
#[derive(Debug, Error)]
pub enum FundusError {
    // -- Per-item errors (recovered by the batch executor) --
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("normalization pipeline failed: {0}")]
    Pipeline(String),

    #[error("could not write output: {0}")]
    Write(String),

    // -- Label table --
    #[error("invalid label: {0}")]
    Validation(String),

    #[error("label file error: {0}")]
    LabelFile(String),

    // -- Run-level errors (abort before any item is processed) --
    #[error("could not enumerate input directory: {0}")]
    Enumerate(String),

    #[error("could not create output directory: {0}")]
    OutputDir(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FailureKind {
    /// Map an error onto the per-item failure taxonomy.
    ///
    /// Raw I/O errors count as write failures: reads go through the decoder,
    /// which reports its own I/O problems as `Decode`.
    pub fn classify(err: &FundusError) -> Option<Self> {
        match err {
            FundusError::Decode(_) => Some(Self::Decode),
            FundusError::Pipeline(_) => Some(Self::Pipeline),
            FundusError::Write(_) | FundusError::Io(_) => Some(Self::Write),
            FundusError::Validation(_)
            | FundusError::LabelFile(_)
            | FundusError::Enumerate(_)
            | FundusError::OutputDir(_)
            | FundusError::Config(_)
            | FundusError::Serialization(_) => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FundusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_errors_are_classified() {
        assert_eq!(
            FailureKind::classify(&FundusError::Decode("zero-byte file".into())),
            Some(FailureKind::Decode)
        );
        assert_eq!(
            FailureKind::classify(&FundusError::Pipeline("empty buffer".into())),
            Some(FailureKind::Pipeline)
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert_eq!(
            FailureKind::classify(&FundusError::Io(io)),
            Some(FailureKind::Write)
        );
    }

    #[test]
    fn run_errors_have_no_item_kind() {
        assert_eq!(FailureKind::classify(&FundusError::Enumerate("missing".into())), None);
        assert_eq!(FailureKind::classify(&FundusError::OutputDir("denied".into())), None);
        assert_eq!(FailureKind::classify(&FundusError::Validation("level 7".into())), None);
        assert_eq!(
            FailureKind::classify(&FundusError::Write("disk full".into())),
            Some(FailureKind::Write)
        );
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input discovery and output directory preparation. Both run before any item
// is processed, and their failures abort the run.

use std::path::Path;

use fundus_core::error::{FundusError, Result};
use fundus_core::types::BatchItem;
use tracing::{debug, info, instrument};

/// List the eligible files directly inside `input_dir`.
///
/// A file is eligible when its extension equals `extension` (ASCII
/// case-insensitive, leading dot optional). Subdirectories are not descended
/// into. Items come back sorted by file name so that every run over the same
/// directory sees the same order.
#[instrument(skip_all, fields(input = %input_dir.display(), extension = %extension))]
pub fn enumerate_items(
    input_dir: &Path,
    output_dir: &Path,
    extension: &str,
) -> Result<Vec<BatchItem>> {
    let wanted = extension.trim_start_matches('.');
    let entries = std::fs::read_dir(input_dir).map_err(|err| {
        FundusError::Enumerate(format!("{}: {}", input_dir.display(), err))
    })?;

    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|err| FundusError::Enumerate(format!("{}: {}", input_dir.display(), err)))?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted));
        if !matches {
            continue;
        }
        // Follows symlinks; dangling links and directories named `*.jpeg` are skipped.
        if !path.is_file() {
            debug!(path = %path.display(), "Skipping non-file entry");
            continue;
        }
        sources.push(path);
    }
    sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    info!(count = sources.len(), "Input images found");
    Ok(sources
        .into_iter()
        .map(|source| BatchItem::mirrored(source, output_dir))
        .collect())
}

/// Create `output_dir` (and parents) if it does not exist yet.
#[instrument(skip_all, fields(output = %output_dir.display()))]
pub fn ensure_output_dir(output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .map_err(|err| FundusError::OutputDir(format!("{}: {}", output_dir.display(), err)))?;
    if !output_dir.is_dir() {
        return Err(FundusError::OutputDir(format!(
            "{} exists and is not a directory",
            output_dir.display()
        )));
    }
    Ok(())
}

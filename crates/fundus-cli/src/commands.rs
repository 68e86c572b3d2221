// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use fundus_batch::{BatchExecutor, NormalizeProcessor, TracingSink};
use fundus_core::{AppConfig, BatchItem, LabelTable, Severity};
use fundus_normalize::{Normalizer, RawImage};
use tracing::{info, warn};

use crate::RunArgs;

/// Defaults, or the given file.
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    Ok(config)
}

pub fn run(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(extension) = args.extension {
        config.batch.extension = extension;
    }
    if let Some(workers) = args.workers {
        config.batch.workers = workers;
    }
    if let Some(interval) = args.report_interval {
        config.batch.report_interval = interval;
    }
    config.validate()?;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        workers = config.batch.workers,
        "Starting full dataset preprocessing"
    );

    let labels = args
        .labels
        .as_deref()
        .map(|path| LabelTable::load(path, config.batch.bare_extension()))
        .transpose()?;
    if let Some(labels) = &labels {
        let counts = labels.severity_counts();
        for severity in Severity::ALL {
            info!(
                severity = %severity,
                images = counts[severity.code() as usize],
                "Label distribution"
            );
        }
    }

    let normalizer = Normalizer::new(&config.normalize)?;
    let processor = NormalizeProcessor::new(normalizer, config.batch.jpeg_quality);
    let executor = BatchExecutor::new(config.batch.clone(), processor, TracingSink);

    let items = executor.prepare(&args.input, &args.output)?;
    if let Some(labels) = &labels {
        report_unlabeled(labels, &items);
    }

    let workers = executor.config().workers;
    let summary = if workers > 1 {
        let runtime = build_runtime(workers)?;
        runtime.block_on(executor.run_items_concurrent(items))
    } else {
        executor.run_items(&items)
    };

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        info!(path = %path.display(), "Summary written");
    }
    Ok(())
}

fn report_unlabeled(labels: &LabelTable, items: &[BatchItem]) {
    let unlabeled = items
        .iter()
        .filter(|item| labels.get(&item.name()).is_none())
        .count();
    if unlabeled > 0 {
        warn!(unlabeled, "Images without a label entry");
    }
}

fn build_runtime(workers: usize) -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .max_blocking_threads(workers)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

pub fn normalize_one(config_path: Option<&Path>, input: &Path, output: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;

    let raw = RawImage::open(input)?;
    let normalized = Normalizer::new(&config.normalize)?.normalize(&raw)?;
    normalized.save(output, config.batch.jpeg_quality)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        width = normalized.width(),
        height = normalized.height(),
        "Image normalized"
    );
    Ok(())
}

pub fn validate(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;
    info!(?config, "Configuration is valid");
    Ok(())
}

pub fn generate_config(output: &Path) -> Result<()> {
    AppConfig::default().save(output)?;
    info!(path = %output.display(), "Default configuration written");
    Ok(())
}

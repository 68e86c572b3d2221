// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-item work: decode → normalize → write, with every failure turned into
// an `ItemOutcome` instead of escaping to the caller.

use std::panic::{self, AssertUnwindSafe};

use fundus_core::error::FundusError;
use fundus_core::types::{BatchItem, FailureKind, ItemFailure, ItemOutcome};
use fundus_normalize::{NormalizedImage, Normalizer, RawImage};
use tracing::{debug, instrument, warn};

/// Processes one batch item to completion.
///
/// Implementations report every problem through `ItemOutcome::Failed`. A panic
/// from decoders, transforms or encoders is contained by [`process_isolated`].
pub trait ItemProcessor: Send + Sync {
    fn process(&self, item: &BatchItem) -> ItemOutcome;
}

/// Run `processor` on `item`, turning a panic anywhere inside it into a
/// pipeline failure for that item.
pub fn process_isolated<P>(processor: &P, item: &BatchItem) -> ItemOutcome
where
    P: ItemProcessor + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| processor.process(item))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let reason = format!("processing panicked: {}", panic_message(payload.as_ref()));
            warn!(item = %item.name(), %reason, "Item processing panicked");
            ItemOutcome::Failed(ItemFailure::new(item, FailureKind::Pipeline, reason))
        }
    }
}

/// The production processor: decode the source, normalize it, and write the
/// result next to its siblings in the output directory.
#[derive(Debug, Clone)]
pub struct NormalizeProcessor {
    normalizer: Normalizer,
    jpeg_quality: u8,
}

impl NormalizeProcessor {
    pub fn new(normalizer: Normalizer, jpeg_quality: u8) -> Self {
        Self {
            normalizer,
            jpeg_quality,
        }
    }

    /// Decode and normalize without writing anything.
    pub fn normalize_file(&self, item: &BatchItem) -> Result<NormalizedImage, ItemFailure> {
        let raw = RawImage::open(&item.source).map_err(|err| failure(item, &err))?;
        self.normalizer
            .normalize(&raw)
            .map_err(|err| failure(item, &err))
    }
}

impl ItemProcessor for NormalizeProcessor {
    #[instrument(skip_all, fields(item = %item.source.display()))]
    fn process(&self, item: &BatchItem) -> ItemOutcome {
        let normalized = match self.normalize_file(item) {
            Ok(normalized) => normalized,
            Err(failure) => return ItemOutcome::Failed(failure),
        };
        if let Err(err) = normalized.save(&item.output, self.jpeg_quality) {
            return ItemOutcome::Failed(failure(item, &err));
        }
        debug!(output = %item.output.display(), "Item processed");
        ItemOutcome::Processed {
            output: item.output.clone(),
        }
    }
}

/// Turn an error into a failure record for `item`.
fn failure(item: &BatchItem, err: &FundusError) -> ItemFailure {
    let kind = FailureKind::classify(err).unwrap_or(FailureKind::Pipeline);
    ItemFailure::new(item, kind, err.to_string())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
            .save(path)
            .unwrap();
    }

    fn processor() -> NormalizeProcessor {
        NormalizeProcessor::new(Normalizer::default(), 95)
    }

    #[test]
    fn valid_image_is_written_at_target_size() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = input.path().join("1_left.jpeg");
        write_jpeg(&source, 256, 256);

        let item = BatchItem::mirrored(source, output.path());
        let outcome = processor().process(&item);

        assert_eq!(
            outcome,
            ItemOutcome::Processed {
                output: output.path().join("1_left.jpeg")
            }
        );
        assert_eq!(
            image::image_dimensions(output.path().join("1_left.jpeg")).unwrap(),
            (512, 512)
        );
    }

    #[test]
    fn zero_byte_source_is_decode_failure_without_output() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = input.path().join("empty.jpeg");
        std::fs::write(&source, b"").unwrap();

        let item = BatchItem::mirrored(source, output.path());
        match processor().process(&item) {
            ItemOutcome::Failed(failure) => {
                assert_eq!(failure.kind, FailureKind::Decode);
                assert_eq!(failure.item, "empty.jpeg");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!output.path().join("empty.jpeg").exists());
    }

    #[test]
    fn blocked_output_is_write_failure() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = input.path().join("2_right.jpeg");
        write_jpeg(&source, 64, 48);
        std::fs::create_dir(output.path().join("2_right.jpeg")).unwrap();

        let item = BatchItem::mirrored(source, output.path());
        match processor().process(&item) {
            ItemOutcome::Failed(failure) => assert_eq!(failure.kind, FailureKind::Write),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    struct PanickingProcessor;

    impl ItemProcessor for PanickingProcessor {
        fn process(&self, item: &BatchItem) -> ItemOutcome {
            panic!("decoder blew up on {}", item.name());
        }
    }

    #[test]
    fn isolated_panic_becomes_pipeline_failure() {
        let item = BatchItem::mirrored("in/3_left.jpeg".into(), Path::new("out"));
        match process_isolated(&PanickingProcessor, &item) {
            ItemOutcome::Failed(failure) => {
                assert_eq!(failure.kind, FailureKind::Pipeline);
                assert_eq!(failure.item, "3_left.jpeg");
                assert!(failure.reason.contains("decoder blew up on 3_left.jpeg"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn isolated_call_passes_outcomes_through() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = input.path().join("4_right.jpeg");
        write_jpeg(&source, 32, 32);

        let item = BatchItem::mirrored(source, output.path());
        assert!(matches!(
            process_isolated(&processor(), &item),
            ItemOutcome::Processed { .. }
        ));
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload = panic::catch_unwind::<_, ()>(|| panic!("stage exploded")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "stage exploded");
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label table — maps image identifiers to diabetic retinopathy severity.
//
// The table is a CSV with at least `image` and `level` columns. It is
// metadata that travels alongside the images; pixel processing never reads it.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{FundusError, Result};

/// Five-level diabetic retinopathy grading scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    NoDr,
    Mild,
    Moderate,
    Severe,
    ProliferativeDr,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Self::NoDr,
        Self::Mild,
        Self::Moderate,
        Self::Severe,
        Self::ProliferativeDr,
    ];

    /// Numeric grade as it appears in the `level` column.
    pub fn code(&self) -> u8 {
        match self {
            Self::NoDr => 0,
            Self::Mild => 1,
            Self::Moderate => 2,
            Self::Severe => 3,
            Self::ProliferativeDr => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NoDr => "No DR",
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
            Self::ProliferativeDr => "Proliferative DR",
        }
    }
}

impl TryFrom<i64> for Severity {
    type Error = FundusError;

    fn try_from(level: i64) -> Result<Self> {
        match level {
            0 => Ok(Self::NoDr),
            1 => Ok(Self::Mild),
            2 => Ok(Self::Moderate),
            3 => Ok(Self::Severe),
            4 => Ok(Self::ProliferativeDr),
            other => Err(FundusError::Validation(format!(
                "severity level {other} is outside 0..=4"
            ))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the label table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Identifier exactly as written in the table.
    pub image: String,
    /// File name the identifier refers to.
    pub filename: String,
    pub severity: Severity,
}

/// Parsed label table, indexed by file name.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    records: Vec<LabelRecord>,
    by_filename: HashMap<String, usize>,
}

impl LabelTable {
    /// Load a label CSV from disk.
    ///
    /// `extension` (e.g. `"jpeg"`) is appended to every identifier when none
    /// of them already carries it.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, extension: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            FundusError::LabelFile(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        let table = Self::parse(&text, extension)?;
        info!(labels = table.len(), "Label table loaded");
        Ok(table)
    }

    /// Parse label CSV text.
    pub fn parse(text: &str, extension: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| FundusError::LabelFile("label file is empty".into()))?;
        let columns: Vec<&str> = header.split(',').map(|c| c.trim()).collect();
        let image_col = column_index(&columns, "image")?;
        let level_col = column_index(&columns, "level")?;

        let mut rows = Vec::new();
        for (line_no, line) in lines {
            let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
            let field = |idx: usize| {
                fields.get(idx).copied().ok_or_else(|| {
                    FundusError::LabelFile(format!(
                        "line {}: expected {} columns, found {}",
                        line_no + 1,
                        columns.len(),
                        fields.len()
                    ))
                })
            };
            let image = field(image_col)?.to_string();
            let raw_level = field(level_col)?;
            let level: i64 = raw_level.parse().map_err(|_| {
                FundusError::LabelFile(format!(
                    "line {}: level {raw_level:?} is not an integer",
                    line_no + 1
                ))
            })?;
            let severity = Severity::try_from(level).map_err(|err| {
                FundusError::Validation(format!("line {} ({image}): {err}", line_no + 1))
            })?;
            rows.push((image, severity));
        }

        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let append_suffix = !rows.iter().any(|(image, _)| image.contains(suffix.as_str()));
        debug!(rows = rows.len(), append_suffix, "Label rows parsed");

        let mut table = Self::default();
        for (image, severity) in rows {
            let filename = if append_suffix {
                format!("{image}{suffix}")
            } else {
                image.clone()
            };
            table.by_filename.insert(filename.clone(), table.records.len());
            table.records.push(LabelRecord {
                image,
                filename,
                severity,
            });
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LabelRecord] {
        &self.records
    }

    /// Look up a record by its file name (e.g. `"10_left.jpeg"`).
    pub fn get(&self, filename: &str) -> Option<&LabelRecord> {
        self.by_filename.get(filename).map(|&idx| &self.records[idx])
    }

    /// Number of records per severity, indexed by `Severity::code`.
    pub fn severity_counts(&self) -> [usize; 5] {
        let mut counts = [0usize; 5];
        for record in &self.records {
            counts[record.severity.code() as usize] += 1;
        }
        counts
    }
}

fn column_index(columns: &[&str], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .ok_or_else(|| FundusError::LabelFile(format!("missing required column {name:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KAGGLE_STYLE: &str = "image,level\n10_left,0\n10_right,0\n13_left,2\n15_right,4\n";

    #[test]
    fn severity_codes_map_to_names() {
        let names: Vec<&str> = (0i64..=4)
            .map(|level| Severity::try_from(level).unwrap().name())
            .collect();
        assert_eq!(
            names,
            ["No DR", "Mild", "Moderate", "Severe", "Proliferative DR"]
        );
    }

    #[test]
    fn out_of_range_level_is_validation_error() {
        assert!(matches!(Severity::try_from(5i64), Err(FundusError::Validation(_))));
        assert!(matches!(Severity::try_from(-1i64), Err(FundusError::Validation(_))));

        let err = LabelTable::parse("image,level\n1_left,7\n", "jpeg").unwrap_err();
        assert!(matches!(err, FundusError::Validation(_)));
    }

    #[test]
    fn extension_appended_when_identifiers_lack_it() {
        let table = LabelTable::parse(KAGGLE_STYLE, "jpeg").unwrap();
        assert_eq!(table.len(), 4);
        let record = table.get("13_left.jpeg").unwrap();
        assert_eq!(record.image, "13_left");
        assert_eq!(record.severity, Severity::Moderate);
        assert!(table.get("13_left").is_none());
    }

    #[test]
    fn identifiers_with_extension_are_kept() {
        let table = LabelTable::parse("image,level\n1_left.jpeg,1\n", "jpeg").unwrap();
        assert_eq!(table.get("1_left.jpeg").unwrap().severity, Severity::Mild);
    }

    #[test]
    fn extra_columns_and_order_are_tolerated() {
        let table =
            LabelTable::parse("patient,level,image\n7,3,7_left\n7,1,7_right\n", ".jpeg").unwrap();
        assert_eq!(table.get("7_left.jpeg").unwrap().severity, Severity::Severe);
    }

    #[test]
    fn counts_per_severity() {
        let table = LabelTable::parse(KAGGLE_STYLE, "jpeg").unwrap();
        assert_eq!(table.severity_counts(), [2, 0, 1, 0, 1]);
    }

    #[test]
    fn malformed_tables_are_label_file_errors() {
        assert!(matches!(
            LabelTable::parse("", "jpeg"),
            Err(FundusError::LabelFile(_))
        ));
        assert!(matches!(
            LabelTable::parse("name,grade\na,1\n", "jpeg"),
            Err(FundusError::LabelFile(_))
        ));
        assert!(matches!(
            LabelTable::parse("image,level\na,mild\n", "jpeg"),
            Err(FundusError::LabelFile(_))
        ));
        assert!(matches!(
            LabelTable::parse("image,level\na\n", "jpeg"),
            Err(FundusError::LabelFile(_))
        ));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainLabels.csv");
        std::fs::write(&path, KAGGLE_STYLE).unwrap();
        let table = LabelTable::load(&path, "jpeg").unwrap();
        assert_eq!(table.records().len(), 4);
    }
}

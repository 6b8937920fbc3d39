//! Bulk dataset normalization.
//!
//! Reads a CSV of pre-computed raw measurements, resolves its headers through
//! the schema aliases, thresholds every cell with the same transforms the live
//! analyzers use, and writes one canonical row per input row.

use crate::assemble::assemble;
use crate::error::{CoreError, Result};
use crate::record::{FallbackReason, PartialRecord, Ternary};
use crate::schema::{FEATURE_COUNT, FeatureKey, LABEL_COLUMN, Label, RawValue};
use csv::StringRecord;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct DatasetOptions {
    /// Write only the classifier keys
    pub classifier_only: bool,
    /// Write the sentinel instead of an empty cell for nulls
    pub fill_sentinel: bool,
    /// Copy a `url` input column through as `URL`
    pub keep_url: bool,
}

impl DatasetOptions {
    pub fn output_keys(&self) -> &'static [FeatureKey] {
        if self.classifier_only {
            FeatureKey::classifier_keys()
        } else {
            &FeatureKey::ALL
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetReport {
    pub rows_processed: usize,
    /// Null cells per output column, including columns missing from the input
    pub null_counts: BTreeMap<String, usize>,
    /// Schema columns the input lacks
    pub missing_columns: Vec<FeatureKey>,
    /// Rows with at least one cell that could not be coerced
    pub degraded_rows: usize,
}

impl DatasetReport {
    pub fn total_nulls(&self) -> usize {
        self.null_counts.values().sum()
    }
}

/// Where each interesting input column sits.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    features: BTreeMap<FeatureKey, usize>,
    url: Option<usize>,
    label: Option<usize>,
}

impl ColumnMap {
    /// Resolve a header row. When several columns resolve to the same key
    /// the canonical name wins, then the leftmost alias.
    pub fn resolve(headers: &StringRecord) -> Self {
        let mut map = ColumnMap::default();
        for (idx, column) in headers.iter().enumerate() {
            let column = column.trim();
            if let Some(key) = FeatureKey::from_column(column) {
                let canonical = column.eq_ignore_ascii_case(key.name());
                if canonical || !map.features.contains_key(&key) {
                    map.features.insert(key, idx);
                }
            } else if Label::is_label_column(column) {
                map.label.get_or_insert(idx);
            } else if column.eq_ignore_ascii_case("url") {
                map.url.get_or_insert(idx);
            } else {
                debug!("Ignoring unknown column {}", column);
            }
        }
        map
    }

    pub fn column_of(&self, key: FeatureKey) -> Option<usize> {
        self.features.get(&key).copied()
    }

    pub fn has_label(&self) -> bool {
        self.label.is_some()
    }

    pub fn has_url(&self) -> bool {
        self.url.is_some()
    }
}

/// One input row after thresholding. `None` marks a null cell.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub index: usize,
    pub url: Option<String>,
    pub values: [Option<Ternary>; FEATURE_COUNT],
    pub label: Option<Label>,
    /// Present cells that failed coercion
    pub coercion_failures: usize,
}

impl NormalizedRow {
    pub fn from_record(index: usize, record: &StringRecord, columns: &ColumnMap) -> Self {
        let mut values = [None; FEATURE_COUNT];
        let mut coercion_failures = 0;

        for (key, &col) in &columns.features {
            let cell = record.get(col).unwrap_or_default();
            let value = RawValue::from_cell(cell).and_then(|raw| key.normalize(&raw));
            if value.is_none() && !cell.trim().is_empty() {
                coercion_failures += 1;
            }
            values[key.index()] = value;
        }

        Self {
            index,
            url: columns
                .url
                .and_then(|col| record.get(col))
                .map(|u| u.trim().to_string()),
            values,
            label: columns
                .label
                .and_then(|col| record.get(col))
                .and_then(Label::from_cell),
            coercion_failures,
        }
    }

    pub fn get(&self, key: FeatureKey) -> Option<Ternary> {
        self.values[key.index()]
    }

    /// The row as an analyzer output: nulls become fallbacks tagged with why
    /// they are null.
    pub fn to_partial(&self, columns: &ColumnMap) -> PartialRecord {
        let mut partial = PartialRecord::new();
        for key in FeatureKey::ALL {
            match (self.get(key), columns.column_of(key)) {
                (Some(value), _) => partial.set(key, value),
                (None, Some(_)) => partial.fall_back(
                    key,
                    FallbackReason::TypeCoercionFailure,
                    format!("row {}: cell could not be coerced", self.index),
                ),
                (None, None) => partial.fall_back(
                    key,
                    FallbackReason::SchemaMismatch,
                    "column missing from input",
                ),
            }
        }
        partial
    }
}

/// Threshold every data row. Runs on the rayon pool; output order matches
/// input order.
pub fn normalize_rows(records: &[StringRecord], columns: &ColumnMap) -> Vec<NormalizedRow> {
    records
        .par_iter()
        .enumerate()
        .map(|(index, record)| NormalizedRow::from_record(index, record, columns))
        .collect()
}

fn output_headers(columns: &ColumnMap, options: &DatasetOptions) -> Vec<String> {
    let mut headers = vec!["index".to_string()];
    if options.keep_url && columns.has_url() {
        headers.push("URL".to_string());
    }
    headers.extend(options.output_keys().iter().map(|k| k.name().to_string()));
    if columns.has_label() {
        headers.push(LABEL_COLUMN.to_string());
    }
    headers
}

fn output_row(row: &NormalizedRow, columns: &ColumnMap, options: &DatasetOptions) -> Vec<String> {
    let mut cells = vec![row.index.to_string()];
    if options.keep_url && columns.has_url() {
        cells.push(row.url.clone().unwrap_or_default());
    }

    if options.fill_sentinel {
        let assembled = assemble(
            row.to_partial(columns),
            PartialRecord::new(),
            PartialRecord::new(),
        );
        cells.extend(
            options
                .output_keys()
                .iter()
                .map(|key| assembled.record.get(*key).to_string()),
        );
    } else {
        cells.extend(
            options
                .output_keys()
                .iter()
                .map(|key| row.get(*key).map(|v| v.to_string()).unwrap_or_default()),
        );
    }

    if columns.has_label() {
        cells.push(
            row.label
                .map(|label| label.as_ternary().to_string())
                .unwrap_or_default(),
        );
    }
    cells
}

/// Normalize a whole CSV dataset from `reader` into `writer`.
///
/// Never aborts on bad data: missing columns and uncoercible cells become
/// nulls and are counted in the report. Only I/O and CSV framing errors fail.
pub fn normalize_dataset<R: Read, W: Write>(
    reader: R,
    writer: W,
    options: &DatasetOptions,
) -> Result<DatasetReport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.is_empty() {
        return Err(CoreError::InvalidInput("dataset has no header row".to_string()));
    }
    let columns = ColumnMap::resolve(&headers);

    let mut report = DatasetReport::default();
    for key in options.output_keys() {
        if columns.column_of(*key).is_none() {
            warn!(
                "Input has no column for {} (schema mismatch); filling with nulls",
                key
            );
            report.missing_columns.push(*key);
        }
    }

    let records = csv_reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    info!("Normalizing {} rows", records.len());

    let rows = normalize_rows(&records, &columns);

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(output_headers(&columns, options))?;

    for row in &rows {
        for key in options.output_keys() {
            if row.get(*key).is_none() {
                *report.null_counts.entry(key.name().to_string()).or_insert(0) += 1;
            }
        }
        if columns.has_label() && row.label.is_none() {
            *report.null_counts.entry(LABEL_COLUMN.to_string()).or_insert(0) += 1;
        }
        if row.coercion_failures > 0 {
            report.degraded_rows += 1;
        }
        csv_writer.write_record(output_row(row, &columns, options))?;
    }
    csv_writer.flush()?;

    report.rows_processed = rows.len();
    Ok(report)
}

/// File-to-file convenience wrapper around [`normalize_dataset`].
pub fn normalize_file(input: &Path, output: &Path, options: &DatasetOptions) -> Result<DatasetReport> {
    let reader = File::open(input)?;
    let writer = File::create(output)?;
    normalize_dataset(reader, writer, options)
}

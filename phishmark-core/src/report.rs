// Report generation for analyzed URLs, batches and normalized datasets

use crate::batch::UrlAnalysis;
use crate::dataset::DatasetReport;
use crate::error::Result;
use crate::record::{FallbackReason, Ternary};
use crate::schema::{FeatureKey, SCHEMA, SCHEMA_VERSION};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

fn colorize(value: Ternary) -> String {
    let text = format!("{:>2}", value.value());
    match value {
        Ternary::Phishing => text.red().bold().to_string(),
        Ternary::Suspicious => text.yellow().to_string(),
        Ternary::Legitimate => text.green().to_string(),
    }
}

fn section(report: &mut String, title: &str) {
    report.push_str(RULE);
    report.push_str(title);
    report.push('\n');
    report.push_str(RULE);
    report.push('\n');
}

/// Human-readable report for one URL: every key, the classifier vector and
/// the fallback list.
pub fn generate_text_report(analysis: &UrlAnalysis) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                         PHISHMARK FEATURE REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("URL:          {}\n", analysis.url));
    if let Some(ref fetch) = analysis.fetch {
        report.push_str(&format!("Status:       {}\n", fetch.status_code));
        report.push_str(&format!("Final URL:    {}\n", fetch.final_url));
        report.push_str(&format!("Redirects:    {}\n", fetch.redirect_chain.len()));
        report.push_str(&format!("Fetch time:   {} ms\n", fetch.response_time_ms));
    } else if let Some(ref error) = analysis.fetch_error {
        report.push_str(&format!("Fetch:        {}\n", error.red()));
    } else {
        report.push_str("Fetch:        skipped (offline)\n");
    }
    report.push('\n');

    section(&mut report, "FEATURES");
    let record = &analysis.assembled.record;
    for (key, value) in record.iter() {
        let marker = if analysis.assembled.fallback_for(key).is_some() {
            " *"
        } else {
            ""
        };
        report.push_str(&format!("  {:<30} {}{}\n", key.name(), colorize(value), marker));
    }
    report.push('\n');

    let vector: Vec<String> = record
        .classifier_vector()
        .iter()
        .map(|v| v.to_string())
        .collect();
    report.push_str(&format!("Classifier vector: [{}]\n\n", vector.join(", ")));

    if analysis.assembled.fallbacks.is_empty() {
        report.push_str(&format!("{} every key computed\n", "✓".green().bold()));
    } else {
        section(&mut report, "FALLBACKS (*)");
        for fallback in &analysis.assembled.fallbacks {
            report.push_str(&format!(
                "  {:<30} {:<22} {}\n",
                fallback.key.name(),
                fallback.reason.as_str(),
                fallback.detail
            ));
        }
    }
    report.push('\n');

    report
}

pub fn generate_json_report(analysis: &UrlAnalysis) -> std::result::Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "metadata": {
            "generator": "phishmark",
            "version": env!("CARGO_PKG_VERSION"),
            "schema_version": SCHEMA_VERSION,
            "generated_at": chrono::Utc::now().to_rfc3339(),
        },
        "analysis": analysis,
        "classifier_vector": analysis.assembled.record.classifier_vector(),
    });

    serde_json::to_string_pretty(&json_report)
}

/// Write batch results as a feature CSV: `index`, `URL`, then the schema
/// keys in canonical order.
pub fn write_feature_csv<W: Write>(
    analyses: &[UrlAnalysis],
    writer: W,
    classifier_only: bool,
) -> Result<()> {
    let keys: &[FeatureKey] = if classifier_only {
        FeatureKey::classifier_keys()
    } else {
        &FeatureKey::ALL
    };

    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut header = vec!["index".to_string(), "URL".to_string()];
    header.extend(keys.iter().map(|k| k.name().to_string()));
    csv_writer.write_record(&header)?;

    for analysis in analyses {
        let mut row = vec![analysis.index.to_string(), analysis.url.clone()];
        row.extend(
            keys.iter()
                .map(|k| analysis.assembled.record.get(*k).to_string()),
        );
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn save_feature_csv(analyses: &[UrlAnalysis], path: &Path, classifier_only: bool) -> Result<()> {
    let file = File::create(path)?;
    write_feature_csv(analyses, file, classifier_only)
}

/// Counts of degraded rows and fallback reasons across a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub degraded: usize,
    pub fetch_failures: usize,
    pub reasons: BTreeMap<String, usize>,
}

pub fn summarize_batch(analyses: &[UrlAnalysis]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: analyses.len(),
        ..Default::default()
    };
    for analysis in analyses {
        if analysis.assembled.is_degraded() {
            summary.degraded += 1;
        }
        if analysis.fetch_error.is_some() {
            summary.fetch_failures += 1;
        }
        for fallback in &analysis.assembled.fallbacks {
            *summary
                .reasons
                .entry(fallback.reason.as_str().to_string())
                .or_insert(0) += 1;
        }
    }
    summary
}

pub fn generate_batch_summary(summary: &BatchSummary) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push('\n');
    report.push_str("# Summary:\n");
    report.push_str(&format!("  URLs analyzed: {}\n", summary.total));
    report.push_str(&format!("  Degraded rows: {}\n", summary.degraded));
    report.push_str(&format!("  Fetch failures: {}\n", summary.fetch_failures));

    if !summary.reasons.is_empty() {
        report.push_str("\n# Sentinel keys by reason:\n");
        for (reason, count) in &summary.reasons {
            report.push_str(&format!("  {:<22} {}\n", reason, count));
        }
    }
    report.push('\n');
    report
}

pub fn generate_dataset_summary(data: &DatasetReport) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push('\n');
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Rows processed: {}\n", data.rows_processed));
    report.push_str(&format!("  Degraded rows: {}\n", data.degraded_rows));
    report.push_str(&format!("  Null cells: {}\n", data.total_nulls()));

    if !data.missing_columns.is_empty() {
        report.push_str(&format!(
            "\n# Missing columns ({}):\n",
            FallbackReason::SchemaMismatch
        ));
        for key in &data.missing_columns {
            report.push_str(&format!("  {}\n", key.name()));
        }
    }

    let partial: Vec<(&String, &usize)> = data
        .null_counts
        .iter()
        .filter(|(column, _)| {
            !data
                .missing_columns
                .iter()
                .any(|key| key.name() == column.as_str())
        })
        .collect();
    if !partial.is_empty() {
        report.push_str("\n# Null cells per column:\n");
        for (column, count) in partial {
            report.push_str(&format!("  {:<30} {}\n", column, count));
        }
    }
    report.push('\n');
    report
}

/// The schema as a table: position, key, stage, aliases.
pub fn generate_schema_listing() -> String {
    let mut listing = String::new();
    listing.push_str(&format!("Schema version {}\n\n", SCHEMA_VERSION));
    listing.push_str(&format!(
        "  {:<4} {:<30} {:<11} {}\n",
        "#", "KEY", "STAGE", "ALIASES"
    ));
    for (position, spec) in SCHEMA.iter().enumerate() {
        let slot = if spec.key.is_classifier_key() {
            position.to_string()
        } else {
            "-".to_string()
        };
        listing.push_str(&format!(
            "  {:<4} {:<30} {:<11} {}\n",
            slot,
            spec.name,
            spec.stage.as_str(),
            spec.aliases.join(", ")
        ));
    }
    listing
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

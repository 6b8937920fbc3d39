// Tests for bulk dataset normalization

use phishmark_core::dataset::{DatasetOptions, normalize_dataset, normalize_file};
use phishmark_core::error::CoreError;
use phishmark_core::schema::{FeatureKey, normalize_column};
use std::fs;
use tempfile::TempDir;

const SAMPLE: &str = "\
url,length_url,ip,nb_subdomains,age_of_domain,status
http://a.com/,20,0,0,200,legitimate
http://1.2.3.4/x,80,1,3,-1,phishing
http://b.com/,abc,,1,100,phishing
";

struct Output {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Output {
    fn column(&self, name: &str) -> usize {
        self.headers
            .iter()
            .position(|h| h == name)
            .unwrap_or_else(|| panic!("no column {}", name))
    }

    fn cell(&self, row: usize, name: &str) -> &str {
        &self.rows[row][self.column(name)]
    }
}

fn run(input: &str, options: &DatasetOptions) -> (Output, phishmark_core::DatasetReport) {
    let mut buffer = Vec::new();
    let report = normalize_dataset(input.as_bytes(), &mut buffer, options).unwrap();

    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let headers = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (Output { headers, rows }, report)
}

// ============================================================================
// Normalization Tests
// ============================================================================

#[test]
fn test_normalize_sample_dataset() {
    let (out, _) = run(SAMPLE, &DatasetOptions::default());

    assert_eq!(out.headers.len(), 1 + 30 + 1);
    assert_eq!(out.headers[0], "index");
    assert_eq!(out.headers[1], "having_IP_Address");
    assert_eq!(out.headers.last().unwrap(), "Result");
    assert_eq!(out.rows.len(), 3);

    assert_eq!(out.cell(0, "index"), "0");
    assert_eq!(out.cell(0, "URL_Length"), "1");
    assert_eq!(out.cell(0, "having_IP_Address"), "1");
    assert_eq!(out.cell(0, "having_Sub_Domain"), "1");
    assert_eq!(out.cell(0, "Domain_age"), "1");
    assert_eq!(out.cell(0, "Result"), "1");

    assert_eq!(out.cell(1, "URL_Length"), "-1");
    assert_eq!(out.cell(1, "having_IP_Address"), "-1");
    assert_eq!(out.cell(1, "having_Sub_Domain"), "-1");
    assert_eq!(out.cell(1, "Domain_age"), "-1");
    assert_eq!(out.cell(1, "Result"), "-1");

    assert_eq!(out.cell(2, "URL_Length"), "");
    assert_eq!(out.cell(2, "having_IP_Address"), "");
    assert_eq!(out.cell(2, "Domain_age"), "0");

    // Columns the input lacks are written empty
    assert_eq!(out.cell(0, "Anchor_URL"), "");
}

#[test]
fn test_report_counts() {
    let (_, report) = run(SAMPLE, &DatasetOptions::default());

    assert_eq!(report.rows_processed, 3);
    assert_eq!(report.missing_columns.len(), 26);
    assert!(!report.missing_columns.contains(&FeatureKey::UrlLength));
    assert_eq!(report.null_counts.get("URL_Length"), Some(&1));
    assert_eq!(report.null_counts.get("having_IP_Address"), Some(&1));
    assert_eq!(report.null_counts.get("Anchor_URL"), Some(&3));
    assert_eq!(report.null_counts.get("Result"), None);
    assert_eq!(report.total_nulls(), 26 * 3 + 2);
    // Only the "abc" cell failed coercion; the empty ip cell is just null
    assert_eq!(report.degraded_rows, 1);
}

#[test]
fn test_fill_sentinel() {
    let options = DatasetOptions {
        fill_sentinel: true,
        ..Default::default()
    };
    let (out, report) = run(SAMPLE, &options);

    assert_eq!(out.cell(2, "URL_Length"), "-1");
    assert_eq!(out.cell(2, "having_IP_Address"), "-1");
    assert_eq!(out.cell(0, "Anchor_URL"), "-1");
    assert_eq!(out.cell(0, "URL_Length"), "1");
    // Nulls are still reported even though they were filled
    assert_eq!(report.null_counts.get("URL_Length"), Some(&1));
}

#[test]
fn test_classifier_only_and_keep_url() {
    let options = DatasetOptions {
        classifier_only: true,
        keep_url: true,
        ..Default::default()
    };
    let (out, report) = run(SAMPLE, &options);

    assert_eq!(out.headers.len(), 1 + 1 + 20 + 1);
    assert_eq!(out.headers[1], "URL");
    assert_eq!(out.headers[2], "having_IP_Address");
    assert_eq!(out.headers[21], "Google_Index");
    assert_eq!(out.cell(1, "URL"), "http://1.2.3.4/x");
    assert!(!out.headers.contains(&"SSLfinal_State".to_string()));
    assert_eq!(report.missing_columns.len(), 16);
}

#[test]
fn test_classifier_only_without_label() {
    let input = "length_url,ip\n10,0\n";
    let options = DatasetOptions {
        classifier_only: true,
        ..Default::default()
    };
    let (out, _) = run(input, &options);
    assert_eq!(out.headers.len(), 21);
    assert!(!out.headers.contains(&"Result".to_string()));
}

#[test]
fn test_canonical_column_wins_over_alias() {
    let input = "length_url,URL_Length\n100,20\n";
    let (out, _) = run(input, &DatasetOptions::default());
    assert_eq!(out.cell(0, "URL_Length"), "1");
}

#[test]
fn test_https_token_column_feeds_only_https_token() {
    let input = "url,https_token\nhttp://a.com/,1\nhttps://b.com/,0\n";
    let (out, report) = run(input, &DatasetOptions::default());

    assert_eq!(out.cell(0, "HTTPS_token"), "-1");
    assert_eq!(out.cell(1, "HTTPS_token"), "1");
    assert_eq!(out.cell(0, "SSLfinal_State"), "");
    assert!(report.missing_columns.contains(&FeatureKey::SslFinalState));
    assert!(!report.missing_columns.contains(&FeatureKey::HttpsToken));
}

#[test]
fn test_already_encoded_columns() {
    let input = "Request_URL,URL_of_Anchor,SFH,SSLfinal_State,Result\nSuspicious,Legitimate,-1,https://x.com,-1\n";
    let (out, report) = run(input, &DatasetOptions::default());

    assert_eq!(out.cell(0, "Request_URL"), "0");
    assert_eq!(out.cell(0, "Anchor_URL"), "1");
    assert_eq!(out.cell(0, "SFH"), "-1");
    assert_eq!(out.cell(0, "SSLfinal_State"), "1");
    assert_eq!(out.cell(0, "Result"), "-1");
    assert_eq!(report.degraded_rows, 0);
}

#[test]
fn test_unparsable_label_counted() {
    let input = "length_url,label\n10,unknown\n";
    let (out, report) = run(input, &DatasetOptions::default());
    assert_eq!(out.cell(0, "Result"), "");
    assert_eq!(report.null_counts.get("Result"), Some(&1));
}

#[test]
fn test_short_rows_are_tolerated() {
    let input = "length_url,ip,nb_at\n10,1\n";
    let (out, report) = run(input, &DatasetOptions::default());
    assert_eq!(out.cell(0, "having_IP_Address"), "-1");
    assert_eq!(out.cell(0, "having_At_Symbol"), "");
    assert_eq!(report.degraded_rows, 0);
}

#[test]
fn test_empty_input_is_rejected() {
    let mut buffer = Vec::new();
    let outcome = normalize_dataset("".as_bytes(), &mut buffer, &DatasetOptions::default());
    assert!(matches!(outcome, Err(CoreError::InvalidInput(_))));
}

// ============================================================================
// Ordering and File Tests
// ============================================================================

#[test]
fn test_large_dataset_keeps_input_order() {
    let mut input = String::from("length_url,nb_hyperlinks\n");
    for i in 0..500 {
        input.push_str(&format!("{},{}\n", i % 100, i % 3));
    }
    let (out, report) = run(&input, &DatasetOptions::default());

    assert_eq!(report.rows_processed, 500);
    for (i, _) in out.rows.iter().enumerate() {
        assert_eq!(out.cell(i, "index"), i.to_string());
        let expected_length = normalize_column("length_url", &(i % 100).to_string()).unwrap();
        assert_eq!(out.cell(i, "URL_Length"), expected_length.to_string());
        let expected_links = normalize_column("nb_hyperlinks", &(i % 3).to_string()).unwrap();
        assert_eq!(out.cell(i, "Links_pointing_to_page"), expected_links.to_string());
    }
}

#[test]
fn test_normalize_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("raw.csv");
    let output = dir.path().join("features.csv");
    fs::write(&input, SAMPLE).unwrap();

    let report = normalize_file(&input, &output, &DatasetOptions::default()).unwrap();
    assert_eq!(report.rows_processed, 3);

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("index,having_IP_Address,URL_Length,"));
    assert_eq!(written.lines().count(), 4);
}

#[test]
fn test_normalize_missing_file() {
    let dir = TempDir::new().unwrap();
    let outcome = normalize_file(
        &dir.path().join("absent.csv"),
        &dir.path().join("out.csv"),
        &DatasetOptions::default(),
    );
    assert!(matches!(outcome, Err(CoreError::Io(_))));
}

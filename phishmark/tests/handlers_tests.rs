use phishmark::commands::command_argument_builder;
use phishmark::config::{DEFAULT_LOG_FILTER, Settings};
use phishmark::handlers::*;
use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn matches(args: &[&str]) -> clap::ArgMatches {
    command_argument_builder()
        .try_get_matches_from(args)
        .expect("arguments should parse")
}

// ============================================================================
// Command Line Tests
// ============================================================================

#[test]
fn test_command_definition_is_valid() {
    command_argument_builder().debug_assert();
}

#[test]
fn test_subcommand_required() {
    assert!(
        command_argument_builder()
            .try_get_matches_from(["phishmark"])
            .is_err()
    );
}

#[test]
fn test_unknown_format_rejected() {
    let outcome = command_argument_builder().try_get_matches_from([
        "phishmark",
        "analyze",
        "-u",
        "https://example.com/",
        "-f",
        "xml",
    ]);
    assert!(outcome.is_err());
}

#[test]
fn test_global_flags_after_subcommand() {
    let m = matches(&["phishmark", "schema", "-q", "-c", "/tmp/phishmark.toml"]);
    assert!(m.get_flag("quiet"));
    assert_eq!(
        m.get_one::<String>("config").map(String::as_str),
        Some("/tmp/phishmark.toml")
    );
}

// ============================================================================
// Settings Tests
// ============================================================================

#[test]
fn test_settings_layering() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[fetch]
workers = 4
timeout_secs = 3
user_agent = "test-agent"

[lookup]
dns = false
whois = false

[logging]
level = "phishmark=debug"
"#
    )?;

    let settings = Settings::load(Some(file.path().to_str().unwrap()))?;
    assert_eq!(settings.log_filter(), "phishmark=debug");

    let from_file = settings.batch_options(vec![], None, false, false);
    assert_eq!(from_file.workers, 4);
    assert_eq!(from_file.timeout_secs, 3);
    assert_eq!(from_file.max_redirects, 5);
    assert_eq!(from_file.user_agent, "test-agent");

    let from_flag = settings.batch_options(vec![], Some(16), true, false);
    assert_eq!(from_flag.workers, 16);
    assert!(from_flag.offline);

    let lookup = settings.build_lookup()?;
    assert!(lookup.dns.is_none());
    assert!(lookup.whois.is_none());

    Ok(())
}

#[test]
fn test_settings_missing_explicit_file() {
    assert!(Settings::load(Some("/nonexistent/phishmark/config.toml")).is_err());
}

#[test]
fn test_settings_invalid_toml() {
    assert!(Settings::from_toml("[fetch\nworkers = ").is_err());
    assert!(Settings::from_toml("[fetch]\nworkers = \"many\"").is_err());
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.log_filter(), DEFAULT_LOG_FILTER);
    assert_eq!(
        settings.page_rank_key(Some("k".to_string())).as_deref(),
        Some("k")
    );
    assert_eq!(settings.page_rank_key(None), None);
}

// ============================================================================
// Handler Tests
// ============================================================================

#[test]
fn test_handle_normalize() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let input = dir.path().join("raw.csv");
    let output = dir.path().join("out.csv");
    fs::write(
        &input,
        "url,length_url,ip,status\nhttp://a.com/,20,0,legitimate\nhttp://1.2.3.4/,90,1,phishing\n",
    )?;

    let m = matches(&[
        "phishmark",
        "normalize",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--classifier-only",
        "--keep-url",
    ]);
    let (_, sub) = m.subcommand().unwrap();
    let report = handle_normalize(sub, true)?;

    assert_eq!(report.rows_processed, 2);
    assert_eq!(report.missing_columns.len(), 18);

    let written = fs::read_to_string(&output)?;
    let mut lines = written.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("index,URL,having_IP_Address,URL_Length"));
    assert!(header.ends_with("Google_Index,Result"));
    assert!(lines.next().unwrap().starts_with("0,http://a.com/,1,1,"));
    assert!(lines.next().unwrap().starts_with("1,http://1.2.3.4/,-1,-1,"));

    Ok(())
}

#[test]
fn test_handle_normalize_missing_input() {
    let dir = TempDir::new().unwrap();
    let m = matches(&[
        "phishmark",
        "normalize",
        "-i",
        dir.path().join("absent.csv").to_str().unwrap(),
        "-o",
        dir.path().join("out.csv").to_str().unwrap(),
    ]);
    let (_, sub) = m.subcommand().unwrap();
    let error = handle_normalize(sub, true).unwrap_err();
    assert!(format!("{:#}", error).contains("absent.csv"));
}

#[tokio::test]
async fn test_handle_batch_offline() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let input = dir.path().join("urls.txt");
    let output = dir.path().join("features.csv");
    fs::write(
        &input,
        "# test list\nhttps://www.google.com/\nhttp://192.168.1.1/login\n",
    )?;

    let m = matches(&[
        "phishmark",
        "batch",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--offline",
        "-t",
        "2",
    ]);
    let (_, sub) = m.subcommand().unwrap();
    let summary = handle_batch(sub, &Settings::default(), true).await?;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.fetch_failures, 0);

    let written = fs::read_to_string(&output)?;
    assert_eq!(written.lines().count(), 3);
    assert!(written.lines().nth(2).unwrap().starts_with("1,http://192.168.1.1/login,-1,"));

    Ok(())
}

#[tokio::test]
async fn test_handle_analyze_offline_with_lookup_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let answers = dir.path().join("lookup.json");
    let report = dir.path().join("report.json");
    fs::write(
        &answers,
        r#"{"www.example.com": {"age_days": 5000, "page_rank": 6.1, "google_indexed": true}}"#,
    )?;

    let m = matches(&[
        "phishmark",
        "analyze",
        "-u",
        "https://www.example.com/",
        "--offline",
        "--lookup-file",
        answers.to_str().unwrap(),
        "-f",
        "json",
        "-o",
        report.to_str().unwrap(),
    ]);
    let (_, sub) = m.subcommand().unwrap();
    let analysis = handle_analyze(sub, &Settings::default()).await?;

    assert!(analysis.fetch.is_none());
    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    assert_eq!(parsed["analysis"]["record"]["Domain_age"], 1);
    assert_eq!(parsed["analysis"]["record"]["Page_rank"], 1);
    assert_eq!(parsed["analysis"]["record"]["Google_Index"], 1);
    assert_eq!(parsed["analysis"]["record"]["DNS_record"], -1);

    Ok(())
}

#[test]
fn test_lookup_disabled_without_flags() {
    let m = matches(&["phishmark", "analyze", "-u", "https://example.com/"]);
    let (_, sub) = m.subcommand().unwrap();
    assert!(lookup_from_args(sub, &Settings::default()).unwrap().is_none());
}

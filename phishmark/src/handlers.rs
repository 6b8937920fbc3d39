use crate::config::Settings;
use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use phishmark_core::batch::{BatchProgressCallback, UrlAnalysis, analyze_url, execute_batch, load_urls};
use phishmark_core::dataset::{DatasetOptions, DatasetReport, normalize_file};
use phishmark_core::report::{
    BatchSummary, ReportFormat, generate_batch_summary, generate_dataset_summary,
    generate_json_report, generate_schema_listing, generate_text_report, save_feature_csv,
    save_report, summarize_batch,
};
use phishmark_scanner::{CompositeLookup, StaticLookup};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub fn print_banner() {
    eprintln!(
        "{} {}",
        "phishmark".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    eprintln!("{}", "heuristic phishing feature extraction".bright_black());
    eprintln!();
}

fn required<'a, T: Clone + Send + Sync + 'static>(args: &'a ArgMatches, id: &str) -> Result<&'a T> {
    args.get_one::<T>(id)
        .with_context(|| format!("--{} is required", id))
}

/// Lookup sources for a run: `--lookup` enables the configured services,
/// `--lookup-file` adds pre-computed answers that take precedence.
pub fn lookup_from_args(args: &ArgMatches, settings: &Settings) -> Result<Option<CompositeLookup>> {
    let live = args.get_flag("lookup");
    let file = args.get_one::<PathBuf>("lookup-file");
    if !live && file.is_none() {
        return Ok(None);
    }

    let mut lookup = if live {
        settings.build_lookup()?
    } else {
        CompositeLookup::default()
    };
    if let Some(path) = file {
        let fixed = StaticLookup::from_json_file(path)
            .with_context(|| format!("Failed to load lookup answers from {}", path.display()))?;
        info!("Loaded {} lookup answers from {}", fixed.len(), path.display());
        lookup.fixed = Some(fixed);
    }
    Ok(Some(lookup))
}

pub async fn handle_analyze(args: &ArgMatches, settings: &Settings) -> Result<UrlAnalysis> {
    let url = required::<String>(args, "url")?;
    let offline = args.get_flag("offline");
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = args.get_one::<PathBuf>("output");

    let fetcher = if offline {
        None
    } else {
        Some(settings.fetcher()?)
    };
    let lookup = lookup_from_args(args, settings)?;

    info!("Analyzing {}", url);
    let analysis = analyze_url(url, fetcher.as_ref(), lookup.as_ref()).await;

    let report = match format {
        ReportFormat::Text => generate_text_report(&analysis),
        ReportFormat::Json => generate_json_report(&analysis)?,
    };

    match output {
        Some(path) => {
            save_report(&report, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", report),
    }

    Ok(analysis)
}

pub async fn handle_batch(args: &ArgMatches, settings: &Settings, quiet: bool) -> Result<BatchSummary> {
    let input = required::<PathBuf>(args, "input")?;
    let output = required::<PathBuf>(args, "output")?;
    let offline = args.get_flag("offline");
    let classifier_only = args.get_flag("classifier-only");

    let urls = load_urls(input)
        .with_context(|| format!("Failed to load URLs from {}", input.display()))?;
    let options = settings.batch_options(
        urls,
        args.get_one::<usize>("threads").copied(),
        offline,
        !quiet,
    );
    let lookup = lookup_from_args(args, settings)?;

    if !quiet {
        println!("\n🎣 Analyzing {} URL(s)", options.urls.len());
        println!("Workers: {}", options.workers);
        println!(
            "Fetch: {}",
            if offline { "disabled (offline)" } else { "enabled" }
        );
        println!(
            "Lookups: {}\n",
            if lookup.is_some() { "enabled" } else { "disabled" }
        );
    }

    let progress_callback: Option<BatchProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| {
            println!("{}", msg);
        }))
    };

    let analyses = execute_batch(options, lookup.as_ref(), progress_callback).await?;

    save_feature_csv(&analyses, output, classifier_only)
        .with_context(|| format!("Failed to write features to {}", output.display()))?;

    let summary = summarize_batch(&analyses);
    if !quiet {
        print!("{}", generate_batch_summary(&summary));
    }
    println!(
        "{} Wrote {} rows to {}",
        "✓".green().bold(),
        analyses.len(),
        output.display().to_string().bright_white()
    );

    Ok(summary)
}

pub fn handle_normalize(args: &ArgMatches, quiet: bool) -> Result<DatasetReport> {
    let input = required::<PathBuf>(args, "input")?;
    let output = required::<PathBuf>(args, "output")?;
    let options = DatasetOptions {
        classifier_only: args.get_flag("classifier-only"),
        fill_sentinel: args.get_flag("fill-sentinel"),
        keep_url: args.get_flag("keep-url"),
    };

    let report = normalize_file(input, output, &options).with_context(|| {
        format!(
            "Failed to normalize {} into {}",
            input.display(),
            output.display()
        )
    })?;

    if !quiet {
        print!("{}", generate_dataset_summary(&report));
    }
    println!(
        "{} Normalized {} rows into {}",
        "✓".green().bold(),
        report.rows_processed,
        output.display().to_string().bright_white()
    );

    Ok(report)
}

pub fn handle_schema() {
    print!("{}", generate_schema_listing());
}

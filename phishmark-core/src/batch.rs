use crate::assemble::{Assembled, assemble, overlay};
use crate::error::{CoreError, Result};
use crate::external::{fetch_failure, fetch_features, lookup_features};
use crate::lexical::analyze_lexical;
use crate::record::PartialRecord;
use crate::structural::analyze_html;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use phishmark_scanner::{DomainLookup, FetchError, FetchResult, Fetcher, LookupResult};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};
use url::Url;

/// Options for a batch of URLs
pub struct BatchOptions {
    pub urls: Vec<String>,
    pub workers: usize,
    /// Skip fetching; only lexical keys are computed
    pub offline: bool,
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
    pub show_progress_bars: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            workers: 10,
            offline: false,
            timeout_secs: 10,
            max_redirects: 5,
            user_agent: phishmark_scanner::fetcher::DEFAULT_USER_AGENT.to_string(),
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting batch progress
pub type BatchProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// What the fetch collaborator saw for one URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchSummary {
    pub status_code: u16,
    pub final_url: String,
    pub redirect_chain: Vec<String>,
    pub response_time_ms: u128,
}

impl From<&FetchResult> for FetchSummary {
    fn from(fetch: &FetchResult) -> Self {
        Self {
            status_code: fetch.status_code,
            final_url: fetch.final_url.clone(),
            redirect_chain: fetch.redirect_chain.clone(),
            response_time_ms: fetch.response_time.as_millis(),
        }
    }
}

/// The finished analysis of one URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlAnalysis {
    pub index: usize,
    pub url: String,
    #[serde(flatten)]
    pub assembled: Assembled,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

/// Structural and redirect keys for a fetched page. Relative references
/// resolve against the URL the page was finally served from.
pub fn analyze_page(fetch: &FetchResult) -> PartialRecord {
    if !fetch.is_html() {
        debug!(
            "{} is {:?}, analyzing body as HTML anyway",
            fetch.final_url, fetch.content_type
        );
    }
    overlay(
        analyze_html(&fetch.final_url, &fetch.body),
        fetch_features(fetch),
    )
}

/// Build the record for one URL from whatever the collaborators returned.
/// `fetch` is `None` in offline mode; `lookup` is `None` when reputation
/// lookups are disabled.
pub fn build_analysis(
    index: usize,
    url: &str,
    fetch: Option<&std::result::Result<FetchResult, FetchError>>,
    lookup: Option<&LookupResult>,
) -> UrlAnalysis {
    let lexical = analyze_lexical(url);

    let (structural, fetch_summary, fetch_error) = match fetch {
        Some(Ok(page)) => (analyze_page(page), Some(FetchSummary::from(page)), None),
        Some(Err(e)) => (fetch_failure(e), None, Some(e.to_string())),
        None => (PartialRecord::new(), None, None),
    };
    let external = lookup.map(lookup_features).unwrap_or_default();

    UrlAnalysis {
        index,
        url: url.to_string(),
        assembled: assemble(lexical, structural, external),
        fetch: fetch_summary,
        fetch_error,
    }
}

/// Lexical-only analysis; no I/O.
pub fn analyze_offline(url: &str) -> UrlAnalysis {
    build_analysis(0, url, None, None)
}

/// Normalized host to query lookups with (punycode, decimal IPs expanded).
fn lookup_host(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
        .filter(|host| !host.is_empty())
}

/// Analyze a single URL, fetching it unless `fetcher` is `None`.
pub async fn analyze_url<L: DomainLookup>(
    url: &str,
    fetcher: Option<&Fetcher>,
    lookup: Option<&L>,
) -> UrlAnalysis {
    let fetch = match fetcher {
        Some(fetcher) => Some(fetcher.fetch(url).await),
        None => None,
    };
    if let Some(Err(ref e)) = fetch {
        warn!("Fetch failed for {}: {}", url, e);
    }

    let looked_up = match (lookup, lookup_host(url)) {
        (Some(lookup), Some(host)) => Some(lookup.lookup(&host).await),
        _ => None,
    };

    build_analysis(0, url, fetch.as_ref(), looked_up.as_ref())
}

/// Look every distinct host up once, `workers` at a time.
async fn lookup_hosts<L: DomainLookup + Sync>(
    urls: &[String],
    lookup: &L,
    workers: usize,
) -> HashMap<String, LookupResult> {
    let mut hosts: Vec<String> = urls.iter().filter_map(|u| lookup_host(u)).collect();
    hosts.sort();
    hosts.dedup();
    info!("Looking up {} hosts", hosts.len());

    stream::iter(hosts)
        .map(|host| async move {
            let result = lookup.lookup(&host).await;
            (host, result)
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await
}

/// Execute a batch: fetch every URL (unless offline), look hosts up, and
/// assemble one record per input URL, in input order. Per-URL failures
/// degrade that URL's record; they never drop it.
pub async fn execute_batch<L: DomainLookup + Sync>(
    options: BatchOptions,
    lookup: Option<&L>,
    progress_callback: Option<BatchProgressCallback>,
) -> Result<Vec<UrlAnalysis>> {
    let BatchOptions {
        urls,
        workers,
        offline,
        timeout_secs,
        max_redirects,
        user_agent,
        show_progress_bars,
    } = options;

    if workers == 0 {
        return Err(CoreError::InvalidInput("worker count must be at least 1".to_string()));
    }

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.set_message("Starting batch...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let fetched = if offline {
        None
    } else {
        let processed = Arc::new(AtomicUsize::new(0));
        let total = urls.len();
        let pb = progress_bar.clone();
        let fetcher = Fetcher::with_options(timeout_secs, &user_agent)?
            .with_max_redirects(max_redirects)
            .with_progress_callback(Arc::new(move |_idx: usize, _url: String| {
                let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref pb) = pb {
                    pb.set_message(format!("Fetching... {}/{} URLs", count, total));
                    pb.tick();
                }
            }));

        if let Some(ref callback) = progress_callback {
            callback(format!("Fetching {} URLs with {} workers", total, workers));
        }
        Some(fetcher.fetch_many(&urls, workers).await)
    };

    let lookups = match lookup {
        Some(lookup) => {
            if let Some(ref pb) = progress_bar {
                pb.set_message("Looking up domains...");
            }
            Some(lookup_hosts(&urls, lookup, workers).await)
        }
        None => None,
    };

    if let Some(ref pb) = progress_bar {
        pb.set_message("Extracting features...");
    }

    let analyses: Vec<UrlAnalysis> = urls
        .par_iter()
        .enumerate()
        .map(|(index, url)| {
            let fetch = fetched.as_ref().map(|pages| &pages[index]);
            let looked_up = lookups
                .as_ref()
                .and_then(|found| lookup_host(url).and_then(|host| found.get(&host)));
            build_analysis(index, url, fetch, looked_up)
        })
        .collect();

    let degraded = analyses.iter().filter(|a| a.assembled.is_degraded()).count();
    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Batch complete! {} URLs analyzed, {} degraded",
            analyses.len(),
            degraded
        ));
    }
    if let Some(ref callback) = progress_callback {
        callback(format!("Analyzed {} URLs ({} degraded)", analyses.len(), degraded));
    }

    Ok(analyses)
}

/// Read a URL list: either one URL per line (blank lines and `#` comments
/// skipped) or a CSV whose `url` column (first column otherwise) holds them.
/// Every CSV data row yields one entry, empty cells included.
pub fn load_urls(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let urls: Vec<String> = if is_csv {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let column = reader
            .headers()?
            .iter()
            .position(|h| h.eq_ignore_ascii_case("url"))
            .unwrap_or(0);
        // One URL per data row, blank or not, so output rows line up with input rows
        let mut urls = Vec::new();
        for record in reader.records() {
            urls.push(record?.get(column).unwrap_or_default().to_string());
        }
        urls
    } else {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()
    };

    if urls.is_empty() {
        return Err(CoreError::InvalidInput(format!(
            "no URLs found in {}",
            path.display()
        )));
    }
    Ok(urls)
}

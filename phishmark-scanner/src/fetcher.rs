use crate::error::{FetchError, Result};
use crate::result::FetchResult;
use futures::stream::{self, StreamExt};
use reqwest::{Client, header::LOCATION, redirect::Policy};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

pub const DEFAULT_USER_AGENT: &str = "phishmark/0.1 (+https://github.com/phishmark/phishmark)";

/// Fetch collaborator: retrieves a page, following redirects manually so the
/// chain can be reported.
pub struct Fetcher {
    client: Client,
    max_redirects: usize,
    timeout_secs: u64,
    progress_callback: Option<ProgressCallback>,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        Self::with_options(timeout_secs, DEFAULT_USER_AGENT)
    }

    pub fn with_options(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2).max(1)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            // Redirects are walked by hand in `fetch` to record the chain
            .redirect(Policy::none())
            .build()
            .map_err(|e| FetchError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_redirects: 5,
            timeout_secs,
            progress_callback: None,
        })
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Fetch a single URL. Non-2xx final responses are reported as
    /// `FetchError::HttpStatus`.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult> {
        Self::fetch_static(&self.client, url, self.max_redirects).await
    }

    /// Fetch many URLs with at most `workers` requests in flight. The returned
    /// vector is in input order regardless of completion order.
    pub async fn fetch_many(
        &self,
        urls: &[String],
        workers: usize,
    ) -> Vec<Result<FetchResult>> {
        info!("Fetching {} URLs with {} workers", urls.len(), workers);

        let client = &self.client;
        let max_redirects = self.max_redirects;
        let progress_cb = self.progress_callback.clone();

        let mut indexed: Vec<(usize, Result<FetchResult>)> = stream::iter(urls.iter().enumerate())
            .map(|(idx, url)| {
                let progress_cb = progress_cb.clone();
                async move {
                    if let Some(ref callback) = progress_cb {
                        callback(idx, url.clone());
                    }
                    let outcome = Self::fetch_static(client, url, max_redirects).await;
                    if let Err(ref e) = outcome {
                        warn!("Fetch error for {}: {}", url, e);
                    }
                    (idx, outcome)
                }
            })
            .buffer_unordered(workers.max(1))
            .collect()
            .await;

        indexed.sort_by_key(|(idx, _)| *idx);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn fetch_static(client: &Client, url: &str, max_redirects: usize) -> Result<FetchResult> {
        let mut current = Url::parse(url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        let mut result = FetchResult::new(url.to_string());

        let start = Instant::now();
        loop {
            debug!("Fetching {}", current);
            let response = client.get(current.clone()).send().await?;
            let status = response.status();

            if status.is_redirection()
                && let Some(location) = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
            {
                if result.redirect_chain.len() >= max_redirects {
                    return Err(FetchError::TooManyRedirects(max_redirects));
                }
                let next = current
                    .join(location)
                    .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", location, e)))?;
                debug!("  -> redirect {} to {}", status.as_u16(), next);
                result.redirect_chain.push(current.to_string());
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            result.status_code = status.as_u16();
            result.final_url = current.to_string();
            result.content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            result.body = response.text().await?;
            result.response_time = start.elapsed();
            return Ok(result);
        }
    }
}

// Settings file, layered under command-line flags

use anyhow::{Context, Result, bail};
use phishmark_core::BatchOptions;
use phishmark_scanner::fetcher::DEFAULT_USER_AGENT;
use phishmark_scanner::lookup::DEFAULT_WHOIS_SERVER;
use phishmark_scanner::{
    CompositeLookup, DnsLookup, Fetcher, PageRankClient, StaticLookup, WhoisClient,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/phishmark/config.toml";

/// Environment variable holding the OpenPageRank API key.
pub const PAGE_RANK_KEY_ENV: &str = "PAGE_RANK_API_KEY";

pub const DEFAULT_LOG_FILTER: &str = "phishmark=info";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub fetch: Option<FetchSettings>,
    pub lookup: Option<LookupSettings>,
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchSettings {
    pub workers: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub max_redirects: Option<usize>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupSettings {
    pub dns: Option<bool>,
    pub whois: Option<bool>,
    pub whois_server: Option<String>,
    pub timeout_secs: Option<u64>,
    pub page_rank_api_key: Option<String>,
    /// JSON file of lookup answers keyed by host
    pub static_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Settings> {
        toml::from_str(text).context("Invalid settings file")
    }

    /// Load settings from `path`, or from the default location when `path`
    /// is `None`. A missing default file is not an error.
    pub fn load(path: Option<&str>) -> Result<Settings> {
        let explicit = path.is_some();
        let path = expand_path(path.unwrap_or(DEFAULT_CONFIG_PATH));

        if !path.exists() {
            if explicit {
                bail!("Settings file {} does not exist", path.display());
            }
            debug!("No settings file at {}", path.display());
            return Ok(Settings::default());
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings = Self::from_toml(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    fn fetch_settings(&self) -> FetchSettings {
        self.fetch.clone().unwrap_or_default()
    }

    fn lookup_settings(&self) -> LookupSettings {
        self.lookup.clone().unwrap_or_default()
    }

    /// Tracing filter directive; `RUST_LOG` still takes precedence.
    pub fn log_filter(&self) -> String {
        self.logging
            .as_ref()
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }

    /// Batch options: `workers` from the command line wins over the file,
    /// which wins over the built-in defaults.
    pub fn batch_options(
        &self,
        urls: Vec<String>,
        workers: Option<usize>,
        offline: bool,
        show_progress_bars: bool,
    ) -> BatchOptions {
        let fetch = self.fetch_settings();
        let defaults = BatchOptions::default();
        BatchOptions {
            urls,
            workers: workers.or(fetch.workers).unwrap_or(defaults.workers),
            offline,
            timeout_secs: fetch.timeout_secs.unwrap_or(defaults.timeout_secs),
            max_redirects: fetch.max_redirects.unwrap_or(defaults.max_redirects),
            user_agent: fetch.user_agent.unwrap_or(defaults.user_agent),
            show_progress_bars,
        }
    }

    pub fn fetcher(&self) -> Result<Fetcher> {
        let fetch = self.fetch_settings();
        let defaults = BatchOptions::default();
        let fetcher = Fetcher::with_options(
            fetch.timeout_secs.unwrap_or(defaults.timeout_secs),
            fetch.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT),
        )?
        .with_max_redirects(fetch.max_redirects.unwrap_or(defaults.max_redirects));
        Ok(fetcher)
    }

    /// The page rank key: environment first, then the settings file.
    pub fn page_rank_key(&self, from_env: Option<String>) -> Option<String> {
        from_env
            .or_else(|| self.lookup_settings().page_rank_api_key)
            .filter(|key| !key.trim().is_empty())
    }

    /// Every lookup source the settings enable. DNS and WHOIS are on unless
    /// switched off; page rank needs an API key.
    pub fn build_lookup(&self) -> Result<CompositeLookup> {
        let settings = self.lookup_settings();
        let timeout = settings.timeout_secs.unwrap_or(10);
        let mut lookup = CompositeLookup::default();

        if let Some(ref file) = settings.static_file {
            let path = expand_path(file);
            let fixed = StaticLookup::from_json_file(&path)
                .with_context(|| format!("Failed to load lookup answers from {}", path.display()))?;
            info!("Loaded {} static lookup answers", fixed.len());
            lookup.fixed = Some(fixed);
        }
        if settings.dns.unwrap_or(true) {
            lookup.dns = Some(DnsLookup::new(timeout));
        }
        if settings.whois.unwrap_or(true) {
            let server = settings
                .whois_server
                .clone()
                .unwrap_or_else(|| DEFAULT_WHOIS_SERVER.to_string());
            lookup.whois = Some(WhoisClient::new(server, timeout));
        }
        match self.page_rank_key(std::env::var(PAGE_RANK_KEY_ENV).ok()) {
            Some(key) => lookup.page_rank = Some(PageRankClient::new(key, timeout)?),
            None => debug!("No {} set; page rank lookups disabled", PAGE_RANK_KEY_ENV),
        }

        Ok(lookup)
    }
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

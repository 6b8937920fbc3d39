// Domain reputation lookups: DNS presence, WHOIS registration data, page rank

use crate::error::LookupError;
use chrono::{DateTime, NaiveDate, Utc};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::system_conf::read_system_conf;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// What the reputation services know about a host. Every field is optional;
/// an absent field becomes the sentinel when features are assembled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    #[serde(default)]
    pub age_days: Option<i64>,
    #[serde(default)]
    pub registration_days: Option<i64>,
    #[serde(default)]
    pub registrar_matches_host: Option<bool>,
    #[serde(default)]
    pub traffic_rank: Option<u64>,
    #[serde(default)]
    pub page_rank: Option<f64>,
    #[serde(default)]
    pub dns_record_exists: Option<bool>,
    #[serde(default)]
    pub google_indexed: Option<bool>,
    #[serde(default)]
    pub inbound_links: Option<u64>,
}

impl LookupResult {
    /// Fill every field that is `None` here from `other`.
    pub fn merge(mut self, other: LookupResult) -> Self {
        self.age_days = self.age_days.or(other.age_days);
        self.registration_days = self.registration_days.or(other.registration_days);
        self.registrar_matches_host = self.registrar_matches_host.or(other.registrar_matches_host);
        self.traffic_rank = self.traffic_rank.or(other.traffic_rank);
        self.page_rank = self.page_rank.or(other.page_rank);
        self.dns_record_exists = self.dns_record_exists.or(other.dns_record_exists);
        self.google_indexed = self.google_indexed.or(other.google_indexed);
        self.inbound_links = self.inbound_links.or(other.inbound_links);
        self
    }
}

/// Registration-age / popularity collaborator.
pub trait DomainLookup {
    fn lookup(&self, host: &str) -> impl Future<Output = LookupResult> + Send;
}

// ============================================================================
// DNS
// ============================================================================

/// DNS presence through an async stub resolver. A host is present when it
/// has an address record or a name server delegation.
#[derive(Clone)]
pub struct DnsLookup {
    resolver: TokioAsyncResolver,
}

impl DnsLookup {
    /// Resolver built from the system configuration, or public defaults when
    /// that cannot be read.
    pub fn new(timeout_secs: u64) -> Self {
        let (config, mut opts) = read_system_conf().unwrap_or_else(|e| {
            debug!("System resolver configuration unavailable ({}); using defaults", e);
            (ResolverConfig::default(), ResolverOpts::default())
        });
        opts.timeout = Duration::from_secs(timeout_secs);
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }

    /// `Some(false)` only when the name server answered that no records
    /// exist; `None` when the resolver could not tell.
    pub async fn record_exists(&self, host: &str) -> Option<bool> {
        match self.resolver.lookup_ip(host).await {
            Ok(addrs) if addrs.iter().next().is_some() => return Some(true),
            Ok(_) => {}
            Err(e) if is_no_records(&e) => {}
            Err(e) => {
                debug!("Address lookup for {} failed: {}", host, e);
                return None;
            }
        }

        match self.resolver.ns_lookup(host).await {
            Ok(servers) => Some(servers.iter().next().is_some()),
            Err(e) if is_no_records(&e) => Some(false),
            Err(e) => {
                debug!("NS lookup for {} failed: {}", host, e);
                None
            }
        }
    }
}

impl fmt::Debug for DnsLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsLookup").finish_non_exhaustive()
    }
}

fn is_no_records(error: &ResolveError) -> bool {
    matches!(error.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

impl DomainLookup for DnsLookup {
    async fn lookup(&self, host: &str) -> LookupResult {
        LookupResult {
            dns_record_exists: self.record_exists(host).await,
            ..Default::default()
        }
    }
}

// ============================================================================
// WHOIS
// ============================================================================

pub const DEFAULT_WHOIS_SERVER: &str = "whois.iana.org";

/// The fields phishmark reads out of a raw WHOIS response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhoisRecord {
    pub creation: Option<DateTime<Utc>>,
    pub expiration: Option<DateTime<Utc>>,
    pub registrar: Option<String>,
    pub organization: Option<String>,
    pub referral: Option<String>,
}

impl WhoisRecord {
    pub fn parse(text: &str) -> Self {
        let mut record = WhoisRecord::default();

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.as_str() {
                "creation date" | "created" | "created on" | "registered on" => {
                    record.creation = record.creation.or_else(|| parse_whois_date(value));
                }
                "registry expiry date"
                | "registrar registration expiration date"
                | "expiration date"
                | "expiry date"
                | "paid-till" => {
                    record.expiration = record.expiration.or_else(|| parse_whois_date(value));
                }
                "registrar" => {
                    record.registrar.get_or_insert_with(|| value.to_string());
                }
                "registrant organization" | "org" | "organisation" | "organization" => {
                    record.organization.get_or_insert_with(|| value.to_string());
                }
                "refer" | "whois" => {
                    record.referral.get_or_insert_with(|| value.to_string());
                }
                _ => {}
            }
        }

        record
    }

    /// Convert into lookup fields relative to `now`.
    ///
    /// The registrar check passes when the host appears inside the registrar
    /// or organisation string. It is a weak signal and is kept as-is.
    pub fn to_lookup(&self, host: &str, now: DateTime<Utc>) -> LookupResult {
        let host = host.to_lowercase();
        let registrar_matches_host = match (&self.registrar, &self.organization) {
            (None, None) => None,
            (registrar, org) => Some(
                [registrar, org]
                    .iter()
                    .filter_map(|field| field.as_ref())
                    .any(|field| field.to_lowercase().contains(&host)),
            ),
        };

        LookupResult {
            age_days: self.creation.map(|created| (now - created).num_days()),
            registration_days: self.expiration.map(|expires| (expires - now).num_days()),
            registrar_matches_host,
            ..Default::default()
        }
    }
}

fn parse_whois_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    let date_part = value.get(..10)?;
    ["%Y-%m-%d", "%d-%m-%Y", "%Y.%m.%d", "%d.%m.%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone)]
pub struct WhoisClient {
    server: String,
    timeout: Duration,
}

impl WhoisClient {
    pub fn new(server: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            server: server.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    async fn query_server(&self, server: &str, query: &str) -> Result<String, LookupError> {
        let exchange = async {
            let mut stream = TcpStream::connect((server, 43)).await?;
            stream.write_all(format!("{}\r\n", query).as_bytes()).await?;
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).await?;
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
        };

        timeout(self.timeout, exchange)
            .await
            .map_err(|_| LookupError::Whois(format!("{} timed out", server)))?
            .map_err(LookupError::from)
    }

    /// Query the root server, then follow one referral if present.
    pub async fn query(&self, domain: &str) -> Result<WhoisRecord, LookupError> {
        let root = WhoisRecord::parse(&self.query_server(&self.server, domain).await?);
        match root.referral.as_deref() {
            Some(referral) if referral != self.server => {
                debug!("WHOIS referral for {}: {}", domain, referral);
                let text = self.query_server(referral, domain).await?;
                Ok(WhoisRecord::parse(&text))
            }
            _ => Ok(root),
        }
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new(DEFAULT_WHOIS_SERVER, 10)
    }
}

impl DomainLookup for WhoisClient {
    async fn lookup(&self, host: &str) -> LookupResult {
        let domain = host.trim_start_matches("www.");
        match self.query(domain).await {
            Ok(record) => record.to_lookup(host, Utc::now()),
            Err(e) => {
                warn!("WHOIS lookup for {} failed: {}", domain, e);
                LookupResult::default()
            }
        }
    }
}

// ============================================================================
// Page rank
// ============================================================================

pub const OPEN_PAGE_RANK_URL: &str = "https://openpagerank.com/api/v1.0/getPageRank";

#[derive(Debug, Deserialize)]
struct PageRankResponse {
    #[serde(default)]
    response: Vec<PageRankEntry>,
}

#[derive(Debug, Deserialize)]
struct PageRankEntry {
    #[serde(default)]
    page_rank_decimal: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct PageRankClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl PageRankClient {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: OPEN_PAGE_RANK_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub async fn page_rank(&self, host: &str) -> Result<Option<f64>, LookupError> {
        let response: PageRankResponse = self
            .client
            .get(&self.endpoint)
            .header("API-OPR", &self.api_key)
            .query(&[("domains[]", host)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // The service reports unknown domains with an empty string
        let rank = response.response.first().and_then(|entry| match &entry.page_rank_decimal {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        });
        Ok(rank)
    }
}

impl DomainLookup for PageRankClient {
    async fn lookup(&self, host: &str) -> LookupResult {
        match self.page_rank(host).await {
            Ok(page_rank) => LookupResult {
                page_rank,
                ..Default::default()
            },
            Err(e) => {
                warn!("Page rank lookup for {} failed: {}", host, e);
                LookupResult::default()
            }
        }
    }
}

// ============================================================================
// Static data and composition
// ============================================================================

/// Lookup answers supplied ahead of time, keyed by host.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    entries: HashMap<String, LookupResult>,
}

impl StaticLookup {
    pub fn new(entries: HashMap<String, LookupResult>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(host, result)| (host.to_lowercase(), result))
            .collect();
        Self { entries }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, LookupError> {
        let content = std::fs::read_to_string(path)?;
        let entries: HashMap<String, LookupResult> = serde_json::from_str(&content)
            .map_err(|e| LookupError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DomainLookup for StaticLookup {
    async fn lookup(&self, host: &str) -> LookupResult {
        self.entries
            .get(&host.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

/// Runs every configured source and merges their answers. Earlier sources
/// win when two report the same field.
#[derive(Debug, Clone, Default)]
pub struct CompositeLookup {
    pub fixed: Option<StaticLookup>,
    pub dns: Option<DnsLookup>,
    pub whois: Option<WhoisClient>,
    pub page_rank: Option<PageRankClient>,
}

impl CompositeLookup {
    pub fn is_empty(&self) -> bool {
        self.fixed.is_none() && self.dns.is_none() && self.whois.is_none() && self.page_rank.is_none()
    }
}

impl DomainLookup for CompositeLookup {
    async fn lookup(&self, host: &str) -> LookupResult {
        let mut merged = LookupResult::default();
        if let Some(ref fixed) = self.fixed {
            merged = merged.merge(fixed.lookup(host).await);
        }
        if let Some(ref dns) = self.dns {
            merged = merged.merge(dns.lookup(host).await);
        }
        if let Some(ref whois) = self.whois {
            merged = merged.merge(whois.lookup(host).await);
        }
        if let Some(ref page_rank) = self.page_rank {
            merged = merged.merge(page_rank.lookup(host).await);
        }
        merged
    }
}

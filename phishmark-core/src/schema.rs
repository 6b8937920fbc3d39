//! The canonical feature schema.
//!
//! Every feature key is described once, here: its canonical name, the column
//! names older datasets use for it, the analyzer stage that produces it live,
//! and the transform that turns a raw measurement into a [`Ternary`]. The live
//! analyzers and the bulk normalizer both go through [`Transform::apply`], so a
//! raw value means the same thing whichever path produced it.

use crate::record::Ternary;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Bumped whenever a threshold, alias or transform below changes.
pub const SCHEMA_VERSION: u32 = 1;

pub const FEATURE_COUNT: usize = 30;

/// Length of the classifier wire vector.
pub const CLASSIFIER_KEY_COUNT: usize = 20;

pub mod thresholds {
    use super::Bands;

    pub const URL_LENGTH_SHORT: f64 = 54.0;
    pub const URL_LENGTH_LONG: f64 = 75.0;

    pub const SHORTENING_SERVICES: &[&str] = &[
        "bit.ly",
        "tinyurl.com",
        "goo.gl",
        "t.co",
        "is.gd",
        "cli.gs",
        "ow.ly",
        "buff.ly",
        "adf.ly",
    ];

    pub const REQUEST_URL_BANDS: Bands = Bands::new(22.0, 61.0);
    pub const ANCHOR_URL_BANDS: Bands = Bands::new(31.0, 67.0);
    pub const LINKS_IN_TAGS_BANDS: Bands = Bands::new(17.0, 81.0);

    pub const DOMAIN_AGE_DAYS: f64 = 180.0;
    pub const REGISTRATION_LENGTH_DAYS: f64 = 365.0;
    pub const WEB_TRAFFIC_RANK: f64 = 100_000.0;
    pub const PAGE_RANK_MIN: f64 = 2.0;

    pub const REDIRECTS_SAFE: f64 = 1.0;
    pub const REDIRECTS_PHISHING: f64 = 4.0;

    pub const INBOUND_LINKS_SAFE: f64 = 2.0;

    /// Registration-length proxy: hosts longer than this pass.
    pub const HOST_LENGTH_PROXY: usize = 10;
}

/// Percentage bands: below `low` is legitimate, `low..=high` suspicious,
/// above `high` phishing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub low: f64,
    pub high: f64,
}

impl Bands {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn classify(&self, pct: f64) -> Ternary {
        if pct < self.low {
            Ternary::Legitimate
        } else if pct <= self.high {
            Ternary::Suspicious
        } else {
            Ternary::Phishing
        }
    }
}

/// Where a key is computed during live analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lexical,
    Structural,
    Fetch,
    External,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Lexical => "lexical",
            Stage::Structural => "structural",
            Stage::Fetch => "fetch",
            Stage::External => "external",
        }
    }
}

/// A measured value before thresholding.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl RawValue {
    /// Coerce a CSV cell. Empty cells have no value.
    pub fn from_cell(cell: &str) -> Option<RawValue> {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        match cell.to_ascii_lowercase().as_str() {
            "true" | "yes" => return Some(RawValue::Flag(true)),
            "false" | "no" => return Some(RawValue::Flag(false)),
            _ => {}
        }
        match cell.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(RawValue::Number(n)),
            Ok(_) => None,
            Err(_) => Some(RawValue::Text(cell.to_string())),
        }
    }

    fn number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<usize> for RawValue {
    fn from(n: usize) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Flag(b)
    }
}

/// Raw value → ternary rules. Each returns `None` when the raw value has the
/// wrong shape for the rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// A phishing trait flag or occurrence count: present → -1, absent → 1
    Presence,
    UrlLength,
    SubdomainCount,
    /// Scheme check on a URL, or an "uses https" flag
    Https,
    /// External-reference percentage, or a verdict word
    Ratio(Bands),
    /// A verdict word or an already-encoded ternary
    Verdict,
    DomainAgeDays,
    RegistrationDays,
    TrafficRank,
    PageRank,
    RedirectCount,
    InboundLinks,
}

impl Transform {
    pub fn apply(&self, raw: &RawValue) -> Option<Ternary> {
        use thresholds::*;

        match self {
            Transform::Presence => match raw {
                RawValue::Flag(b) => Some(Ternary::flag(*b)),
                RawValue::Number(n) => Some(Ternary::flag(*n != 0.0)),
                RawValue::Text(_) => None,
            },
            Transform::Https => match raw {
                RawValue::Text(url) => Some(if url.starts_with("https") {
                    Ternary::Legitimate
                } else {
                    Ternary::Phishing
                }),
                RawValue::Flag(b) => Some(Ternary::flag(!*b)),
                RawValue::Number(n) => Some(Ternary::flag(*n <= 0.0)),
            },
            Transform::Ratio(bands) => match raw {
                RawValue::Number(pct) => Some(bands.classify(*pct)),
                RawValue::Text(word) => Some(verdict(word)),
                RawValue::Flag(_) => None,
            },
            Transform::Verdict => match raw {
                RawValue::Text(word) => Some(verdict(word)),
                RawValue::Number(n) if n.fract() == 0.0 => Ternary::from_value(*n as i64),
                _ => None,
            },
            Transform::UrlLength => raw.number().map(|len| {
                if len < URL_LENGTH_SHORT {
                    Ternary::Legitimate
                } else if len <= URL_LENGTH_LONG {
                    Ternary::Suspicious
                } else {
                    Ternary::Phishing
                }
            }),
            // A negative count means there was no host at all
            Transform::SubdomainCount => raw.number().map(|count| {
                if count < 0.0 {
                    Ternary::Suspicious
                } else if count <= 1.0 {
                    Ternary::Legitimate
                } else if count <= 2.0 {
                    Ternary::Suspicious
                } else {
                    Ternary::Phishing
                }
            }),
            Transform::DomainAgeDays => raw.number().map(|days| {
                if days < 0.0 {
                    Ternary::Phishing
                } else if days > DOMAIN_AGE_DAYS {
                    Ternary::Legitimate
                } else {
                    Ternary::Suspicious
                }
            }),
            Transform::RegistrationDays => raw
                .number()
                .map(|days| Ternary::flag(days < REGISTRATION_LENGTH_DAYS)),
            Transform::TrafficRank => raw.number().map(|rank| {
                if rank < WEB_TRAFFIC_RANK {
                    Ternary::Legitimate
                } else {
                    Ternary::Suspicious
                }
            }),
            Transform::PageRank => raw.number().map(|rank| Ternary::flag(rank < PAGE_RANK_MIN)),
            Transform::RedirectCount => raw.number().map(|hops| {
                if hops <= REDIRECTS_SAFE {
                    Ternary::Legitimate
                } else if hops < REDIRECTS_PHISHING {
                    Ternary::Suspicious
                } else {
                    Ternary::Phishing
                }
            }),
            Transform::InboundLinks => raw.number().map(|links| {
                if links <= 0.0 {
                    Ternary::Phishing
                } else if links < INBOUND_LINKS_SAFE {
                    Ternary::Suspicious
                } else {
                    Ternary::Legitimate
                }
            }),
        }
    }
}

/// Dataset verdict words. Anything but the two known words counts as phishing.
fn verdict(word: &str) -> Ternary {
    match word.trim().to_ascii_lowercase().as_str() {
        "legitimate" => Ternary::Legitimate,
        "suspicious" => Ternary::Suspicious,
        _ => Ternary::Phishing,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKey {
    HavingIpAddress,
    UrlLength,
    ShortiningService,
    HavingAtSymbol,
    DoubleSlashRedirecting,
    PrefixSuffix,
    HavingSubDomain,
    DomainRegisterationLength,
    Favicon,
    Port,
    HttpsToken,
    RequestUrl,
    AnchorUrl,
    LinksInTags,
    AbnormalUrl,
    DomainAge,
    DnsRecord,
    WebsiteTraffic,
    PageRank,
    GoogleIndex,
    SslFinalState,
    Sfh,
    SubmittingToEmail,
    Redirect,
    OnMouseover,
    RightClick,
    PopUpWindow,
    Iframe,
    LinksPointingToPage,
    StatisticalReport,
}

/// Schema entry for one key.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSpec {
    pub key: FeatureKey,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub stage: Stage,
    pub transform: Transform,
}

const fn spec(
    key: FeatureKey,
    name: &'static str,
    aliases: &'static [&'static str],
    stage: Stage,
    transform: Transform,
) -> FeatureSpec {
    FeatureSpec {
        key,
        name,
        aliases,
        stage,
        transform,
    }
}

/// The schema table, in canonical order. The first [`CLASSIFIER_KEY_COUNT`]
/// entries are the classifier wire vector.
#[rustfmt::skip]
pub const SCHEMA: [FeatureSpec; FEATURE_COUNT] = {
    use FeatureKey as K;
    use Stage::*;
    use Transform as T;
    use thresholds::*;
    [
        spec(K::HavingIpAddress, "having_IP_Address", &["having_IPhaving_IP_Address", "ip"], Lexical, T::Presence),
        spec(K::UrlLength, "URL_Length", &["URLURL_Length", "length_url"], Lexical, T::UrlLength),
        spec(K::ShortiningService, "Shortining_Service", &["shortening_service"], Lexical, T::Presence),
        spec(K::HavingAtSymbol, "having_At_Symbol", &["nb_at"], Lexical, T::Presence),
        spec(K::DoubleSlashRedirecting, "double_slash_redirecting", &["nb_dslash"], Lexical, T::Presence),
        spec(K::PrefixSuffix, "Prefix_Suffix", &[], Lexical, T::Presence),
        spec(K::HavingSubDomain, "having_Sub_Domain", &["nb_subdomains"], Lexical, T::SubdomainCount),
        spec(K::DomainRegisterationLength, "Domain_Registeration_Length", &["domain_registration_length"], Lexical, T::RegistrationDays),
        spec(K::Favicon, "Favicon", &["external_favicon"], Lexical, T::Presence),
        spec(K::Port, "Port", &[], Lexical, T::Presence),
        spec(K::HttpsToken, "HTTPS_token", &[], Lexical, T::Presence),
        spec(K::RequestUrl, "Request_URL", &[], Structural, T::Ratio(REQUEST_URL_BANDS)),
        spec(K::AnchorUrl, "Anchor_URL", &["URL_of_Anchor"], Structural, T::Ratio(ANCHOR_URL_BANDS)),
        spec(K::LinksInTags, "Links_in_Tags", &[], Structural, T::Ratio(LINKS_IN_TAGS_BANDS)),
        spec(K::AbnormalUrl, "Abnormal_URL", &["abnormal_subdomain"], External, T::Presence),
        spec(K::DomainAge, "Domain_age", &["age_of_domain"], External, T::DomainAgeDays),
        spec(K::DnsRecord, "DNS_record", &["DNSRecord"], External, T::Presence),
        spec(K::WebsiteTraffic, "Website_traffic", &["web_traffic"], External, T::TrafficRank),
        spec(K::PageRank, "Page_rank", &[], External, T::PageRank),
        spec(K::GoogleIndex, "Google_Index", &[], External, T::Presence),
        spec(K::SslFinalState, "SSLfinal_State", &[], Lexical, T::Https),
        spec(K::Sfh, "SFH", &[], Structural, T::Verdict),
        spec(K::SubmittingToEmail, "Submitting_to_email", &["submit_email"], Structural, T::Presence),
        spec(K::Redirect, "Redirect", &["nb_redirection"], Fetch, T::RedirectCount),
        spec(K::OnMouseover, "on_mouseover", &["onmouseover"], Structural, T::Presence),
        spec(K::RightClick, "RightClick", &["right_clic"], Structural, T::Presence),
        spec(K::PopUpWindow, "popUpWidnow", &["popup_window"], Structural, T::Presence),
        spec(K::Iframe, "Iframe", &[], Structural, T::Presence),
        spec(K::LinksPointingToPage, "Links_pointing_to_page", &["nb_hyperlinks"], External, T::InboundLinks),
        spec(K::StatisticalReport, "Statistical_report", &[], External, T::Presence),
    ]
};

impl FeatureKey {
    pub const ALL: [FeatureKey; FEATURE_COUNT] = {
        let mut keys = [FeatureKey::HavingIpAddress; FEATURE_COUNT];
        let mut i = 0;
        while i < FEATURE_COUNT {
            keys[i] = SCHEMA[i].key;
            i += 1;
        }
        keys
    };

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static FeatureSpec {
        &SCHEMA[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn stage(self) -> Stage {
        self.spec().stage
    }

    pub fn is_classifier_key(self) -> bool {
        self.index() < CLASSIFIER_KEY_COUNT
    }

    pub fn classifier_keys() -> &'static [FeatureKey] {
        &Self::ALL[..CLASSIFIER_KEY_COUNT]
    }

    pub fn keys_for_stage(stage: Stage) -> impl Iterator<Item = FeatureKey> {
        Self::ALL.into_iter().filter(move |key| key.stage() == stage)
    }

    /// Exact canonical name lookup.
    pub fn from_name(name: &str) -> Option<FeatureKey> {
        SCHEMA.iter().find(|spec| spec.name == name).map(|spec| spec.key)
    }

    /// Resolve a dataset column: canonical name or any alias, ignoring case.
    pub fn from_column(column: &str) -> Option<FeatureKey> {
        let column = column.trim();
        SCHEMA
            .iter()
            .find(|spec| {
                spec.name.eq_ignore_ascii_case(column)
                    || spec.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(column))
            })
            .map(|spec| spec.key)
    }

    /// Threshold a raw measurement with this key's transform.
    pub fn normalize(self, raw: &RawValue) -> Option<Ternary> {
        self.spec().transform.apply(raw)
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for FeatureKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for FeatureKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        FeatureKey::from_column(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown feature key {}", name)))
    }
}

/// Normalize one dataset cell. `None` when the column is not part of the
/// schema or the cell cannot be coerced to what the key expects.
pub fn normalize_column(column: &str, cell: &str) -> Option<Ternary> {
    let key = FeatureKey::from_column(column)?;
    let raw = RawValue::from_cell(cell)?;
    key.normalize(&raw)
}

/// Dataset ground-truth label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Phishing,
    Suspicious,
    Legitimate,
}

pub const LABEL_COLUMN: &str = "Result";
pub const LABEL_ALIASES: &[&str] = &["Result", "status", "label"];

impl Label {
    pub fn from_cell(cell: &str) -> Option<Label> {
        match cell.trim().to_ascii_lowercase().as_str() {
            "phishing" | "-1" => Some(Label::Phishing),
            "suspicious" | "malicious" | "0" => Some(Label::Suspicious),
            "legitimate" | "legit" | "1" => Some(Label::Legitimate),
            _ => None,
        }
    }

    pub fn as_ternary(self) -> Ternary {
        match self {
            Label::Phishing => Ternary::Phishing,
            Label::Suspicious => Ternary::Suspicious,
            Label::Legitimate => Ternary::Legitimate,
        }
    }

    pub fn from_ternary(value: Ternary) -> Label {
        match value {
            Ternary::Phishing => Label::Phishing,
            Ternary::Suspicious => Label::Suspicious,
            Ternary::Legitimate => Label::Legitimate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Phishing => "phishing",
            Label::Suspicious => "suspicious",
            Label::Legitimate => "legitimate",
        }
    }

    pub fn is_label_column(column: &str) -> bool {
        LABEL_ALIASES
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(column.trim()))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

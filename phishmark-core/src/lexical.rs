use crate::domain::is_ipv4_literal;
use crate::record::{FallbackReason, PartialRecord, Ternary};
use crate::schema::{FeatureKey, RawValue, Stage, thresholds};
use tracing::debug;

/// Read-only decomposition of a URL string, split the way it was written.
///
/// Nothing is normalized: the host is the authority minus userinfo and port,
/// so `http://0xC0A80101/` keeps its hex host. Strings without `scheme://`
/// have an empty authority and host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlComponents {
    pub scheme: String,
    /// Authority exactly as written: userinfo, host and any explicit port
    pub netloc: String,
    /// Lowercased host, brackets kept for IPv6 literals
    pub host: String,
    /// Explicit port, when it is a valid port number
    pub port: Option<u16>,
    /// Port text that is present but not a valid port number
    pub invalid_port: Option<String>,
    pub path: String,
    pub query: Option<String>,
}

impl UrlComponents {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (scheme, rest) = match raw.split_once(':') {
            Some((scheme, rest)) if is_scheme(scheme) => (scheme.to_ascii_lowercase(), rest),
            _ => (String::new(), raw),
        };

        let (netloc, rest) = match rest.strip_prefix("//") {
            Some(after) => after.split_at(after.find(['/', '?', '#']).unwrap_or(after.len())),
            None => ("", rest),
        };
        let rest = rest.find('#').map_or(rest, |end| &rest[..end]);
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };

        let (host, port_text) = split_authority(netloc);
        let (port, invalid_port) = match port_text {
            None | Some("") => (None, None),
            Some(text) => match text.parse::<u16>() {
                Ok(port) => (Some(port), None),
                Err(_) => (None, Some(text.to_string())),
            },
        };

        Self {
            scheme,
            netloc: netloc.to_string(),
            host,
            port,
            invalid_port,
            path: path.to_string(),
            query,
        }
    }

    /// Host labels beyond the registrable pair; -1 when there is no host.
    pub fn subdomain_count(&self) -> i64 {
        if self.host.is_empty() {
            return -1;
        }
        let labels = self.host.split('.').filter(|l| !l.is_empty()).count() as i64;
        (labels - 2).max(0)
    }
}

fn is_scheme(candidate: &str) -> bool {
    candidate.starts_with(|c: char| c.is_ascii_alphabetic())
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Host and raw port text of an authority.
fn split_authority(netloc: &str) -> (String, Option<&str>) {
    let host_port = netloc.rsplit_once('@').map_or(netloc, |(_, host_port)| host_port);

    if let Some(inner) = host_port.strip_prefix('[') {
        return match inner.split_once(']') {
            Some((address, after)) => (
                format!("[{}]", address.to_ascii_lowercase()),
                after.strip_prefix(':'),
            ),
            None => (host_port.to_ascii_lowercase(), None),
        };
    }

    match host_port.split_once(':') {
        Some((host, port)) => (host.to_ascii_lowercase(), Some(port)),
        None => (host_port.to_ascii_lowercase(), None),
    }
}

pub fn is_shortening_service(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    thresholds::SHORTENING_SERVICES
        .iter()
        .any(|service| host.contains(service))
}

/// Compute every lexical key for `url`. Never fails: a sub-check that cannot
/// be computed falls back to the sentinel for its own key only.
pub fn analyze_lexical(url: &str) -> PartialRecord {
    let mut record = PartialRecord::new();

    if url.trim().is_empty() {
        for key in FeatureKey::keys_for_stage(Stage::Lexical) {
            record.fall_back(key, FallbackReason::ParseFailure, "empty URL");
        }
        return record;
    }

    // These only need the raw string
    let length = url.chars().count();
    record.set_measured(FeatureKey::UrlLength, &length.into());
    record.set_measured(FeatureKey::HavingAtSymbol, &url.contains('@').into());
    record.set_measured(FeatureKey::SslFinalState, &RawValue::Text(url.trim().to_string()));

    let components = UrlComponents::parse(url);
    if components.netloc.is_empty() {
        debug!("No authority in {}", url);
    }

    let host = components.host.as_str();
    record.set_measured(FeatureKey::HavingIpAddress, &is_ipv4_literal(host).into());
    record.set_measured(FeatureKey::ShortiningService, &is_shortening_service(host).into());
    record.set_measured(
        FeatureKey::DoubleSlashRedirecting,
        &components.path.contains("//").into(),
    );
    record.set_measured(FeatureKey::PrefixSuffix, &components.netloc.contains('-').into());
    record.set_measured(
        FeatureKey::HavingSubDomain,
        &RawValue::Number(components.subdomain_count() as f64),
    );

    // Proxies until WHOIS data replaces them
    record.set(
        FeatureKey::DomainRegisterationLength,
        Ternary::flag(components.netloc.chars().count() <= thresholds::HOST_LENGTH_PROXY),
    );
    let favicon_local = !components.netloc.is_empty()
        && url
            .to_lowercase()
            .contains(&components.netloc.to_lowercase());
    record.set_measured(FeatureKey::Favicon, &(!favicon_local).into());

    match &components.invalid_port {
        Some(port) => {
            debug!("Invalid port '{}' in {}", port, url);
            record.fall_back(
                FeatureKey::Port,
                FallbackReason::ParseFailure,
                format!("invalid port '{}'", port),
            );
        }
        None => {
            let odd_port = components.port.is_some_and(|p| p != 80 && p != 443);
            record.set_measured(FeatureKey::Port, &odd_port.into());
        }
    }
    record.set_measured(FeatureKey::HttpsToken, &host.contains("http").into());

    record
}

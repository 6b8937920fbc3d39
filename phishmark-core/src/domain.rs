// Host comparison helpers shared by the analyzers

use std::net::Ipv4Addr;
use url::Url;

/// True for a dotted-quad IPv4 literal. Hosts that merely start with one
/// (`192.168.1.1-login.example.com`) do not count.
pub fn is_ipv4_literal(host: &str) -> bool {
    let parts: Vec<&str> = host.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.len() <= 3 && p.bytes().all(|b| b.is_ascii_digit()))
        && host.parse::<Ipv4Addr>().is_ok()
}

/// The registrable label of a host: `login.paypal.co.uk` → `paypal`.
///
/// IP literals and hosts without a known public suffix are returned as-is
/// (lowercased), so they only ever match themselves.
pub fn registrable_label(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() || is_ipv4_literal(&host) || host.starts_with('[') {
        return host;
    }

    let Some(domain) = psl::domain_str(&host) else {
        return host;
    };
    match psl::suffix_str(domain) {
        Some(suffix) if domain.len() > suffix.len() => {
            domain[..domain.len() - suffix.len() - 1].to_string()
        }
        _ => domain.to_string(),
    }
}

/// Whether `reference` points outside the page's registrable domain.
/// References without a host (`mailto:`, `javascript:`, `data:`) are internal.
pub fn is_external(page_label: &str, reference: &Url) -> bool {
    match reference.host_str() {
        Some(host) => registrable_label(host) != page_label,
        None => false,
    }
}

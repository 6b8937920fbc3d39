// Tests for the URL lexical analyzer

use phishmark_core::lexical::{UrlComponents, analyze_lexical, is_shortening_service};
use phishmark_core::record::{FallbackReason, Ternary};
use phishmark_core::schema::{FeatureKey, normalize_column};

fn url_of_length(len: usize) -> String {
    let base = "http://example.com/";
    format!("{}{}", base, "a".repeat(len - base.len()))
}

// ============================================================================
// Whole-record Tests
// ============================================================================

#[test]
fn test_plain_https_url_is_legitimate() {
    let record = analyze_lexical("https://www.google.com/");

    for key in [
        FeatureKey::HavingIpAddress,
        FeatureKey::UrlLength,
        FeatureKey::ShortiningService,
        FeatureKey::HavingAtSymbol,
        FeatureKey::DoubleSlashRedirecting,
        FeatureKey::PrefixSuffix,
        FeatureKey::HavingSubDomain,
        FeatureKey::DomainRegisterationLength,
        FeatureKey::Favicon,
        FeatureKey::Port,
        FeatureKey::HttpsToken,
        FeatureKey::SslFinalState,
    ] {
        assert_eq!(record.get(key), Some(Ternary::Legitimate), "{}", key);
    }
    assert!(record.fallbacks().is_empty());
}

#[test]
fn test_lexical_keys_only() {
    let record = analyze_lexical("https://www.google.com/");
    assert_eq!(record.len(), 12);
    assert!(!record.contains(FeatureKey::RequestUrl));
    assert!(!record.contains(FeatureKey::DomainAge));
}

// ============================================================================
// Individual Sub-check Tests
// ============================================================================

#[test]
fn test_ip_address_host() {
    let record = analyze_lexical("http://192.168.1.1/login");
    assert_eq!(record.get(FeatureKey::HavingIpAddress), Some(Ternary::Phishing));
}

#[test]
fn test_ip_prefixed_hostname_is_not_an_ip() {
    let record = analyze_lexical("http://192.168.1.1-login.verify.com/a//b");

    assert_eq!(record.get(FeatureKey::HavingIpAddress), Some(Ternary::Legitimate));
    assert_eq!(record.get(FeatureKey::PrefixSuffix), Some(Ternary::Phishing));
    assert_eq!(record.get(FeatureKey::DoubleSlashRedirecting), Some(Ternary::Phishing));
    assert_eq!(record.get(FeatureKey::HavingSubDomain), Some(Ternary::Phishing));
}

#[test]
fn test_url_length_boundaries() {
    let cases = [
        (53, Ternary::Legitimate),
        (54, Ternary::Suspicious),
        (75, Ternary::Suspicious),
        (76, Ternary::Phishing),
    ];
    for (len, expected) in cases {
        let url = url_of_length(len);
        assert_eq!(url.chars().count(), len);
        let record = analyze_lexical(&url);
        assert_eq!(record.get(FeatureKey::UrlLength), Some(expected), "length {}", len);
    }
}

#[test]
fn test_url_length_counts_characters() {
    // 19 ASCII bytes + 35 two-byte chars = 54 chars, 89 bytes
    let url = format!("http://example.com/{}", "é".repeat(35));
    let record = analyze_lexical(&url);
    assert_eq!(record.get(FeatureKey::UrlLength), Some(Ternary::Suspicious));
}

#[test]
fn test_shortening_services() {
    assert!(is_shortening_service("bit.ly"));
    assert!(is_shortening_service("TinyURL.com"));
    assert!(!is_shortening_service("example.com"));

    let record = analyze_lexical("http://bit.ly/3xYz");
    assert_eq!(record.get(FeatureKey::ShortiningService), Some(Ternary::Phishing));
}

#[test]
fn test_at_symbol() {
    let record = analyze_lexical("http://paypal.com@evil.example/login");
    assert_eq!(record.get(FeatureKey::HavingAtSymbol), Some(Ternary::Phishing));
}

#[test]
fn test_subdomain_counts() {
    let cases = [
        ("http://example.com/", Ternary::Legitimate),
        ("http://www.example.com/", Ternary::Legitimate),
        ("http://a.b.example.com/", Ternary::Suspicious),
        ("http://a.b.c.example.com/", Ternary::Phishing),
        ("http://localhost/", Ternary::Legitimate),
    ];
    for (url, expected) in cases {
        let record = analyze_lexical(url);
        assert_eq!(record.get(FeatureKey::HavingSubDomain), Some(expected), "{}", url);
    }
}

#[test]
fn test_empty_host_subdomain_is_suspicious() {
    let record = analyze_lexical("file:///etc/passwd");
    assert_eq!(record.get(FeatureKey::HavingSubDomain), Some(Ternary::Suspicious));
}

#[test]
fn test_ssl_state_from_scheme() {
    let record = analyze_lexical("http://example.com/");
    assert_eq!(record.get(FeatureKey::SslFinalState), Some(Ternary::Phishing));
}

#[test]
fn test_nonstandard_port() {
    let record = analyze_lexical("http://example.com:8080/");
    assert_eq!(record.get(FeatureKey::Port), Some(Ternary::Phishing));

    let record = analyze_lexical("http://example.com:443/");
    assert_eq!(record.get(FeatureKey::Port), Some(Ternary::Legitimate));

    let record = analyze_lexical("https://example.com:443/");
    assert_eq!(record.get(FeatureKey::Port), Some(Ternary::Legitimate));
}

#[test]
fn test_https_token_in_host() {
    let record = analyze_lexical("http://https-paypal.com/");
    assert_eq!(record.get(FeatureKey::HttpsToken), Some(Ternary::Phishing));
}

#[test]
fn test_short_netloc_registration_proxy() {
    let record = analyze_lexical("http://a.io/");
    assert_eq!(
        record.get(FeatureKey::DomainRegisterationLength),
        Some(Ternary::Phishing)
    );
}

// ============================================================================
// Parse Failure Tests
// ============================================================================

#[test]
fn test_bad_port_only_sentinels_port() {
    let record = analyze_lexical("http://example.com:abc/");

    assert_eq!(record.get(FeatureKey::Port), Some(Ternary::SENTINEL));
    assert_eq!(record.fallbacks().len(), 1);
    assert_eq!(record.fallbacks()[0].key, FeatureKey::Port);
    assert_eq!(record.fallbacks()[0].reason, FallbackReason::ParseFailure);

    for key in [
        FeatureKey::HavingIpAddress,
        FeatureKey::ShortiningService,
        FeatureKey::PrefixSuffix,
        FeatureKey::HavingSubDomain,
        FeatureKey::HttpsToken,
    ] {
        assert_eq!(record.get(key), Some(Ternary::Legitimate), "{}", key);
    }
}

#[test]
fn test_out_of_range_port_falls_back() {
    let record = analyze_lexical("http://example.com:99999/");
    assert_eq!(record.get(FeatureKey::Port), Some(Ternary::SENTINEL));
    assert!(
        record
            .fallbacks()
            .iter()
            .any(|f| f.key == FeatureKey::Port && f.reason == FallbackReason::ParseFailure)
    );
    assert_eq!(record.get(FeatureKey::HavingIpAddress), Some(Ternary::Legitimate));
}

#[test]
fn test_schemeless_url_has_empty_host() {
    let record = analyze_lexical("www.example.com/login");

    assert!(record.fallbacks().is_empty());
    assert_eq!(record.len(), 12);
    assert_eq!(record.get(FeatureKey::HavingSubDomain), Some(Ternary::Suspicious));
    assert_eq!(record.get(FeatureKey::HavingIpAddress), Some(Ternary::Legitimate));
    assert_eq!(record.get(FeatureKey::ShortiningService), Some(Ternary::Legitimate));
    assert_eq!(record.get(FeatureKey::Port), Some(Ternary::Legitimate));
    assert_eq!(record.get(FeatureKey::SslFinalState), Some(Ternary::Phishing));
    assert_eq!(
        record.get(FeatureKey::DomainRegisterationLength),
        Some(Ternary::Phishing)
    );
}

#[test]
fn test_garbage_keeps_string_keys() {
    let record = analyze_lexical("not a url");

    assert_eq!(record.get(FeatureKey::UrlLength), Some(Ternary::Legitimate));
    assert_eq!(record.get(FeatureKey::HavingAtSymbol), Some(Ternary::Legitimate));
    assert_eq!(record.get(FeatureKey::SslFinalState), Some(Ternary::Phishing));
    assert_eq!(record.get(FeatureKey::HavingSubDomain), Some(Ternary::Suspicious));
}

#[test]
fn test_empty_url_is_all_sentinel() {
    let record = analyze_lexical("   ");

    assert_eq!(record.len(), 12);
    assert!(record.iter().all(|(_, value)| value == Ternary::SENTINEL));
    assert_eq!(record.fallbacks().len(), 12);
    assert!(
        record
            .fallbacks()
            .iter()
            .all(|f| f.reason == FallbackReason::ParseFailure)
    );
}

#[test]
fn test_numeric_host_forms_are_not_dotted_quads() {
    for url in ["http://3232235777/", "http://0xC0A80101/", "http://0300.0250.1.1/"] {
        let record = analyze_lexical(url);
        assert_eq!(
            record.get(FeatureKey::HavingIpAddress),
            Some(Ternary::Legitimate),
            "{}",
            url
        );
    }
}

#[test]
fn test_components() {
    let c = UrlComponents::parse("https://user@Login.Example.com:8443/a/b?x=1#top");
    assert_eq!(c.scheme, "https");
    assert_eq!(c.netloc, "user@Login.Example.com:8443");
    assert_eq!(c.host, "login.example.com");
    assert_eq!(c.port, Some(8443));
    assert_eq!(c.invalid_port, None);
    assert_eq!(c.path, "/a/b");
    assert_eq!(c.query.as_deref(), Some("x=1"));
}

#[test]
fn test_components_without_authority() {
    let c = UrlComponents::parse("www.example.com/login?next=/home");
    assert_eq!(c.scheme, "");
    assert_eq!(c.netloc, "");
    assert_eq!(c.host, "");
    assert_eq!(c.path, "www.example.com/login");
    assert_eq!(c.query.as_deref(), Some("next=/home"));

    let c = UrlComponents::parse("http://example.com:abc/");
    assert_eq!(c.host, "example.com");
    assert_eq!(c.port, None);
    assert_eq!(c.invalid_port.as_deref(), Some("abc"));
}

// ============================================================================
// Live / Bulk Agreement Tests
// ============================================================================

#[test]
fn test_dataset_columns_agree_with_live_analyzer() {
    let medium = url_of_length(60);
    let long = url_of_length(90);
    let urls = [
        "https://www.google.com/",
        "http://192.168.1.1/login",
        "http://a.b.c.secure-login.example.com/verify//account?id=1",
        "http://user@bit.ly/abc",
        medium.as_str(),
        long.as_str(),
    ];

    for url in urls {
        let live = analyze_lexical(url);
        let c = UrlComponents::parse(url);
        let host_labels = c.host.split('.').count() as i64;

        let raw = [
            (FeatureKey::UrlLength, "length_url", url.chars().count().to_string()),
            (FeatureKey::HavingAtSymbol, "nb_at", url.matches('@').count().to_string()),
            (
                FeatureKey::HavingIpAddress,
                "ip",
                if c.host.parse::<std::net::Ipv4Addr>().is_ok() { "1" } else { "0" }.to_string(),
            ),
            (
                FeatureKey::PrefixSuffix,
                "prefix_suffix",
                if c.netloc.contains('-') { "1" } else { "0" }.to_string(),
            ),
            (
                FeatureKey::HavingSubDomain,
                "nb_subdomains",
                (host_labels - 2).max(0).to_string(),
            ),
            (
                FeatureKey::ShortiningService,
                "shortening_service",
                if is_shortening_service(&c.host) { "1" } else { "0" }.to_string(),
            ),
        ];

        for (key, column, cell) in raw {
            assert_eq!(
                normalize_column(column, &cell),
                live.get(key),
                "{} / {} = {}",
                url,
                column,
                cell
            );
        }
    }
}

// Mapping of fetch and reputation-service results onto feature keys

use crate::record::{FallbackReason, PartialRecord, Ternary};
use crate::schema::{FeatureKey, RawValue, Stage};
use phishmark_scanner::{FetchError, FetchResult, LookupResult};

/// Keys taken from a lookup result. Fields the services did not answer are
/// left unset so earlier estimates (or the sentinel) stand.
pub fn lookup_features(lookup: &LookupResult) -> PartialRecord {
    let mut record = PartialRecord::new();

    if let Some(days) = lookup.age_days {
        record.set_measured(FeatureKey::DomainAge, &RawValue::Number(days as f64));
    }
    if let Some(days) = lookup.registration_days {
        record.set_measured(
            FeatureKey::DomainRegisterationLength,
            &RawValue::Number(days as f64),
        );
    }
    if let Some(matches) = lookup.registrar_matches_host {
        record.set(FeatureKey::AbnormalUrl, Ternary::flag(!matches));
    }
    if let Some(exists) = lookup.dns_record_exists {
        record.set(FeatureKey::DnsRecord, Ternary::flag(!exists));
    }
    if let Some(rank) = lookup.traffic_rank {
        record.set_measured(FeatureKey::WebsiteTraffic, &RawValue::Number(rank as f64));
    }
    if let Some(rank) = lookup.page_rank {
        record.set_measured(FeatureKey::PageRank, &RawValue::Number(rank));
    }
    if let Some(indexed) = lookup.google_indexed {
        record.set(FeatureKey::GoogleIndex, Ternary::flag(!indexed));
    }
    if let Some(links) = lookup.inbound_links {
        record.set_measured(
            FeatureKey::LinksPointingToPage,
            &RawValue::Number(links as f64),
        );
    }

    record
}

/// The Redirect key from a completed fetch.
pub fn fetch_features(fetch: &FetchResult) -> PartialRecord {
    let mut record = PartialRecord::new();
    record.set_measured(FeatureKey::Redirect, &fetch.redirect_count().into());
    record
}

/// Sentinel every page-derived key after a failed fetch.
pub fn fetch_failure(error: &FetchError) -> PartialRecord {
    let mut record = PartialRecord::new();
    let detail = error.to_string();
    let page_keys = FeatureKey::keys_for_stage(Stage::Structural)
        .chain(FeatureKey::keys_for_stage(Stage::Fetch));
    for key in page_keys {
        record.fall_back(key, FallbackReason::FetchFailure, detail.clone());
    }
    record
}

use crate::record::{Fallback, FallbackReason, FeatureRecord, PartialRecord};
use crate::schema::FeatureKey;
use serde::Serialize;

/// A complete record plus what went into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembled {
    pub record: FeatureRecord,
    /// Keys no source produced; they hold the sentinel.
    pub missing: Vec<FeatureKey>,
    /// Every key holding the sentinel because something failed, in schema order.
    pub fallbacks: Vec<Fallback>,
}

impl Assembled {
    pub fn is_degraded(&self) -> bool {
        !self.fallbacks.is_empty()
    }

    pub fn fallback_for(&self, key: FeatureKey) -> Option<&Fallback> {
        self.fallbacks.iter().find(|f| f.key == key)
    }
}

/// Lay `upper` over `lower`. Keys `upper` defines replace those in `lower`,
/// together with any fallback `lower` recorded for them.
pub fn overlay(lower: PartialRecord, upper: PartialRecord) -> PartialRecord {
    let (upper_values, upper_fallbacks) = upper.into_parts();
    let (lower_values, lower_fallbacks) = lower.into_parts();

    let mut merged = PartialRecord::new();
    for fallback in lower_fallbacks
        .into_iter()
        .filter(|f| !upper_values.contains_key(&f.key))
        .chain(upper_fallbacks)
    {
        merged.fall_back(fallback.key, fallback.reason, fallback.detail);
    }
    for (key, value) in lower_values.into_iter().chain(upper_values) {
        merged.set(key, value);
    }
    merged
}

/// Merge the three analyzer outputs into one record. Structural values
/// override lexical ones and external values override both. Keys none of
/// them produced become the sentinel and are reported as missing.
pub fn assemble(
    lexical: PartialRecord,
    structural: PartialRecord,
    external: PartialRecord,
) -> Assembled {
    let merged = overlay(overlay(lexical, structural), external);

    let mut record = FeatureRecord::sentinel();
    let mut missing = Vec::new();
    for key in FeatureKey::ALL {
        match merged.get(key) {
            Some(value) => record.set(key, value),
            None => missing.push(key),
        }
    }

    let (_, mut fallbacks) = merged.into_parts();
    fallbacks.extend(missing.iter().map(|key| Fallback {
        key: *key,
        reason: FallbackReason::NotComputed,
        detail: "no source produced this key".to_string(),
    }));
    fallbacks.sort_by_key(|f| f.key);

    Assembled {
        record,
        missing,
        fallbacks,
    }
}

// Feature values, partial records and the finished, ordered feature record

use crate::schema::{CLASSIFIER_KEY_COUNT, FEATURE_COUNT, FeatureKey, RawValue};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A heuristic signal: -1 phishing, 0 suspicious, 1 legitimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ternary {
    Phishing,
    Suspicious,
    Legitimate,
}

impl Ternary {
    /// Value used for anything that could not be computed.
    pub const SENTINEL: Ternary = Ternary::Phishing;

    pub fn value(self) -> i8 {
        match self {
            Ternary::Phishing => -1,
            Ternary::Suspicious => 0,
            Ternary::Legitimate => 1,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Ternary::Phishing),
            0 => Some(Ternary::Suspicious),
            1 => Some(Ternary::Legitimate),
            _ => None,
        }
    }

    /// A phishing trait that is either present (-1) or absent (1).
    pub fn flag(present: bool) -> Self {
        if present {
            Ternary::Phishing
        } else {
            Ternary::Legitimate
        }
    }
}

impl fmt::Display for Ternary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl Serialize for Ternary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

impl<'de> Deserialize<'de> for Ternary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ternary::from_value(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("{} is not a ternary value", raw)))
    }
}

/// Why a key holds the sentinel instead of a computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Malformed URL or HTML fragment
    ParseFailure,
    /// The page could not be fetched
    FetchFailure,
    /// Bulk input lacks the column
    SchemaMismatch,
    /// A raw value could not be coerced
    TypeCoercionFailure,
    /// No source produced the key
    NotComputed,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::ParseFailure => "parse_failure",
            FallbackReason::FetchFailure => "fetch_failure",
            FallbackReason::SchemaMismatch => "schema_mismatch",
            FallbackReason::TypeCoercionFailure => "type_coercion_failure",
            FallbackReason::NotComputed => "not_computed",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fallback {
    pub key: FeatureKey,
    pub reason: FallbackReason,
    pub detail: String,
}

/// The keys one analyzer produced, plus the keys it had to sentinel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    values: BTreeMap<FeatureKey, Ternary>,
    fallbacks: Vec<Fallback>,
}

impl PartialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: FeatureKey, value: Ternary) {
        self.values.insert(key, value);
    }

    /// Store the sentinel for `key` and remember why.
    pub fn fall_back(&mut self, key: FeatureKey, reason: FallbackReason, detail: impl Into<String>) {
        self.values.insert(key, Ternary::SENTINEL);
        self.fallbacks.push(Fallback {
            key,
            reason,
            detail: detail.into(),
        });
    }

    /// Set `key` from a computation that may have failed.
    pub fn set_or_fall_back(
        &mut self,
        key: FeatureKey,
        value: Option<Ternary>,
        reason: FallbackReason,
        detail: &str,
    ) {
        match value {
            Some(v) => self.set(key, v),
            None => self.fall_back(key, reason, detail),
        }
    }

    /// Threshold a raw measurement through the key's schema transform.
    pub fn set_measured(&mut self, key: FeatureKey, raw: &RawValue) {
        match key.normalize(raw) {
            Some(value) => self.set(key, value),
            None => self.fall_back(
                key,
                FallbackReason::TypeCoercionFailure,
                format!("{:?} does not fit {}", raw, key),
            ),
        }
    }

    pub fn get(&self, key: FeatureKey) -> Option<Ternary> {
        self.values.get(&key).copied()
    }

    pub fn contains(&self, key: FeatureKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = FeatureKey> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKey, Ternary)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fallbacks(&self) -> &[Fallback] {
        &self.fallbacks
    }

    pub fn into_parts(self) -> (BTreeMap<FeatureKey, Ternary>, Vec<Fallback>) {
        (self.values, self.fallbacks)
    }
}

/// One value per schema key, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRecord {
    values: [Ternary; FEATURE_COUNT],
}

impl FeatureRecord {
    /// A record where every key holds the sentinel.
    pub fn sentinel() -> Self {
        Self {
            values: [Ternary::SENTINEL; FEATURE_COUNT],
        }
    }

    pub fn get(&self, key: FeatureKey) -> Ternary {
        self.values[key.index()]
    }

    pub fn set(&mut self, key: FeatureKey, value: Ternary) {
        self.values[key.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKey, Ternary)> + '_ {
        FeatureKey::ALL.iter().map(|key| (*key, self.values[key.index()]))
    }

    pub fn values(&self) -> &[Ternary; FEATURE_COUNT] {
        &self.values
    }

    /// The classifier wire vector: the first 20 schema keys, in order.
    pub fn classifier_vector(&self) -> [i8; CLASSIFIER_KEY_COUNT] {
        let mut vector = [0i8; CLASSIFIER_KEY_COUNT];
        for (slot, value) in vector.iter_mut().zip(self.values.iter()) {
            *slot = value.value();
        }
        vector
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key.name(), &value)?;
        }
        map.end()
    }
}

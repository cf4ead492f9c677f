//! Lead record and session identifier.

use std::collections::BTreeMap;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Row;

/// The fixed set of fields a prospect's profile is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    LocationPreference,
    Intent,
    Budget,
    PropertyType,
    Bedrooms,
    SpecialPreferences,
    MoveInTimeline,
    PreferredBuilders,
    VisitTimeline,
    ContactDetails,
}

impl LeadField {
    pub const ALL: [LeadField; 10] = [
        Self::LocationPreference,
        Self::Intent,
        Self::Budget,
        Self::PropertyType,
        Self::Bedrooms,
        Self::SpecialPreferences,
        Self::MoveInTimeline,
        Self::PreferredBuilders,
        Self::VisitTimeline,
        Self::ContactDetails,
    ];

    /// Column name in the leads table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocationPreference => "location_preference",
            Self::Intent => "intent",
            Self::Budget => "budget",
            Self::PropertyType => "property_type",
            Self::Bedrooms => "bedrooms",
            Self::SpecialPreferences => "special_preferences",
            Self::MoveInTimeline => "move_in_timeline",
            Self::PreferredBuilders => "preferred_builders",
            Self::VisitTimeline => "visit_timeline",
            Self::ContactDetails => "contact_details",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == key)
    }
}

impl std::fmt::Display for LeadField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prospect's stated preferences, one free-text value per field.
///
/// Values are stored verbatim; nothing here parses or validates them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadRecord {
    fields: BTreeMap<LeadField, String>,
}

impl LeadRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, field: LeadField, value: impl Into<String>) -> Option<String> {
        self.fields.insert(field, value.into())
    }

    pub fn get(&self, field: LeadField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LeadField, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Columns for an upsert.
    pub fn to_row(&self) -> Row {
        self.iter()
            .map(|(k, v)| (k.as_str().to_string(), Value::String(v.to_string())))
            .collect()
    }

    /// Overwrite fields from a model-extracted object. Unknown keys, nulls and
    /// blank strings are skipped; numbers are kept as their decimal text.
    /// Returns the fields that changed.
    pub fn merge_extracted(&mut self, extracted: &serde_json::Map<String, Value>) -> Vec<LeadField> {
        let mut changed = Vec::new();
        for (key, value) in extracted {
            let Some(field) = LeadField::from_key(key) else {
                continue;
            };
            let text = match value {
                Value::String(s) if !s.trim().is_empty() => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => continue,
            };
            if self.get(field) != Some(text.as_str()) {
                self.set(field, text);
                changed.push(field);
            }
        }
        changed
    }
}

/// Opaque per-session correlation token, e.g. `session_k3j9x0a2b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    const PREFIX: &'static str = "session_";
    const SUFFIX_LEN: usize = 9;

    /// Fresh random identifier. Collisions are possible and accepted.
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(Self::SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self(format!("{}{suffix}", Self::PREFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

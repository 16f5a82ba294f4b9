// File: ./src/model/item.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Longest title kept for an event; longer OCR runs are cut.
pub const MAX_TITLE_CHARS: usize = 140;

fn default_id() -> String {
    Uuid::new_v4().to_string()
}

/// Source of fresh event identifiers.
///
/// Extraction takes this as a dependency so tests can hand out predictable ids.
pub type IdProvider = Arc<dyn Fn() -> String + Send + Sync>;

pub fn uuid_ids() -> IdProvider {
    Arc::new(default_id)
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default = "default_id")]
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default, with = "optional_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
}

impl Event {
    /// Creates a single-day event with empty description and location.
    pub fn new(id: String, title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id,
            title: title.into(),
            date,
            end_date: None,
            description: String::new(),
            location: String::new(),
        }
    }

    /// Year-month key ("2026-03") used to count distinct months.
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }

    /// Applies the provided fields of a patch, leaving the others untouched.
    pub fn apply_patch(&mut self, patch: &EventPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(location) = &patch.location {
            self.location = location.clone();
        }
    }
}

/// Partial update for a stored event. `None` means "keep the current value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    // Outer None keeps the value, Some(None) clears it.
    pub end_date: Option<Option<NaiveDate>>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Truncates to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

// `end_date` is stored as "" when absent, matching the events file written by
// earlier releases.
mod optional_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format(FORMAT).to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

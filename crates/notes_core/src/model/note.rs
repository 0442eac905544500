//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted `Note` document and its store-assigned `NoteId`.
//! - Define the derived `NoteStats` aggregate.
//!
//! # Invariants
//! - `NoteId` values are strictly positive and never reused by the store.
//! - The textual id form is exactly 16 hex digits; anything else is malformed.
//! - `updated_at >= created_at` for every persisted note.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const NOTE_ID_HEX_LEN: usize = 16;

static NOTE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{16}$").expect("valid note id regex"));

/// Store-assigned note identifier.
///
/// Wraps the collection rowid. Ordering follows insertion order, which is what
/// cursor pagination relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(i64);

impl NoteId {
    /// Wraps a raw store id. Returns `None` for non-positive values.
    pub fn from_raw(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// Returns the raw store id.
    pub fn as_raw(self) -> i64 {
        self.0
    }

    /// Parses the 16-hex-digit textual form. Returns `None` when malformed.
    pub fn parse(value: &str) -> Option<Self> {
        if !NOTE_ID_RE.is_match(value) {
            return None;
        }
        let unsigned = u64::from_str_radix(value, 16).ok()?;
        let raw = i64::try_from(unsigned).ok()?;
        Self::from_raw(raw)
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0width$x}", self.0, width = NOTE_ID_HEX_LEN)
    }
}

/// Error returned by [`NoteId::from_str`] for malformed ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteIdParseError(String);

impl Display for NoteIdParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "malformed note id `{}`; expected {NOTE_ID_HEX_LEN} hex digits",
            self.0
        )
    }
}

impl Error for NoteIdParseError {}

impl FromStr for NoteId {
    type Err = NoteIdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| NoteIdParseError(value.to_string()))
    }
}

impl Serialize for NoteId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Persisted note document.
///
/// Timestamps are UTC epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    /// Unique across the collection.
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
    /// When set, the store removes the note once this instant has passed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Text relevance, only present on text-filtered offset listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Collection-wide aggregate computed at query time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    pub count: i64,
    /// Mean `content` length in Unicode code points.
    pub avg_content_len: f64,
}

#[cfg(test)]
mod tests {
    use super::NoteId;

    #[test]
    fn display_is_zero_padded_lowercase_hex() {
        let id = NoteId::from_raw(255).unwrap();
        assert_eq!(id.to_string(), "00000000000000ff");
    }

    #[test]
    fn parse_accepts_both_cases() {
        assert_eq!(NoteId::parse("00000000000000FF"), NoteId::from_raw(255));
        assert_eq!(NoteId::parse("00000000000000ff"), NoteId::from_raw(255));
    }

    #[test]
    fn parse_rejects_malformed_values() {
        for value in [
            "",
            "ff",
            "0000000000000000ff",
            "00000000000000fg",
            " 00000000000000ff",
            "0000000000000000",
            "ffffffffffffffff",
        ] {
            assert!(NoteId::parse(value).is_none(), "`{value}` should be rejected");
        }
    }

    #[test]
    fn from_raw_rejects_non_positive() {
        assert!(NoteId::from_raw(0).is_none());
        assert!(NoteId::from_raw(-7).is_none());
    }

    #[test]
    fn ordering_follows_raw_value() {
        let older = NoteId::from_raw(9).unwrap();
        let newer = NoteId::from_raw(10).unwrap();
        assert!(older < newer);
        assert!(older.to_string() < newer.to_string());
    }
}

//! Notes and the input shapes used to create and update them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tags;
use crate::theme::DEFAULT_THEME_ID;

/// Where a note was captured from, plus free-form metadata. The storage
/// layer treats this as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSource {
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Id of the theme this note belongs to. Older files spell the field
    /// `theme_id`; both decode, and a missing field reads as the default
    /// theme.
    #[serde(alias = "theme_id", default = "default_theme")]
    pub theme: String,
    /// Always a list in memory. Legacy serialized forms are normalized on
    /// decode, see [`crate::tags`].
    #[serde(default, deserialize_with = "tags::deserialize")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<NoteSource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_theme() -> String {
    DEFAULT_THEME_ID.to_string()
}

/// Fields accepted when creating a note. Id and timestamps are assigned
/// by the library.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    #[serde(default, alias = "theme_id")]
    pub theme: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<NoteSource>,
}

/// Partial update for a note. Fields left out stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, alias = "theme_id")]
    pub theme: Option<String>,
    pub tags: Option<Vec<String>>,
    pub source: Option<NoteSource>,
}

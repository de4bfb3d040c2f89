//! Canonical tag codec.
//!
//! In memory, tags are always `Vec<String>`. Persisted forms vary: the
//! SQLite `tags` column and current JSON files hold a JSON-encoded array,
//! while files written by early versions hold a plain comma-separated
//! string. Every read path funnels through [`decode`] so callers never see
//! a serialized form.

use serde::{Deserialize, Deserializer};

/// Decode a serialized tag field into the canonical list form.
///
/// Accepts a JSON array string (`["a","b"]`) or the legacy comma-separated
/// form (`a, b`). Whitespace-only entries are dropped.
pub fn decode(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('[') {
        if let Ok(tags) = serde_json::from_str::<Vec<String>>(trimmed) {
            return normalize(tags);
        }
        // Not valid JSON after all, treat it like the legacy form.
    }
    normalize(trimmed.split(',').map(str::to_string).collect())
}

/// Encode tags as the JSON array string stored in the SQLite `tags` column.
pub fn encode(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Trim entries and drop the empty ones, keeping order.
pub(crate) fn normalize(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Serde helper for fields that hold either a real JSON array or one of
/// the serialized string forms.
pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagField {
        List(Vec<String>),
        Raw(String),
    }

    Ok(match TagField::deserialize(deserializer)? {
        TagField::List(tags) => normalize(tags),
        TagField::Raw(raw) => decode(&raw),
    })
}

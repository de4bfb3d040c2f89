//! AI prompt presets. Stored through the same backend selection as notes
//! and themes, but never part of the flat-file migration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert input for a preset. With an id, an existing preset is replaced
/// (keeping its creation time); without one, a new preset is created.
#[derive(Debug, Clone, Deserialize)]
pub struct SavePreset {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub content: String,
}

//! Themes: the category buckets notes are filed under.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved id of the theme every note can fall back to. Seeded at
/// initialization and never deletable.
pub const DEFAULT_THEME_ID: &str = "default";

/// Color assigned to themes created without an explicit color.
pub const DEFAULT_THEME_COLOR: &str = "#3498db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_color() -> String {
    DEFAULT_THEME_COLOR.to_string()
}

impl Theme {
    /// The reserved theme that orphaned notes are reassigned to.
    pub fn reserved_default() -> Self {
        let now = Utc::now();
        Theme {
            id: DEFAULT_THEME_ID.to_string(),
            name: "Default".to_string(),
            description: "Notes without a theme of their own".to_string(),
            color: DEFAULT_THEME_COLOR.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_THEME_ID
    }
}

/// Fields accepted when creating a theme. Id and timestamps are assigned
/// by the library.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTheme {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Partial update for a theme. Fields left out stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// A theme together with its note count. The count is derived at read
/// time and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeWithCount {
    #[serde(flatten)]
    pub theme: Theme,
    pub note_count: usize,
}

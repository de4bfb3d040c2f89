//! The storage backend abstraction.
//!
//! Two implementations exist: [`SqliteStore`](crate::sqlite_store::SqliteStore)
//! (preferred) and [`JsonStore`](crate::json_store::JsonStore) (fallback).
//! The [`Library`](crate::library::Library) facade owns exactly one of them
//! for the lifetime of the process.

use serde::Serialize;

use crate::error::Result;
use crate::note::Note;
use crate::preset::Preset;
use crate::theme::Theme;

/// Which physical backend is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Json,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Json => write!(f, "json"),
        }
    }
}

/// Filter for bulk note reads. Text search and pagination live above the
/// backends, in the library facade.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    /// Only notes filed under this theme id.
    pub theme: Option<String>,
    /// Cap on the number of notes returned, newest first.
    pub limit: Option<usize>,
}

impl NoteFilter {
    pub fn for_theme(theme: impl Into<String>) -> Self {
        NoteFilter {
            theme: Some(theme.into()),
            ..Default::default()
        }
    }
}

/// Per-theme note count. Themes with no notes are included with a zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeNoteCount {
    pub theme_id: String,
    pub theme_name: String,
    pub count: usize,
}

/// Aggregate numbers for the whole store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LibraryStats {
    pub total_notes: usize,
    pub total_themes: usize,
    pub notes_per_theme: Vec<ThemeNoteCount>,
    pub recent_notes: Vec<Note>,
}

/// The contract both backends implement.
///
/// Implementations persist fully formed records. Input validation, id and
/// timestamp assignment, and theme resolution all happen in the facade
/// before a record reaches a backend.
pub trait StorageBackend: Send + Sync {
    /// Which backend this is, for logs and the status surface.
    fn kind(&self) -> BackendKind;

    // Themes

    /// Insert a theme, replacing any existing theme with the same id.
    /// Fails with [`StoreError::Validation`](crate::StoreError::Validation)
    /// when a different theme already uses the same name.
    fn create_theme(&self, theme: Theme) -> Result<Theme>;

    fn theme(&self, id: &str) -> Result<Option<Theme>>;

    /// All themes, ordered by name.
    fn themes(&self) -> Result<Vec<Theme>>;

    /// Replace an existing theme. Name collisions fail like `create_theme`;
    /// a missing id fails with `NotFound`.
    fn update_theme(&self, theme: Theme) -> Result<Theme>;

    /// Delete a theme, reassigning its notes to the default theme first.
    /// Deleting the default theme fails with `Constraint`.
    fn delete_theme(&self, id: &str) -> Result<()>;

    /// Note counts per theme, including zero-count themes, ordered by
    /// theme name.
    fn theme_note_counts(&self) -> Result<Vec<ThemeNoteCount>>;

    // Notes

    fn create_note(&self, note: Note) -> Result<Note>;

    fn note(&self, id: &str) -> Result<Option<Note>>;

    /// Notes matching the filter, newest first by creation time.
    fn notes(&self, filter: &NoteFilter) -> Result<Vec<Note>>;

    /// Replace an existing note. A missing id fails with `NotFound`.
    fn update_note(&self, note: Note) -> Result<Note>;

    fn delete_note(&self, id: &str) -> Result<()>;

    // Presets

    /// All presets, ordered by name.
    fn presets(&self) -> Result<Vec<Preset>>;

    /// Insert or replace a preset by id. When replacing, the stored
    /// creation time wins over the one passed in.
    fn save_preset(&self, preset: Preset) -> Result<Preset>;

    fn delete_preset(&self, id: &str) -> Result<()>;

    // Stats

    /// Aggregate counts plus the `recent_limit` most recent notes.
    fn stats(&self, recent_limit: usize) -> Result<LibraryStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_value(BackendKind::Sqlite).unwrap(), "sqlite");
        assert_eq!(serde_json::to_value(BackendKind::Json).unwrap(), "json");
        assert_eq!(BackendKind::Sqlite.to_string(), "sqlite");
    }
}

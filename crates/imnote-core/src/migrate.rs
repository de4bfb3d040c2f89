//! One-time import of legacy flat-file data into the SQLite store.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::note::Note;
use crate::sqlite_store::SqliteStore;
use crate::theme::Theme;

#[derive(Debug, Default, Deserialize)]
struct LegacyNotes {
    #[serde(default)]
    notes: Vec<Note>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyThemes {
    #[serde(default)]
    themes: Vec<Theme>,
}

/// Import `themes.json` and `notes.json` into a freshly created database.
///
/// Runs during [`SqliteStore::open`]. A non-empty themes table means the
/// import (or first-run seeding) already happened and the whole routine is
/// skipped, so re-running inserts nothing. Import failures are logged and
/// swallowed once the default theme is back in place: a partially imported
/// store is serviceable, and the flat files are left untouched for a later
/// attempt.
pub(crate) fn run(store: &SqliteStore, config: &StorageConfig) -> Result<()> {
    if store.theme_count()? > 0 {
        tracing::debug!("Themes already present, skipping flat-file import");
        return Ok(());
    }
    match import(store, config) {
        Ok((themes, notes)) => {
            if themes > 0 || notes > 0 {
                tracing::info!(
                    "Imported {} themes and {} notes from flat files",
                    themes,
                    notes
                );
            }
            Ok(())
        }
        Err(e) => {
            store.ensure_default_theme()?;
            tracing::warn!("Flat-file import failed: {}; continuing with SQLite", e);
            Ok(())
        }
    }
}

fn import(store: &SqliteStore, config: &StorageConfig) -> Result<(usize, usize)> {
    let themes = read_file::<LegacyThemes>(&config.themes_path())?.themes;
    if themes.is_empty() {
        store.insert_theme_verbatim(&Theme::reserved_default())?;
    } else {
        // Rows go in exactly as the file had them, ids and timestamps
        // included. Notes referencing themes that are not in the file are
        // also kept as-is; reads repair such references later.
        for theme in &themes {
            store.insert_theme_verbatim(theme)?;
        }
    }

    let notes = read_file::<LegacyNotes>(&config.notes_path())?.notes;
    for note in &notes {
        store.insert_note_verbatim(note)?;
    }

    Ok((themes.len(), notes.len()))
}

/// A missing file reads as the empty document.
fn read_file<T>(path: &Path) -> Result<T>
where
    T: Default + DeserializeOwned,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use crate::config::StorageConfig;
    use crate::sqlite_store::SqliteStore;
    use crate::store::{NoteFilter, StorageBackend};
    use crate::theme::DEFAULT_THEME_ID;

    const LEGACY_THEMES: &str = r##"{"themes":[
        {
            "id": "reading",
            "name": "Reading",
            "color": "#ff0000",
            "created_at": "2023-05-01T08:00:00Z",
            "updated_at": "2023-05-01T08:00:00Z"
        }
    ]}"##;

    const LEGACY_NOTES: &str = r#"{"notes":[
        {
            "id": "n1",
            "title": "first",
            "content": "body one",
            "theme_id": "reading",
            "tags": "rust, notes",
            "created_at": "2023-05-02T09:00:00Z",
            "updated_at": "2023-05-02T09:30:00Z"
        },
        {
            "id": "n2",
            "title": "second",
            "content": "body two",
            "created_at": "2023-05-03T09:00:00Z",
            "updated_at": "2023-05-03T09:00:00Z"
        }
    ]}"#;

    fn write_legacy(config: &StorageConfig, themes: &str, notes: &str) {
        std::fs::create_dir_all(&config.data_dir).unwrap();
        std::fs::write(config.themes_path(), themes).unwrap();
        std::fs::write(config.notes_path(), notes).unwrap();
    }

    #[test]
    fn legacy_files_are_imported_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::in_dir(dir.path());
        write_legacy(&config, LEGACY_THEMES, LEGACY_NOTES);

        let store = SqliteStore::open(&config).unwrap();

        let theme = store.theme("reading").unwrap().unwrap();
        assert_eq!(theme.name, "Reading");
        assert_eq!(theme.color, "#ff0000");
        let expected: DateTime<Utc> = "2023-05-01T08:00:00Z".parse().unwrap();
        assert_eq!(theme.created_at, expected);

        let note = store.note("n1").unwrap().unwrap();
        assert_eq!(note.theme, "reading");
        assert_eq!(note.tags, vec!["rust", "notes"]);
        let expected: DateTime<Utc> = "2023-05-02T09:30:00Z".parse().unwrap();
        assert_eq!(note.updated_at, expected);

        // Notes without a theme field land under the default theme.
        let note = store.note("n2").unwrap().unwrap();
        assert_eq!(note.theme, DEFAULT_THEME_ID);

        // The default theme is seeded alongside the imported themes.
        assert!(store.theme(DEFAULT_THEME_ID).unwrap().is_some());
    }

    #[test]
    fn import_runs_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::in_dir(dir.path());
        write_legacy(&config, LEGACY_THEMES, LEGACY_NOTES);

        {
            let store = SqliteStore::open(&config).unwrap();
            assert_eq!(store.notes(&NoteFilter::default()).unwrap().len(), 2);
        }

        // The flat files are still there; a second open must not import
        // them again, even after they change.
        let grown = LEGACY_NOTES.replace("\"n1\"", "\"n9\"");
        std::fs::write(config.notes_path(), grown).unwrap();

        let store = SqliteStore::open(&config).unwrap();
        assert_eq!(store.notes(&NoteFilter::default()).unwrap().len(), 2);
        assert!(store.note("n9").unwrap().is_none());
        assert_eq!(store.themes().unwrap().len(), 2);
    }

    #[test]
    fn no_flat_files_means_just_the_default_theme() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&StorageConfig::in_dir(dir.path())).unwrap();
        let themes = store.themes().unwrap();
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].id, DEFAULT_THEME_ID);
        assert!(store.notes(&NoteFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn empty_theme_list_still_seeds_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::in_dir(dir.path());
        write_legacy(&config, r#"{"themes":[]}"#, r#"{"notes":[]}"#);

        let store = SqliteStore::open(&config).unwrap();
        let themes = store.themes().unwrap();
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].id, DEFAULT_THEME_ID);
    }

    #[test]
    fn corrupt_flat_files_do_not_block_opening() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::in_dir(dir.path());
        write_legacy(&config, LEGACY_THEMES, "{ not json");

        let store = SqliteStore::open(&config).unwrap();
        // Themes made it in before the notes file failed; the default
        // theme is restored either way.
        assert!(store.theme("reading").unwrap().is_some());
        assert!(store.theme(DEFAULT_THEME_ID).unwrap().is_some());
        assert!(store.notes(&NoteFilter::default()).unwrap().is_empty());

        // The broken file is left alone for a manual fix.
        let raw = std::fs::read_to_string(config.notes_path()).unwrap();
        assert_eq!(raw, "{ not json");
    }

    #[test]
    fn stale_theme_references_are_imported_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::in_dir(dir.path());
        let notes = r#"{"notes":[{
            "id": "n1",
            "title": "orphan",
            "content": "body",
            "theme_id": "vanished",
            "created_at": "2023-05-02T09:00:00Z",
            "updated_at": "2023-05-02T09:00:00Z"
        }]}"#;
        write_legacy(&config, r#"{"themes":[]}"#, notes);

        let store = SqliteStore::open(&config).unwrap();
        let note = store.note("n1").unwrap().unwrap();
        assert_eq!(note.theme, "vanished");
    }
}

//! Flat-file implementation of [`StorageBackend`], the fallback backend.
//!
//! Three whole-document JSON files (`notes.json`, `themes.json`,
//! `presets.json`) are rewritten in full on every mutation. Writes go to a
//! temp file first and are renamed into place, so a crash mid-write never
//! leaves a half-written document. These files are also what the one-time
//! SQLite import reads.
//!
//! A process-local mutex serializes read-modify-write sequences. Writers
//! in other processes are not coordinated; one active server per data
//! directory is assumed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};
use crate::note::Note;
use crate::preset::Preset;
use crate::store::{BackendKind, LibraryStats, NoteFilter, StorageBackend, ThemeNoteCount};
use crate::theme::{Theme, DEFAULT_THEME_ID};

pub struct JsonStore {
    dir: PathBuf,
    notes_path: PathBuf,
    themes_path: PathBuf,
    presets_path: PathBuf,
    lock: Mutex<()>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NotesDoc {
    #[serde(default)]
    notes: Vec<Note>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ThemesDoc {
    #[serde(default)]
    themes: Vec<Theme>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetsDoc {
    #[serde(default)]
    presets: Vec<Preset>,
}

impl JsonStore {
    /// Open the store, creating the data directory and seeding any file
    /// that is missing. Existing files are never touched, so opening is
    /// idempotent.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir).map_err(|e| {
            StoreError::Initialization(format!("create {}: {}", config.data_dir.display(), e))
        })?;
        let store = JsonStore {
            dir: config.data_dir.clone(),
            notes_path: config.notes_path(),
            themes_path: config.themes_path(),
            presets_path: config.presets_path(),
            lock: Mutex::new(()),
        };
        store
            .seed()
            .map_err(|e| StoreError::Initialization(format!("seed flat files: {}", e)))?;
        Ok(store)
    }

    fn seed(&self) -> Result<()> {
        if !self.notes_path.exists() {
            self.write_doc(&self.notes_path, &NotesDoc::default())?;
        }
        if !self.themes_path.exists() {
            self.write_doc(
                &self.themes_path,
                &ThemesDoc {
                    themes: vec![Theme::reserved_default()],
                },
            )?;
        }
        if !self.presets_path.exists() {
            self.write_doc(&self.presets_path, &PresetsDoc::default())?;
        }
        Ok(())
    }

    /// Strict load, used inside mutations. A missing file reads as empty,
    /// but an unreadable or unparseable one aborts the mutation rather
    /// than risking a rewrite that drops existing records.
    fn load_doc<T>(path: &Path) -> Result<T>
    where
        T: Default + DeserializeOwned,
    {
        if !path.exists() {
            return Ok(T::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Degrading load, used by reads. Failures are logged and replaced
    /// with the empty document so one bad file does not take every read
    /// path down with it.
    fn read_doc<T>(path: &Path) -> T
    where
        T: Default + DeserializeOwned,
    {
        match Self::load_doc(path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Reading {} failed: {}", path.display(), e);
                T::default()
            }
        }
    }

    /// Write the full document to a temp file, then rename it into place.
    fn write_doc<T: Serialize>(&self, path: &Path, doc: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(doc)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("doc");
        let tmp = self.dir.join(format!(".{}-{}.tmp", name, Uuid::new_v4()));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn sort_notes_newest_first(notes: &mut [Note]) {
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    }
}

impl StorageBackend for JsonStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Json
    }

    fn create_theme(&self, theme: Theme) -> Result<Theme> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut doc: ThemesDoc = Self::load_doc(&self.themes_path)?;
        if doc
            .themes
            .iter()
            .any(|t| t.name == theme.name && t.id != theme.id)
        {
            return Err(StoreError::Validation(format!(
                "a theme named '{}' already exists",
                theme.name
            )));
        }
        doc.themes.retain(|t| t.id != theme.id);
        doc.themes.push(theme.clone());
        self.write_doc(&self.themes_path, &doc)?;
        Ok(theme)
    }

    fn theme(&self, id: &str) -> Result<Option<Theme>> {
        let doc: ThemesDoc = Self::read_doc(&self.themes_path);
        Ok(doc.themes.into_iter().find(|t| t.id == id))
    }

    fn themes(&self) -> Result<Vec<Theme>> {
        let doc: ThemesDoc = Self::read_doc(&self.themes_path);
        let mut themes = doc.themes;
        themes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(themes)
    }

    fn update_theme(&self, theme: Theme) -> Result<Theme> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut doc: ThemesDoc = Self::load_doc(&self.themes_path)?;
        if doc
            .themes
            .iter()
            .any(|t| t.name == theme.name && t.id != theme.id)
        {
            return Err(StoreError::Validation(format!(
                "a theme named '{}' already exists",
                theme.name
            )));
        }
        let pos = match doc.themes.iter().position(|t| t.id == theme.id) {
            Some(pos) => pos,
            None => return Err(StoreError::not_found("theme", &theme.id)),
        };
        doc.themes[pos] = theme.clone();
        self.write_doc(&self.themes_path, &doc)?;
        Ok(theme)
    }

    fn delete_theme(&self, id: &str) -> Result<()> {
        if id == DEFAULT_THEME_ID {
            return Err(StoreError::Constraint(
                "the default theme cannot be deleted".to_string(),
            ));
        }
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut themes: ThemesDoc = Self::load_doc(&self.themes_path)?;
        if !themes.themes.iter().any(|t| t.id == id) {
            return Err(StoreError::not_found("theme", id));
        }

        // Notes are rewritten before the theme list. A crash in between
        // leaves the theme present with zero notes, which is a valid
        // state; counts are derived, never stored.
        let mut notes: NotesDoc = Self::load_doc(&self.notes_path)?;
        let now = Utc::now();
        let mut changed = false;
        for note in notes.notes.iter_mut().filter(|n| n.theme == id) {
            note.theme = DEFAULT_THEME_ID.to_string();
            note.updated_at = now;
            changed = true;
        }
        if changed {
            self.write_doc(&self.notes_path, &notes)?;
        }

        themes.themes.retain(|t| t.id != id);
        self.write_doc(&self.themes_path, &themes)?;
        Ok(())
    }

    fn theme_note_counts(&self) -> Result<Vec<ThemeNoteCount>> {
        let themes: ThemesDoc = Self::read_doc(&self.themes_path);
        let notes: NotesDoc = Self::read_doc(&self.notes_path);
        let mut counts: Vec<ThemeNoteCount> = themes
            .themes
            .iter()
            .map(|theme| ThemeNoteCount {
                theme_id: theme.id.clone(),
                theme_name: theme.name.clone(),
                count: notes.notes.iter().filter(|n| n.theme == theme.id).count(),
            })
            .collect();
        counts.sort_by(|a, b| a.theme_name.cmp(&b.theme_name));
        Ok(counts)
    }

    fn create_note(&self, note: Note) -> Result<Note> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut doc: NotesDoc = Self::load_doc(&self.notes_path)?;
        if doc.notes.iter().any(|n| n.id == note.id) {
            return Err(StoreError::Storage(format!(
                "note id '{}' already exists",
                note.id
            )));
        }
        doc.notes.push(note.clone());
        self.write_doc(&self.notes_path, &doc)?;
        Ok(note)
    }

    fn note(&self, id: &str) -> Result<Option<Note>> {
        let doc: NotesDoc = Self::read_doc(&self.notes_path);
        Ok(doc.notes.into_iter().find(|n| n.id == id))
    }

    fn notes(&self, filter: &NoteFilter) -> Result<Vec<Note>> {
        let doc: NotesDoc = Self::read_doc(&self.notes_path);
        let mut notes: Vec<Note> = match &filter.theme {
            Some(theme) => doc.notes.into_iter().filter(|n| &n.theme == theme).collect(),
            None => doc.notes,
        };
        Self::sort_notes_newest_first(&mut notes);
        if let Some(limit) = filter.limit {
            notes.truncate(limit);
        }
        Ok(notes)
    }

    fn update_note(&self, note: Note) -> Result<Note> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut doc: NotesDoc = Self::load_doc(&self.notes_path)?;
        let pos = match doc.notes.iter().position(|n| n.id == note.id) {
            Some(pos) => pos,
            None => return Err(StoreError::not_found("note", &note.id)),
        };
        doc.notes[pos] = note.clone();
        self.write_doc(&self.notes_path, &doc)?;
        Ok(note)
    }

    fn delete_note(&self, id: &str) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut doc: NotesDoc = Self::load_doc(&self.notes_path)?;
        let before = doc.notes.len();
        doc.notes.retain(|n| n.id != id);
        if doc.notes.len() == before {
            return Err(StoreError::not_found("note", id));
        }
        self.write_doc(&self.notes_path, &doc)?;
        Ok(())
    }

    fn presets(&self) -> Result<Vec<Preset>> {
        let doc: PresetsDoc = Self::read_doc(&self.presets_path);
        let mut presets = doc.presets;
        presets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(presets)
    }

    fn save_preset(&self, mut preset: Preset) -> Result<Preset> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut doc: PresetsDoc = Self::load_doc(&self.presets_path)?;
        if let Some(existing) = doc.presets.iter().find(|p| p.id == preset.id) {
            preset.created_at = existing.created_at;
        }
        doc.presets.retain(|p| p.id != preset.id);
        doc.presets.push(preset.clone());
        self.write_doc(&self.presets_path, &doc)?;
        Ok(preset)
    }

    fn delete_preset(&self, id: &str) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut doc: PresetsDoc = Self::load_doc(&self.presets_path)?;
        let before = doc.presets.len();
        doc.presets.retain(|p| p.id != id);
        if doc.presets.len() == before {
            return Err(StoreError::not_found("preset", id));
        }
        self.write_doc(&self.presets_path, &doc)?;
        Ok(())
    }

    fn stats(&self, recent_limit: usize) -> Result<LibraryStats> {
        let themes: ThemesDoc = Self::read_doc(&self.themes_path);
        let notes: NotesDoc = Self::read_doc(&self.notes_path);

        let mut notes_per_theme: Vec<ThemeNoteCount> = themes
            .themes
            .iter()
            .map(|theme| ThemeNoteCount {
                theme_id: theme.id.clone(),
                theme_name: theme.name.clone(),
                count: notes.notes.iter().filter(|n| n.theme == theme.id).count(),
            })
            .collect();
        notes_per_theme.sort_by(|a, b| a.theme_name.cmp(&b.theme_name));

        let total_notes = notes.notes.len();
        let mut recent_notes = notes.notes;
        Self::sort_notes_newest_first(&mut recent_notes);
        recent_notes.truncate(recent_limit);

        Ok(LibraryStats {
            total_notes,
            total_themes: themes.themes.len(),
            notes_per_theme,
            recent_notes,
        })
    }
}

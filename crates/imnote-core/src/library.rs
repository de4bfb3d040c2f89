//! The library facade: one CRUD surface over whichever backend is active.
//!
//! Backend selection happens exactly once, in [`Library::open`]. After
//! that the facade owns the error policy: reads degrade to safe defaults
//! so a flaky backend cannot take the whole surface down, while writes
//! report their errors to the caller. The facade also assigns ids and
//! timestamps, validates input, and repairs stale theme references when
//! notes are read back.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};
use crate::json_store::JsonStore;
use crate::note::{NewNote, Note, NotePatch};
use crate::preset::{Preset, SavePreset};
use crate::sqlite_store::SqliteStore;
use crate::store::{BackendKind, LibraryStats, NoteFilter, StorageBackend};
use crate::tags;
use crate::theme::{
    NewTheme, Theme, ThemePatch, ThemeWithCount, DEFAULT_THEME_COLOR, DEFAULT_THEME_ID,
};

/// Query for note listings. All parts are optional and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct NoteQuery {
    /// Only notes filed under this theme id.
    pub theme: Option<String>,
    /// Case-insensitive substring match over title, content and tags.
    pub search: Option<String>,
    /// Notes must carry every listed tag (case-insensitive).
    pub tags: Vec<String>,
    /// 1-based page number.
    pub page: Option<usize>,
    /// Page size; the configured default applies when absent.
    pub limit: Option<usize>,
}

/// One page of notes plus the numbers a pager needs.
#[derive(Debug, Clone, Serialize)]
pub struct NotePage {
    pub notes: Vec<Note>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl NotePage {
    fn empty() -> Self {
        NotePage {
            notes: Vec::new(),
            total: 0,
            page: 1,
            total_pages: 0,
        }
    }
}

pub struct Library {
    backend: Box<dyn StorageBackend>,
    degraded: bool,
    default_page_size: usize,
    stats_recent_limit: usize,
}

impl Library {
    /// Open the library, deciding which backend serves this process.
    ///
    /// SQLite is preferred. When it cannot be brought up, the flat-file
    /// store takes over for the rest of the process lifetime; there is no
    /// per-request switching.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        match SqliteStore::open(config) {
            Ok(store) => {
                let degraded = store.degraded();
                tracing::info!("Serving from the SQLite backend");
                Ok(Self::with_backend(Box::new(store), degraded, config))
            }
            Err(e) => {
                tracing::warn!(
                    "SQLite backend unavailable: {}; falling back to flat JSON files",
                    e
                );
                let store = JsonStore::open(config)?;
                Ok(Self::with_backend(Box::new(store), false, config))
            }
        }
    }

    pub(crate) fn with_backend(
        backend: Box<dyn StorageBackend>,
        degraded: bool,
        config: &StorageConfig,
    ) -> Self {
        Library {
            backend,
            degraded,
            default_page_size: config.default_page_size.max(1),
            stats_recent_limit: config.stats_recent_limit,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// True when the SQLite database had to move to a temp location.
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    // Themes

    /// All themes with their derived note counts. Backend failures are
    /// logged and read as an empty list.
    pub fn list_themes(&self) -> Vec<ThemeWithCount> {
        let themes = match self.backend.themes() {
            Ok(themes) => themes,
            Err(e) => {
                tracing::warn!("Listing themes failed: {}", e);
                return Vec::new();
            }
        };
        let counts = self.note_counts();
        themes
            .into_iter()
            .map(|theme| {
                let note_count = counts.get(&theme.id).copied().unwrap_or(0);
                ThemeWithCount { theme, note_count }
            })
            .collect()
    }

    pub fn theme(&self, id: &str) -> Option<ThemeWithCount> {
        match self.backend.theme(id) {
            Ok(Some(theme)) => {
                let note_count = self.note_counts().get(&theme.id).copied().unwrap_or(0);
                Some(ThemeWithCount { theme, note_count })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Loading theme {} failed: {}", id, e);
                None
            }
        }
    }

    fn note_counts(&self) -> HashMap<String, usize> {
        match self.backend.theme_note_counts() {
            Ok(counts) => counts.into_iter().map(|c| (c.theme_id, c.count)).collect(),
            Err(e) => {
                tracing::warn!("Counting notes per theme failed: {}", e);
                HashMap::new()
            }
        }
    }

    pub fn create_theme(&self, new: NewTheme) -> Result<Theme> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("theme name is required".to_string()));
        }
        let now = Utc::now();
        self.backend.create_theme(Theme {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: new.description.unwrap_or_default(),
            color: new.color.unwrap_or_else(|| DEFAULT_THEME_COLOR.to_string()),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_theme(&self, id: &str, patch: ThemePatch) -> Result<Theme> {
        let mut theme = self
            .backend
            .theme(id)?
            .ok_or_else(|| StoreError::not_found("theme", id))?;
        if let Some(name) = patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(StoreError::Validation("theme name is required".to_string()));
            }
            theme.name = name.to_string();
        }
        if let Some(description) = patch.description {
            theme.description = description;
        }
        if let Some(color) = patch.color {
            theme.color = color;
        }
        theme.updated_at = Utc::now();
        self.backend.update_theme(theme)
    }

    pub fn delete_theme(&self, id: &str) -> Result<()> {
        self.backend.delete_theme(id)
    }

    // Notes

    /// One page of notes. Search, tag filtering and pagination run here
    /// in the facade; the backend only provides the newest-first listing.
    pub fn list_notes(&self, query: &NoteQuery) -> NotePage {
        let notes = match self.backend.notes(&NoteFilter::default()) {
            Ok(notes) => notes,
            Err(e) => {
                tracing::warn!("Listing notes failed: {}", e);
                return NotePage::empty();
            }
        };
        // Theme filtering happens after repair, so notes pointing at a
        // vanished theme show up when the default theme is asked for.
        let notes = self.heal_theme_refs(notes);

        let filtered: Vec<Note> = notes
            .into_iter()
            .filter(|note| match &query.theme {
                Some(theme) => &note.theme == theme,
                None => true,
            })
            .filter(|note| matches_search(note, query.search.as_deref()))
            .filter(|note| matches_tags(note, &query.tags))
            .collect();

        let total = filtered.len();
        let limit = query.limit.unwrap_or(self.default_page_size).max(1);
        let page = query.page.unwrap_or(1).max(1);
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        let notes = filtered
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();
        NotePage {
            notes,
            total,
            page,
            total_pages,
        }
    }

    pub fn note(&self, id: &str) -> Option<Note> {
        match self.backend.note(id) {
            Ok(Some(note)) => self.heal_theme_refs(vec![note]).pop(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Loading note {} failed: {}", id, e);
                None
            }
        }
    }

    pub fn create_note(&self, new: NewNote) -> Result<Note> {
        if new.title.trim().is_empty() {
            return Err(StoreError::Validation("note title is required".to_string()));
        }
        if new.content.trim().is_empty() {
            return Err(StoreError::Validation(
                "note content is required".to_string(),
            ));
        }
        let now = Utc::now();
        self.backend.create_note(Note {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            content: new.content,
            theme: self.resolve_theme(new.theme.as_deref())?,
            tags: tags::normalize(new.tags),
            source: new.source,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_note(&self, id: &str, patch: NotePatch) -> Result<Note> {
        let mut note = self
            .backend
            .note(id)?
            .ok_or_else(|| StoreError::not_found("note", id))?;
        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(StoreError::Validation("note title is required".to_string()));
            }
            note.title = title;
        }
        if let Some(content) = patch.content {
            if content.trim().is_empty() {
                return Err(StoreError::Validation(
                    "note content is required".to_string(),
                ));
            }
            note.content = content;
        }
        // The theme is re-resolved even when the patch does not touch it,
        // so a stale reference gets corrected by any explicit update.
        let requested = patch.theme.unwrap_or_else(|| note.theme.clone());
        note.theme = self.resolve_theme(Some(&requested))?;
        if let Some(tags) = patch.tags {
            note.tags = tags::normalize(tags);
        }
        if let Some(source) = patch.source {
            note.source = Some(source);
        }
        note.updated_at = Utc::now();
        self.backend.update_note(note)
    }

    pub fn delete_note(&self, id: &str) -> Result<()> {
        self.backend.delete_note(id)
    }

    /// Map a requested theme id onto one that exists, falling back to the
    /// reserved default.
    fn resolve_theme(&self, requested: Option<&str>) -> Result<String> {
        let id = match requested {
            Some(id) if !id.trim().is_empty() => id.trim(),
            _ => return Ok(DEFAULT_THEME_ID.to_string()),
        };
        match self.backend.theme(id)? {
            Some(theme) => Ok(theme.id),
            None => Ok(DEFAULT_THEME_ID.to_string()),
        }
    }

    /// Present notes whose theme no longer exists as belonging to the
    /// default theme. Nothing is persisted here; the stored reference is
    /// fixed the next time the note is explicitly updated.
    fn heal_theme_refs(&self, mut notes: Vec<Note>) -> Vec<Note> {
        let known: HashSet<String> = match self.backend.themes() {
            Ok(themes) => themes.into_iter().map(|t| t.id).collect(),
            Err(e) => {
                tracing::warn!("Theme lookup for reference repair failed: {}", e);
                return notes;
            }
        };
        for note in notes.iter_mut() {
            if !known.contains(&note.theme) {
                note.theme = DEFAULT_THEME_ID.to_string();
            }
        }
        notes
    }

    // Presets

    pub fn presets(&self) -> Vec<Preset> {
        match self.backend.presets() {
            Ok(presets) => presets,
            Err(e) => {
                tracing::warn!("Listing presets failed: {}", e);
                Vec::new()
            }
        }
    }

    pub fn save_preset(&self, save: SavePreset) -> Result<Preset> {
        if save.name.trim().is_empty() {
            return Err(StoreError::Validation(
                "preset name is required".to_string(),
            ));
        }
        let now = Utc::now();
        self.backend.save_preset(Preset {
            id: save.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: save.name,
            content: save.content,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn delete_preset(&self, id: &str) -> Result<()> {
        self.backend.delete_preset(id)
    }

    // Stats

    pub fn stats(&self) -> LibraryStats {
        match self.backend.stats(self.stats_recent_limit) {
            Ok(mut stats) => {
                stats.recent_notes = self.heal_theme_refs(stats.recent_notes);
                stats
            }
            Err(e) => {
                tracing::warn!("Computing stats failed: {}", e);
                LibraryStats::default()
            }
        }
    }
}

fn matches_search(note: &Note, search: Option<&str>) -> bool {
    let needle = match search {
        Some(s) if !s.trim().is_empty() => s.trim().to_lowercase(),
        _ => return true,
    };
    note.title.to_lowercase().contains(&needle)
        || note.content.to_lowercase().contains(&needle)
        || note.tags.iter().any(|t| t.to_lowercase().contains(&needle))
}

fn matches_tags(note: &Note, wanted: &[String]) -> bool {
    wanted
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .all(|want| note.tags.iter().any(|t| t.eq_ignore_ascii_case(want)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_library() -> Library {
        let store = SqliteStore::open_in_memory().unwrap();
        Library::with_backend(Box::new(store), false, &StorageConfig::default())
    }

    fn new_note(title: &str, content: &str) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: content.to_string(),
            theme: None,
            tags: Vec::new(),
            source: None,
        }
    }

    fn new_theme(name: &str) -> NewTheme {
        NewTheme {
            name: name.to_string(),
            description: None,
            color: None,
        }
    }

    #[test]
    fn a_fresh_library_has_the_default_theme() {
        let library = sqlite_library();
        let themes = library.list_themes();
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].theme.id, DEFAULT_THEME_ID);
        assert_eq!(themes[0].note_count, 0);
    }

    #[test]
    fn created_themes_get_ids_and_default_colors() {
        let library = sqlite_library();
        let theme = library.create_theme(new_theme("Reading")).unwrap();
        assert!(!theme.id.is_empty());
        assert_eq!(theme.color, DEFAULT_THEME_COLOR);
        assert_eq!(library.theme(&theme.id).unwrap().theme.name, "Reading");
    }

    #[test]
    fn theme_names_are_trimmed_and_required() {
        let library = sqlite_library();
        let err = library.create_theme(new_theme("   ")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let theme = library.create_theme(new_theme("  Reading  ")).unwrap();
        assert_eq!(theme.name, "Reading");
    }

    #[test]
    fn duplicate_theme_names_bubble_up_as_validation() {
        let library = sqlite_library();
        library.create_theme(new_theme("Reading")).unwrap();
        let err = library.create_theme(new_theme("Reading")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn theme_patch_updates_only_supplied_fields() {
        let library = sqlite_library();
        let theme = library.create_theme(new_theme("Reading")).unwrap();
        let updated = library
            .update_theme(
                &theme.id,
                ThemePatch {
                    color: Some("#222222".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Reading");
        assert_eq!(updated.color, "#222222");
        assert!(updated.updated_at >= theme.updated_at);
        assert_eq!(updated.created_at, theme.created_at);
    }

    #[test]
    fn unknown_or_missing_note_themes_resolve_to_default() {
        let library = sqlite_library();
        let note = library.create_note(new_note("a", "b")).unwrap();
        assert_eq!(note.theme, DEFAULT_THEME_ID);

        let mut with_ghost = new_note("c", "d");
        with_ghost.theme = Some("no-such-theme".to_string());
        let note = library.create_note(with_ghost).unwrap();
        assert_eq!(note.theme, DEFAULT_THEME_ID);

        let theme = library.create_theme(new_theme("Real")).unwrap();
        let mut with_real = new_note("e", "f");
        with_real.theme = Some(theme.id.clone());
        let note = library.create_note(with_real).unwrap();
        assert_eq!(note.theme, theme.id);
    }

    #[test]
    fn note_title_and_content_are_required() {
        let library = sqlite_library();
        assert!(matches!(
            library.create_note(new_note("  ", "body")).unwrap_err(),
            StoreError::Validation(_)
        ));
        assert!(matches!(
            library.create_note(new_note("title", "\n\t")).unwrap_err(),
            StoreError::Validation(_)
        ));

        let note = library.create_note(new_note("title", "body")).unwrap();
        let err = library
            .update_note(
                &note.id,
                NotePatch {
                    title: Some("".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn note_patch_updates_only_supplied_fields() {
        let library = sqlite_library();
        let mut input = new_note("title", "body");
        input.tags = vec!["keep".to_string()];
        let note = library.create_note(input).unwrap();

        let updated = library
            .update_note(
                &note.id,
                NotePatch {
                    content: Some("new body".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "title");
        assert_eq!(updated.content, "new body");
        assert_eq!(updated.tags, vec!["keep"]);
        assert_eq!(updated.created_at, note.created_at);
        assert!(updated.updated_at > note.updated_at);
    }

    #[test]
    fn tags_are_normalized_on_the_way_in() {
        let library = sqlite_library();
        let mut input = new_note("t", "c");
        input.tags = vec![" rust ".to_string(), "".to_string(), "notes".to_string()];
        let note = library.create_note(input).unwrap();
        assert_eq!(note.tags, vec!["rust", "notes"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_content_and_tags() {
        let library = sqlite_library();
        let mut a = new_note("Rust patterns", "ownership and borrowing");
        a.tags = vec!["lang".to_string()];
        library.create_note(a).unwrap();
        let mut b = new_note("Groceries", "milk and eggs");
        b.tags = vec!["errands".to_string()];
        library.create_note(b).unwrap();

        let hit = |needle: &str| {
            library
                .list_notes(&NoteQuery {
                    search: Some(needle.to_string()),
                    ..Default::default()
                })
                .total
        };
        assert_eq!(hit("RUST"), 1);
        assert_eq!(hit("milk"), 1);
        assert_eq!(hit("ERRANDS"), 1);
        assert_eq!(hit("nothing-like-this"), 0);
        assert_eq!(hit("  "), 2);
    }

    #[test]
    fn tag_filter_requires_every_listed_tag() {
        let library = sqlite_library();
        let mut a = new_note("a", "x");
        a.tags = vec!["rust".to_string(), "notes".to_string()];
        library.create_note(a).unwrap();
        let mut b = new_note("b", "x");
        b.tags = vec!["rust".to_string()];
        library.create_note(b).unwrap();

        let page = library.list_notes(&NoteQuery {
            tags: vec!["Rust".to_string(), "NOTES".to_string()],
            ..Default::default()
        });
        assert_eq!(page.total, 1);
        assert_eq!(page.notes[0].title, "a");
    }

    #[test]
    fn pagination_splits_and_clamps() {
        let library = sqlite_library();
        for i in 0..25 {
            library
                .create_note(new_note(&format!("note {}", i), "body"))
                .unwrap();
        }

        let q = |page: usize| {
            library.list_notes(&NoteQuery {
                page: Some(page),
                limit: Some(10),
                ..Default::default()
            })
        };
        let first = q(1);
        assert_eq!(first.notes.len(), 10);
        assert_eq!(first.total, 25);
        assert_eq!(first.total_pages, 3);
        let second = q(2);
        let third = q(3);
        assert_eq!(second.notes.len(), 10);
        assert_eq!(third.notes.len(), 5);

        // Pages are disjoint and cover everything.
        let mut seen: HashSet<String> = HashSet::new();
        for page in [&first, &second, &third] {
            for note in &page.notes {
                assert!(seen.insert(note.id.clone()));
            }
        }
        assert_eq!(seen.len(), 25);

        // Past the end is empty, not an error; page 0 reads as page 1.
        assert!(q(4).notes.is_empty());
        assert_eq!(q(0).notes, first.notes);
    }

    #[test]
    fn default_page_size_comes_from_config() {
        let store = SqliteStore::open_in_memory().unwrap();
        let config = StorageConfig {
            default_page_size: 3,
            ..Default::default()
        };
        let library = Library::with_backend(Box::new(store), false, &config);
        for i in 0..5 {
            library
                .create_note(new_note(&format!("n{}", i), "body"))
                .unwrap();
        }
        let page = library.list_notes(&NoteQuery::default());
        assert_eq!(page.notes.len(), 3);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn theme_filter_lists_only_that_themes_notes() {
        let library = sqlite_library();
        let theme = library.create_theme(new_theme("Reading")).unwrap();
        let mut filed = new_note("filed", "body");
        filed.theme = Some(theme.id.clone());
        library.create_note(filed).unwrap();
        library.create_note(new_note("loose", "body")).unwrap();

        let page = library.list_notes(&NoteQuery {
            theme: Some(theme.id.clone()),
            ..Default::default()
        });
        assert_eq!(page.total, 1);
        assert_eq!(page.notes[0].title, "filed");
    }

    #[test]
    fn deleting_a_theme_moves_its_notes_to_default() {
        let library = sqlite_library();
        let theme = library.create_theme(new_theme("Reading")).unwrap();
        let mut filed = new_note("filed", "body");
        filed.theme = Some(theme.id.clone());
        let note = library.create_note(filed).unwrap();

        library.delete_theme(&theme.id).unwrap();

        let moved = library.note(&note.id).unwrap();
        assert_eq!(moved.theme, DEFAULT_THEME_ID);
        let total = library.list_notes(&NoteQuery::default()).total;
        assert_eq!(total, 1);
    }

    #[test]
    fn stale_theme_refs_display_as_default_and_heal_on_update() {
        // A stale reference needs hand-written files; the backends
        // themselves never produce one.
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::in_dir(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(
            config.notes_path(),
            r#"{"notes":[{
                "id": "n1",
                "title": "orphan",
                "content": "body",
                "theme": "vanished",
                "created_at": "2023-05-01T08:00:00Z",
                "updated_at": "2023-05-01T08:00:00Z"
            }]}"#,
        )
        .unwrap();
        let store = JsonStore::open(&config).unwrap();
        let library = Library::with_backend(Box::new(store), false, &config);

        // Reads repair the reference without touching the file.
        let note = library.note("n1").unwrap();
        assert_eq!(note.theme, DEFAULT_THEME_ID);
        let raw = std::fs::read_to_string(config.notes_path()).unwrap();
        assert!(raw.contains("vanished"));

        // Listing the default theme includes the orphan.
        let page = library.list_notes(&NoteQuery {
            theme: Some(DEFAULT_THEME_ID.to_string()),
            ..Default::default()
        });
        assert_eq!(page.total, 1);

        // An explicit update persists the repair.
        library
            .update_note(
                "n1",
                NotePatch {
                    title: Some("kept".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let raw = std::fs::read_to_string(config.notes_path()).unwrap();
        assert!(!raw.contains("vanished"));
        assert_eq!(library.note("n1").unwrap().theme, DEFAULT_THEME_ID);
    }

    #[test]
    fn open_prefers_sqlite_and_keeps_data_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::in_dir(dir.path());
        let id = {
            let library = Library::open(&config).unwrap();
            assert_eq!(library.backend_kind(), BackendKind::Sqlite);
            assert!(!library.degraded());
            library.create_note(new_note("kept", "body")).unwrap().id
        };
        let library = Library::open(&config).unwrap();
        assert_eq!(library.note(&id).unwrap().title, "kept");
    }

    #[test]
    fn sqlite_failure_falls_back_to_flat_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::in_dir(dir.path());
        // A directory where the database file should go makes the SQLite
        // open fail while leaving the data directory usable.
        std::fs::create_dir_all(dir.path().join("notes.db")).unwrap();

        let library = Library::open(&config).unwrap();
        assert_eq!(library.backend_kind(), BackendKind::Json);

        let note = library.create_note(new_note("fallback", "body")).unwrap();
        assert_eq!(library.note(&note.id).unwrap().title, "fallback");
        assert_eq!(library.list_themes().len(), 1);
        assert!(dir.path().join("notes.json").exists());
    }

    #[test]
    fn stats_respect_the_configured_recent_limit() {
        let store = SqliteStore::open_in_memory().unwrap();
        let config = StorageConfig {
            stats_recent_limit: 2,
            ..Default::default()
        };
        let library = Library::with_backend(Box::new(store), false, &config);
        for i in 0..4 {
            library
                .create_note(new_note(&format!("n{}", i), "body"))
                .unwrap();
        }
        let stats = library.stats();
        assert_eq!(stats.total_notes, 4);
        assert_eq!(stats.recent_notes.len(), 2);
        assert_eq!(stats.total_themes, 1);
    }

    #[test]
    fn presets_round_trip_through_the_facade() {
        let library = sqlite_library();
        let err = library
            .save_preset(SavePreset {
                id: None,
                name: " ".to_string(),
                content: "x".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let preset = library
            .save_preset(SavePreset {
                id: None,
                name: "Summarize".to_string(),
                content: "Summarize this".to_string(),
            })
            .unwrap();
        assert_eq!(library.presets().len(), 1);

        library.delete_preset(&preset.id).unwrap();
        assert!(library.presets().is_empty());
        assert!(matches!(
            library.delete_preset(&preset.id).unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }
}

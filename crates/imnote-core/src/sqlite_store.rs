//! SQLite implementation of [`StorageBackend`], the preferred backend.
//!
//! A single `rusqlite` connection behind a mutex serves all operations.
//! Opening the store also runs the one-time flat-file import, see
//! [`crate::migrate`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};
use crate::migrate;
use crate::note::Note;
use crate::preset::Preset;
use crate::store::{BackendKind, LibraryStats, NoteFilter, StorageBackend, ThemeNoteCount};
use crate::tags;
use crate::theme::{Theme, DEFAULT_THEME_ID};

pub struct SqliteStore {
    conn: Mutex<Connection>,
    degraded: bool,
}

/// Timestamps are stored as RFC 3339 text. Fixed nanosecond width keeps
/// lexicographic order equal to chronological order, which the
/// `created_at` index relies on.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl SqliteStore {
    /// Open (or create) the database under the configured data directory.
    ///
    /// The directory is created and probed for writability first, falling
    /// back to a temp location when it is unusable. Tables and indexes are
    /// created idempotently, legacy flat files are imported once, and the
    /// default theme is seeded. Safe to call again after a prior partial
    /// failure.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let fallback = std::env::temp_dir().join("imnote");
        let (dir, degraded) = Self::select_data_dir(&config.data_dir, &fallback)?;
        let db_path = dir.join(&config.db_file);
        let conn = Connection::open(&db_path).map_err(|e| {
            StoreError::Initialization(format!("open {}: {}", db_path.display(), e))
        })?;
        Self::init_schema(&conn)
            .map_err(|e| StoreError::Initialization(format!("schema: {}", e)))?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
            degraded,
        };
        migrate::run(&store, config)?;
        store.ensure_default_theme()?;
        Ok(store)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Initialization(e.to_string()))?;
        Self::init_schema(&conn)
            .map_err(|e| StoreError::Initialization(format!("schema: {}", e)))?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
            degraded: false,
        };
        store.ensure_default_theme()?;
        Ok(store)
    }

    /// True when the database lives in the temp fallback location instead
    /// of the configured data directory.
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// Pick a writable directory for the database: the configured one if
    /// it can be created and written to, otherwise the fallback.
    fn select_data_dir(primary: &Path, fallback: &Path) -> Result<(PathBuf, bool)> {
        match Self::prepare_dir(primary) {
            Ok(()) => Ok((primary.to_path_buf(), false)),
            Err(primary_err) => match Self::prepare_dir(fallback) {
                Ok(()) => {
                    tracing::warn!(
                        "Data directory {} unusable ({}), keeping the database in {}",
                        primary.display(),
                        primary_err,
                        fallback.display()
                    );
                    Ok((fallback.to_path_buf(), true))
                }
                Err(fallback_err) => Err(StoreError::Initialization(format!(
                    "no writable data directory: {} ({}), {} ({})",
                    primary.display(),
                    primary_err,
                    fallback.display(),
                    fallback_err
                ))),
            },
        }
    }

    /// Create the directory if needed and probe that it accepts writes.
    /// An existing directory can still sit on a read-only filesystem.
    fn prepare_dir(dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let probe = dir.join(".imnote-write-probe");
        std::fs::write(&probe, b"")?;
        std::fs::remove_file(&probe)?;
        Ok(())
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS themes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                color TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                theme_id TEXT NOT NULL DEFAULT 'default',
                tags TEXT NOT NULL DEFAULT '[]',
                source TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ai_presets (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notes_theme ON notes(theme_id);
            CREATE INDEX IF NOT EXISTS idx_notes_created ON notes(created_at);
            CREATE INDEX IF NOT EXISTS idx_themes_name ON themes(name);",
        )
    }

    /// Seed the reserved default theme when it is missing. Never
    /// overwrites an existing row, so edits to the default theme survive
    /// restarts.
    pub(crate) fn ensure_default_theme(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let exists: Option<String> = conn
            .query_row(
                "SELECT id FROM themes WHERE id = ?1",
                params![DEFAULT_THEME_ID],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            Self::insert_theme(&conn, &Theme::reserved_default())?;
        }
        Ok(())
    }

    /// Used by the migration to decide whether the import already ran.
    pub(crate) fn theme_count(&self) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM themes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Insert a theme exactly as given, without the name-collision check.
    /// The migration imports legacy rows verbatim through this.
    pub(crate) fn insert_theme_verbatim(&self, theme: &Theme) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::insert_theme(&conn, theme)
    }

    pub(crate) fn insert_note_verbatim(&self, note: &Note) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::insert_note(&conn, note)
    }

    fn insert_theme(conn: &Connection, theme: &Theme) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO themes (id, name, description, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                theme.id,
                theme.name,
                theme.description,
                theme.color,
                ts(&theme.created_at),
                ts(&theme.updated_at),
            ],
        )?;
        Ok(())
    }

    fn insert_note(conn: &Connection, note: &Note) -> Result<()> {
        let source = match &note.source {
            Some(source) => Some(serde_json::to_string(source)?),
            None => None,
        };
        conn.execute(
            "INSERT INTO notes (id, title, content, theme_id, tags, source, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                note.id,
                note.title,
                note.content,
                note.theme,
                tags::encode(&note.tags),
                source,
                ts(&note.created_at),
                ts(&note.updated_at),
            ],
        )?;
        Ok(())
    }

    fn theme_name_taken(conn: &Connection, name: &str, excluding: &str) -> Result<bool> {
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM themes WHERE name = ?1 AND id != ?2",
                params![name, excluding],
                |row| row.get(0),
            )
            .optional()?;
        Ok(existing.is_some())
    }

    fn query_theme_counts(conn: &Connection) -> Result<Vec<ThemeNoteCount>> {
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, COUNT(n.id)
             FROM themes t
             LEFT JOIN notes n ON n.theme_id = t.id
             GROUP BY t.id, t.name
             ORDER BY t.name",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok(ThemeNoteCount {
                    theme_id: row.get(0)?,
                    theme_name: row.get(1)?,
                    count: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(counts)
    }

    fn row_to_theme(row: &rusqlite::Row<'_>) -> rusqlite::Result<Theme> {
        let created_at: String = row.get(4)?;
        let updated_at: String = row.get(5)?;
        Ok(Theme {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            color: row.get(3)?,
            created_at: parse_ts(&created_at),
            updated_at: parse_ts(&updated_at),
        })
    }

    fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
        let tags_raw: String = row.get(4)?;
        let source_raw: Option<String> = row.get(5)?;
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;
        Ok(Note {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            theme: row.get(3)?,
            tags: tags::decode(&tags_raw),
            // Source is opaque metadata; a row with an unreadable blob
            // still loads.
            source: source_raw.and_then(|s| serde_json::from_str(&s).ok()),
            created_at: parse_ts(&created_at),
            updated_at: parse_ts(&updated_at),
        })
    }

    fn row_to_preset(row: &rusqlite::Row<'_>) -> rusqlite::Result<Preset> {
        let created_at: String = row.get(3)?;
        let updated_at: String = row.get(4)?;
        Ok(Preset {
            id: row.get(0)?,
            name: row.get(1)?,
            content: row.get(2)?,
            created_at: parse_ts(&created_at),
            updated_at: parse_ts(&updated_at),
        })
    }
}

const NOTE_COLUMNS: &str = "id, title, content, theme_id, tags, source, created_at, updated_at";

impl StorageBackend for SqliteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn create_theme(&self, theme: Theme) -> Result<Theme> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        if Self::theme_name_taken(&conn, &theme.name, &theme.id)? {
            return Err(StoreError::Validation(format!(
                "a theme named '{}' already exists",
                theme.name
            )));
        }
        Self::insert_theme(&conn, &theme)?;
        Ok(theme)
    }

    fn theme(&self, id: &str) -> Result<Option<Theme>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let theme = conn
            .query_row(
                "SELECT id, name, description, color, created_at, updated_at
                 FROM themes WHERE id = ?1",
                params![id],
                Self::row_to_theme,
            )
            .optional()?;
        Ok(theme)
    }

    fn themes(&self) -> Result<Vec<Theme>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, color, created_at, updated_at
             FROM themes ORDER BY name",
        )?;
        let themes = stmt
            .query_map([], Self::row_to_theme)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(themes)
    }

    fn update_theme(&self, theme: Theme) -> Result<Theme> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        if Self::theme_name_taken(&conn, &theme.name, &theme.id)? {
            return Err(StoreError::Validation(format!(
                "a theme named '{}' already exists",
                theme.name
            )));
        }
        let rows = conn.execute(
            "UPDATE themes SET name = ?2, description = ?3, color = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                theme.id,
                theme.name,
                theme.description,
                theme.color,
                ts(&theme.updated_at),
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::not_found("theme", &theme.id));
        }
        Ok(theme)
    }

    fn delete_theme(&self, id: &str) -> Result<()> {
        if id == DEFAULT_THEME_ID {
            return Err(StoreError::Constraint(
                "the default theme cannot be deleted".to_string(),
            ));
        }
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE notes SET theme_id = ?1, updated_at = ?2 WHERE theme_id = ?3",
            params![DEFAULT_THEME_ID, ts(&Utc::now()), id],
        )?;
        let rows = tx.execute("DELETE FROM themes WHERE id = ?1", params![id])?;
        if rows == 0 {
            // Dropping the transaction rolls the reassignment back.
            return Err(StoreError::not_found("theme", id));
        }
        tx.commit()?;
        Ok(())
    }

    fn theme_note_counts(&self) -> Result<Vec<ThemeNoteCount>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::query_theme_counts(&conn)
    }

    fn create_note(&self, note: Note) -> Result<Note> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::insert_note(&conn, &note)?;
        Ok(note)
    }

    fn note(&self, id: &str) -> Result<Option<Note>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let note = conn
            .query_row(
                &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
                params![id],
                Self::row_to_note,
            )
            .optional()?;
        Ok(note)
    }

    fn notes(&self, filter: &NoteFilter) -> Result<Vec<Note>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut sql = format!("SELECT {} FROM notes", NOTE_COLUMNS);
        let mut bind: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(theme) = &filter.theme {
            sql.push_str(" WHERE theme_id = ?1");
            bind.push(Box::new(theme.clone()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        let mut stmt = conn.prepare(&sql)?;
        let bind_refs: Vec<&dyn rusqlite::types::ToSql> =
            bind.iter().map(|b| b.as_ref()).collect();
        let notes = stmt
            .query_map(bind_refs.as_slice(), Self::row_to_note)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(notes)
    }

    fn update_note(&self, note: Note) -> Result<Note> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let source = match &note.source {
            Some(source) => Some(serde_json::to_string(source)?),
            None => None,
        };
        let rows = conn.execute(
            "UPDATE notes SET title = ?2, content = ?3, theme_id = ?4, tags = ?5,
             source = ?6, updated_at = ?7 WHERE id = ?1",
            params![
                note.id,
                note.title,
                note.content,
                note.theme,
                tags::encode(&note.tags),
                source,
                ts(&note.updated_at),
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::not_found("note", &note.id));
        }
        Ok(note)
    }

    fn delete_note(&self, id: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let rows = conn.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::not_found("note", id));
        }
        Ok(())
    }

    fn presets(&self) -> Result<Vec<Preset>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT id, name, content, created_at, updated_at FROM ai_presets ORDER BY name",
        )?;
        let presets = stmt
            .query_map([], Self::row_to_preset)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(presets)
    }

    fn save_preset(&self, preset: Preset) -> Result<Preset> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        conn.execute(
            "INSERT INTO ai_presets (id, name, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 content = excluded.content,
                 updated_at = excluded.updated_at",
            params![
                preset.id,
                preset.name,
                preset.content,
                ts(&preset.created_at),
                ts(&preset.updated_at),
            ],
        )?;
        // Re-read so a replaced preset reports its original creation time.
        let saved = conn.query_row(
            "SELECT id, name, content, created_at, updated_at FROM ai_presets WHERE id = ?1",
            params![preset.id],
            Self::row_to_preset,
        )?;
        Ok(saved)
    }

    fn delete_preset(&self, id: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let rows = conn.execute("DELETE FROM ai_presets WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::not_found("preset", id));
        }
        Ok(())
    }

    fn stats(&self, recent_limit: usize) -> Result<LibraryStats> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let total_notes: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        let total_themes: i64 =
            conn.query_row("SELECT COUNT(*) FROM themes", [], |row| row.get(0))?;
        let notes_per_theme = Self::query_theme_counts(&conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notes ORDER BY created_at DESC, id DESC LIMIT ?1",
            NOTE_COLUMNS
        ))?;
        let recent_notes = stmt
            .query_map(params![recent_limit as i64], Self::row_to_note)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(LibraryStats {
            total_notes: total_notes as usize,
            total_themes: total_themes as usize,
            notes_per_theme,
            recent_notes,
        })
    }
}

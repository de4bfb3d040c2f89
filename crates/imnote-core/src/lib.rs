//! imnote-core: storage for the imnote personal note collection.
//!
//! Notes, themes and AI presets live in either a SQLite database
//! (preferred) or a set of flat JSON files (fallback), behind the single
//! [`StorageBackend`] trait. The [`Library`] facade picks the backend once
//! at startup, imports legacy flat-file data into SQLite the first time
//! the relational store comes up, and exposes the uniform CRUD surface the
//! HTTP layer serves.

pub mod config;
pub mod error;
pub mod json_store;
pub mod library;
mod migrate;
pub mod note;
pub mod preset;
pub mod sqlite_store;
pub mod store;
pub mod tags;
pub mod theme;

pub use config::{Config, ConfigError, ServerConfig, StorageConfig};
pub use error::{Result, StoreError};
pub use json_store::JsonStore;
pub use library::{Library, NotePage, NoteQuery};
pub use note::{NewNote, Note, NotePatch, NoteSource};
pub use preset::{Preset, SavePreset};
pub use sqlite_store::SqliteStore;
pub use store::{BackendKind, LibraryStats, NoteFilter, StorageBackend, ThemeNoteCount};
pub use theme::{
    NewTheme, Theme, ThemePatch, ThemeWithCount, DEFAULT_THEME_COLOR, DEFAULT_THEME_ID,
};

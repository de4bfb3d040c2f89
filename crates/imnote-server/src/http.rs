//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use imnote_core::{
    tags, BackendKind, LibraryStats, NewNote, NewTheme, Note, NotePage, NotePatch, NoteQuery,
    Preset, SavePreset, StoreError, Theme, ThemePatch, ThemeWithCount,
};

use crate::AppState;

/// Error responses carry a JSON body with a single `error` field.
type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_response(err: StoreError) -> ApiError {
    let status = match &err {
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Constraint(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

/// Response for the theme listing
#[derive(Debug, Serialize)]
pub struct ThemesResponse {
    pub themes: Vec<ThemeWithCount>,
}

/// List all themes with note counts
pub async fn list_themes(State(state): State<Arc<AppState>>) -> Json<ThemesResponse> {
    Json(ThemesResponse {
        themes: state.library.list_themes(),
    })
}

/// Create a theme
pub async fn create_theme(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewTheme>,
) -> Result<(StatusCode, Json<Theme>), ApiError> {
    let theme = state.library.create_theme(request).map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(theme)))
}

/// Get a theme with its note count
pub async fn get_theme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ThemeWithCount>, ApiError> {
    state
        .library
        .theme(&id)
        .map(Json)
        .ok_or_else(|| error_response(StoreError::not_found("theme", &id)))
}

/// Update a theme
pub async fn update_theme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ThemePatch>,
) -> Result<Json<Theme>, ApiError> {
    state
        .library
        .update_theme(&id, request)
        .map(Json)
        .map_err(error_response)
}

/// Delete a theme, moving its notes to the default theme
pub async fn delete_theme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.library.delete_theme(&id).map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for the notes listing
#[derive(Debug, Deserialize)]
pub struct ListNotesParams {
    pub theme: Option<String>,
    pub search: Option<String>,
    /// Comma-separated tag list.
    pub tags: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// List notes, filtered and paginated
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListNotesParams>,
) -> Json<NotePage> {
    let query = NoteQuery {
        theme: params.theme,
        search: params.search,
        tags: params
            .tags
            .map(|raw| tags::decode(&raw))
            .unwrap_or_default(),
        page: params.page,
        limit: params.limit,
    };
    Json(state.library.list_notes(&query))
}

/// Create a note
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewNote>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let note = state.library.create_note(request).map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// Get a note
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    state
        .library
        .note(&id)
        .map(Json)
        .ok_or_else(|| error_response(StoreError::not_found("note", &id)))
}

/// Update a note
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<NotePatch>,
) -> Result<Json<Note>, ApiError> {
    state
        .library
        .update_note(&id, request)
        .map(Json)
        .map_err(error_response)
}

/// Delete a note
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.library.delete_note(&id).map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Response for the preset listing
#[derive(Debug, Serialize)]
pub struct PresetsResponse {
    pub presets: Vec<Preset>,
}

/// List AI prompt presets
pub async fn list_presets(State(state): State<Arc<AppState>>) -> Json<PresetsResponse> {
    Json(PresetsResponse {
        presets: state.library.presets(),
    })
}

/// Create or replace a preset
pub async fn save_preset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SavePreset>,
) -> Result<Json<Preset>, ApiError> {
    state
        .library
        .save_preset(request)
        .map(Json)
        .map_err(error_response)
}

/// Delete a preset
pub async fn delete_preset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.library.delete_preset(&id).map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Library statistics
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<LibraryStats> {
    Json(state.library.stats())
}

/// Which backend is serving, and whether it had to degrade
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub backend: BackendKind,
    pub degraded: bool,
}

/// Get storage status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        backend: state.library.backend_kind(),
        degraded: state.library.degraded(),
    })
}

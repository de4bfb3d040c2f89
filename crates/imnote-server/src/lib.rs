//! imnote server: local REST API over the note library.

pub mod http;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use imnote_core::Library;

/// Shared application state
pub struct AppState {
    pub library: Library,
}

impl AppState {
    pub fn new(library: Library) -> Self {
        Self { library }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Theme endpoints
        .route("/api/themes", get(http::list_themes))
        .route("/api/themes", post(http::create_theme))
        .route("/api/themes/{id}", get(http::get_theme))
        .route("/api/themes/{id}", put(http::update_theme))
        .route("/api/themes/{id}", delete(http::delete_theme))
        // Note endpoints
        .route("/api/notes", get(http::list_notes))
        .route("/api/notes", post(http::create_note))
        .route("/api/notes/{id}", get(http::get_note))
        .route("/api/notes/{id}", put(http::update_note))
        .route("/api/notes/{id}", delete(http::delete_note))
        // Preset endpoints
        .route("/api/presets", get(http::list_presets))
        .route("/api/presets", post(http::save_preset))
        .route("/api/presets/{id}", delete(http::delete_preset))
        // System endpoints
        .route("/api/stats", get(http::get_stats))
        .route("/api/status", get(http::get_status))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("imnote server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

//! imnote server binary.

use std::sync::Arc;

use imnote_core::{Config, Library};
use imnote_server::{serve, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = Config::load();
    config.validate()?;

    let library = Library::open(&config.storage)?;
    tracing::info!(
        "Storage ready: {} backend{}",
        library.backend_kind(),
        if library.degraded() { " (degraded)" } else { "" }
    );

    let state = Arc::new(AppState::new(library));
    serve(&config.server.addr, state).await
}

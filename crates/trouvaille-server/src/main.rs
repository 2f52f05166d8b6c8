//! # trouvaille-server
//!
//! REST API for the Trouvaille chat core.
//!
//! This binary exposes:
//! - **`PATCH /api/chats/{id}/return`** -- the only external mutator for
//!   the terminal CLOSED transition (finder-only)
//! - **`POST /api/blocks` / `DELETE /api/blocks/{id}`** -- the block_user
//!   procedure and its inverse
//! - **`GET /health`** -- liveness probe
//!
//! Mutations publish feed events so subscribed chat sessions converge
//! without a reload.

mod api;
mod auth;
mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use trouvaille_chat::ChatCore;
use trouvaille_shared::MemoryKeyStore;
use trouvaille_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,trouvaille_server=debug")),
        )
        .init();

    info!("Starting Trouvaille chat server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = Arc::new(ServerConfig::from_env());
    info!(addr = %config.http_addr, db = %config.db_path.display(), "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the row store and build the chat core
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.db_path)?;
    // Chat keys are client-resident; the server process never holds any.
    let core = ChatCore::new(db, Arc::new(MemoryKeyStore::new()));

    // -----------------------------------------------------------------------
    // 4. Serve the API
    // -----------------------------------------------------------------------
    let state = AppState {
        core,
        config: config.clone(),
    };
    let router = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "HTTP API listening");
    axum::serve(listener, router).await?;

    Ok(())
}

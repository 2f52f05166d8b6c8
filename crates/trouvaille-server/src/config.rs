//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use trouvaille_shared::constants::DEFAULT_HTTP_PORT;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite row store.
    /// Env: `DB_PATH`
    /// Default: `./trouvaille.db`
    pub db_path: PathBuf,

    /// 32-byte secret keying the bearer-token MAC (hex-encoded, 64 chars).
    /// Env: `AUTH_SECRET`
    /// Default: all-zeros (development only).
    pub auth_secret: [u8; 32],
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let http_addr = std::env::var("HTTP_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| {
                SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT))
            });

        let db_path = std::env::var("DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./trouvaille.db"));

        let auth_secret = std::env::var("AUTH_SECRET")
            .ok()
            .and_then(|hex_str| {
                let bytes = hex::decode(&hex_str).ok()?;
                let arr: [u8; 32] = bytes.try_into().ok()?;
                Some(arr)
            })
            .unwrap_or_else(|| {
                tracing::warn!("AUTH_SECRET not set or invalid, using zero key (dev only)");
                [0u8; 32]
            });

        Self {
            http_addr,
            db_path,
            auth_secret,
        }
    }
}

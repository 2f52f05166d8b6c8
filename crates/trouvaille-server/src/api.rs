use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use trouvaille_chat::{ChatCore, CloseOutcome};
use trouvaille_shared::models::{BlockRelationship, Chat};
use trouvaille_shared::types::{ChatId, UserId};

use crate::auth::bearer_user;
use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub core: ChatCore,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/chats/:chat_id/return", patch(return_chat))
        .route("/api/blocks", post(create_block))
        .route("/api/blocks/:blocked_id", delete(remove_block))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ReturnChatResponse {
    chat: Chat,
    already_closed: bool,
}

#[derive(Deserialize)]
struct BlockRequest {
    blocked_id: UserId,
    reason: Option<String>,
    chat_id: Option<ChatId>,
}

#[derive(Serialize)]
struct UnblockResponse {
    removed: bool,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The sole externally exposed mutator for the CLOSED transition. Bypasses
/// direct row-level mutation so the finder-only rule is enforced here
/// instead of in row-security policies.
async fn return_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ReturnChatResponse>, ServerError> {
    let caller = bearer_user(&headers, &state.config.auth_secret)?;
    let chat_id = ChatId::parse(&chat_id)
        .map_err(|e| ServerError::BadRequest(format!("invalid chat id: {e}")))?;

    let (chat, outcome) = state.core.close_chat(chat_id, caller).await?;

    Ok(Json(ReturnChatResponse {
        chat,
        already_closed: outcome == CloseOutcome::AlreadyClosed,
    }))
}

/// `block_user(blocked_id, reason, chat_id)`: idempotent creation of a
/// directed block; the blocker is the authenticated caller.
async fn create_block(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BlockRequest>,
) -> Result<Json<BlockRelationship>, ServerError> {
    let caller = bearer_user(&headers, &state.config.auth_secret)?;
    if request.blocked_id == caller {
        return Err(ServerError::BadRequest("cannot block yourself".into()));
    }

    let block = state
        .core
        .block(caller, request.blocked_id, request.reason, request.chat_id)?;
    Ok(Json(block))
}

/// Delete the caller's directed block edge. Succeeds whether or not the
/// edge existed.
async fn remove_block(
    State(state): State<AppState>,
    Path(blocked_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<UnblockResponse>, ServerError> {
    let caller = bearer_user(&headers, &state.config.auth_secret)?;
    let blocked = UserId::parse(&blocked_id)
        .map_err(|e| ServerError::BadRequest(format!("invalid user id: {e}")))?;

    let existed = state.core.is_blocked(caller, blocked)?;
    state.core.unblock(caller, blocked)?;
    Ok(Json(UnblockResponse { removed: existed }))
}

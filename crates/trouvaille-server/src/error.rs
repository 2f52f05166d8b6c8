use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use trouvaille_chat::ChatError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Missing or invalid bearer token")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ChatError> for ServerError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Authorization => ServerError::Forbidden(e.to_string()),
            ChatError::Validation(msg) => ServerError::BadRequest(msg),
            ChatError::State(reason) => ServerError::Conflict(reason.to_string()),
            ChatError::NotFound => ServerError::NotFound("chat or message not found".into()),
            ChatError::Encryption => ServerError::Internal("encryption error".into()),
            ChatError::Network(msg) => ServerError::Internal(msg),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trouvaille_chat::StateReason;

    #[test]
    fn test_chat_error_mapping() {
        assert!(matches!(
            ServerError::from(ChatError::Authorization),
            ServerError::Forbidden(_)
        ));
        assert!(matches!(
            ServerError::from(ChatError::NotFound),
            ServerError::NotFound(_)
        ));
        assert!(matches!(
            ServerError::from(ChatError::State(StateReason::Closed)),
            ServerError::Conflict(_)
        ));
        assert!(matches!(
            ServerError::from(ChatError::Validation("empty".into())),
            ServerError::BadRequest(_)
        ));
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let response = ServerError::Internal("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

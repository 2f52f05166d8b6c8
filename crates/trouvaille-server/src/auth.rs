//! Bearer-token authentication.
//!
//! A token is `{user_uuid_hex}.{mac_hex}` where the MAC is a BLAKE3 keyed
//! hash of the raw UUID bytes under the server's 32-byte secret. The
//! caller's identity is whatever user id the token was minted for;
//! verification is constant-time on the MAC.

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use trouvaille_shared::types::UserId;

use crate::error::ServerError;

/// Mint a token for a user. Used by the account service and by tests.
pub fn mint_token(secret: &[u8; 32], user: UserId) -> String {
    let mac = blake3::keyed_hash(secret, user.0.as_bytes());
    format!("{}.{}", user.0.simple(), mac.to_hex())
}

/// Verify a token and return the user it identifies.
pub fn verify_token(secret: &[u8; 32], token: &str) -> Option<UserId> {
    let (uuid_part, mac_part) = token.split_once('.')?;
    let uuid = Uuid::parse_str(uuid_part).ok()?;

    let mac_bytes = hex::decode(mac_part).ok()?;
    let expected = blake3::keyed_hash(secret, uuid.as_bytes());

    if mac_bytes.ct_eq(expected.as_bytes()).into() {
        Some(UserId(uuid))
    } else {
        None
    }
}

/// Extract and verify the `Authorization: Bearer ...` header.
pub fn bearer_user(headers: &HeaderMap, secret: &[u8; 32]) -> Result<UserId, ServerError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::Unauthorized)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(ServerError::Unauthorized)?;

    verify_token(secret, token).ok_or(ServerError::Unauthorized)
}

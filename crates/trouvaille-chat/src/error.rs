use thiserror::Error;

use trouvaille_store::StoreError;

/// Why a send is refused while the chat itself still resolves.
///
/// Each variant maps to a distinct user-facing message; the two block
/// directions are deliberately reported differently to each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateReason {
    /// Moderation disabled the chat; it may be re-enabled later.
    Suspended,
    /// The finder marked the item returned; terminal.
    Closed,
    /// The recipient has blocked the sender.
    BlockedByRecipient,
    /// The sender has blocked the recipient (self-imposed restriction).
    YouBlockedRecipient,
}

impl std::fmt::Display for StateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            StateReason::Suspended => "this chat is temporarily suspended",
            StateReason::Closed => "this chat has been closed",
            StateReason::BlockedByRecipient => "you are blocked in this conversation",
            StateReason::YouBlockedRecipient => {
                "you have blocked this user; unblock them to resume"
            }
        };
        write!(f, "{msg}")
    }
}

/// Errors surfaced by the chat core.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Caller is not a chat participant, or a non-finder attempted close.
    #[error("You are not allowed to perform this action")]
    Authorization,

    /// Empty or over-length message.
    #[error("Invalid message: {0}")]
    Validation(String),

    /// Send attempted while the chat or block state forbids it.
    #[error("{0}")]
    State(StateReason),

    /// Key missing or decryption failed. Absorbed by the message layer,
    /// which substitutes a sentinel; never fatal to a conversation.
    #[error("Encryption error")]
    Encryption,

    /// Transient transport failure; safe to retry.
    #[error("Network error: {0}")]
    Network(String),

    /// Chat or message id does not resolve.
    #[error("Not found")]
    NotFound,
}

impl From<StoreError> for ChatError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ChatError::NotFound,
            other => ChatError::Network(other.to_string()),
        }
    }
}

impl From<trouvaille_shared::KeyStoreError> for ChatError {
    fn from(_: trouvaille_shared::KeyStoreError) -> Self {
        ChatError::Encryption
    }
}

impl From<trouvaille_shared::CryptoError> for ChatError {
    fn from(_: trouvaille_shared::CryptoError) -> Self {
        ChatError::Encryption
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_specific() {
        // Every state reason renders a distinct, non-generic message.
        let reasons = [
            StateReason::Suspended,
            StateReason::Closed,
            StateReason::BlockedByRecipient,
            StateReason::YouBlockedRecipient,
        ];
        for (i, a) in reasons.iter().enumerate() {
            for b in &reasons[i + 1..] {
                assert_ne!(a.to_string(), b.to_string());
            }
        }
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ChatError::from(StoreError::NotFound),
            ChatError::NotFound
        ));
        assert!(matches!(
            ChatError::from(StoreError::Migration("boom".into())),
            ChatError::Network(_)
        ));
    }
}

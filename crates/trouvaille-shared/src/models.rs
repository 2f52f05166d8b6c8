//! Domain model structs, matching the row shapes persisted by the store
//! and echoed over the push feed.
//!
//! Every struct derives `Serialize` and `Deserialize` with snake_case
//! field names so it can serve directly as the wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChatId, ClaimId, ItemId, MessageId, UserId};

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A two-party conversation between the finder of an item and its claimant.
///
/// Created when a claim is approved, never deleted. `is_closed` is
/// monotonic: once the finder marks the item returned, no event sequence
/// reopens the chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    /// The user who found and listed the item.
    pub finder_id: UserId,
    /// The user whose claim on the item was approved.
    pub claimant_id: UserId,
    /// Opaque reference to the lost item.
    pub item_id: ItemId,
    /// Opaque reference to the approved claim.
    pub claim_id: ClaimId,
    /// Administratively toggled by moderation; `false` suspends the chat.
    pub enabled: bool,
    /// Terminal flag set when the finder marks the item returned.
    pub is_closed: bool,
    /// Denormalized count of messages the finder has not read yet.
    pub finder_unread_count: u32,
    /// Denormalized count of messages the claimant has not read yet.
    pub claimant_unread_count: u32,
}

impl Chat {
    /// Whether `user` is one of the two fixed participants.
    pub fn is_participant(&self, user: UserId) -> bool {
        user == self.finder_id || user == self.claimant_id
    }

    /// The participant other than `user`, or `None` if `user` is a stranger.
    pub fn other_participant(&self, user: UserId) -> Option<UserId> {
        if user == self.finder_id {
            Some(self.claimant_id)
        } else if user == self.claimant_id {
            Some(self.finder_id)
        } else {
            None
        }
    }

    /// The denormalized unread counter belonging to `user`.
    pub fn unread_count_for(&self, user: UserId) -> Option<u32> {
        if user == self.finder_id {
            Some(self.finder_unread_count)
        } else if user == self.claimant_id {
            Some(self.claimant_unread_count)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
///
/// `message_text` holds either the plaintext or, when `is_encrypted`, an
/// opaque base64 nonce‖ciphertext blob produced by the codec. The payload
/// is immutable once created; only `is_read` and `is_deleted` ever flip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    /// Always one of the chat's two participants.
    pub sender_id: UserId,
    pub message_text: String,
    pub is_encrypted: bool,
    pub is_read: bool,
    /// Soft delete: excluded from reads and counts, retained for audit.
    pub is_deleted: bool,
    /// Assigned by the store on insert; primary ordering key, with `id`
    /// as tie-break.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// BlockRelationship
// ---------------------------------------------------------------------------

/// A directed trust restriction: `blocker_id` no longer wants contact with
/// `blocked_id`. No symmetry is implied; block(a, b) and block(b, a) are
/// independent facts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockRelationship {
    pub blocker_id: UserId,
    pub blocked_id: UserId,
    /// Free-form reason given by the blocker.
    pub reason: Option<String>,
    /// The chat the block originated from, if any.
    pub chat_id: Option<ChatId>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_chat() -> Chat {
        Chat {
            id: ChatId::new(),
            finder_id: UserId::new(),
            claimant_id: UserId::new(),
            item_id: ItemId(Uuid::new_v4()),
            claim_id: ClaimId(Uuid::new_v4()),
            enabled: true,
            is_closed: false,
            finder_unread_count: 2,
            claimant_unread_count: 0,
        }
    }

    #[test]
    fn test_participants() {
        let chat = sample_chat();
        let stranger = UserId::new();

        assert!(chat.is_participant(chat.finder_id));
        assert!(chat.is_participant(chat.claimant_id));
        assert!(!chat.is_participant(stranger));

        assert_eq!(chat.other_participant(chat.finder_id), Some(chat.claimant_id));
        assert_eq!(chat.other_participant(chat.claimant_id), Some(chat.finder_id));
        assert_eq!(chat.other_participant(stranger), None);
    }

    #[test]
    fn test_unread_count_for() {
        let chat = sample_chat();
        assert_eq!(chat.unread_count_for(chat.finder_id), Some(2));
        assert_eq!(chat.unread_count_for(chat.claimant_id), Some(0));
        assert_eq!(chat.unread_count_for(UserId::new()), None);
    }

    #[test]
    fn test_chat_serializes_snake_case() {
        let chat = sample_chat();
        let json = serde_json::to_value(&chat).unwrap();
        assert!(json.get("finder_unread_count").is_some());
        assert!(json.get("is_closed").is_some());
    }
}

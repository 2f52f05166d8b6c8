//! Feed-event shapes pushed by the storage provider.
//!
//! The provider multiplexes three row categories onto one feed; each event
//! is a tagged variant so the synchronizer can dispatch to per-category
//! handlers instead of sniffing dynamic payloads. Delivery is at-least-once
//! and unordered across categories, ordered within a single row's updates.

use serde::{Deserialize, Serialize};

use crate::models::{BlockRelationship, Chat, Message};
use crate::types::ChatId;

/// What happened to a row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "row", rename_all = "snake_case")]
pub enum RowChange<T> {
    Insert(T),
    Update(T),
    Delete(T),
}

impl<T> RowChange<T> {
    pub fn row(&self) -> &T {
        match self {
            RowChange::Insert(row) | RowChange::Update(row) | RowChange::Delete(row) => row,
        }
    }
}

/// One event on the push feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "table", content = "change", rename_all = "snake_case")]
pub enum FeedEvent {
    Message(RowChange<Message>),
    Chat(RowChange<Chat>),
    Block(RowChange<BlockRelationship>),
}

impl FeedEvent {
    /// The chat scope an event belongs to.
    ///
    /// Message and chat events are scoped to their chat. Block events carry
    /// no reliable chat association (the originating `chat_id` is optional
    /// and a block affects every conversation between the pair), so they
    /// are broadcast to all scopes and filtered by relevance downstream.
    pub fn scope(&self) -> Option<ChatId> {
        match self {
            FeedEvent::Message(change) => Some(change.row().chat_id),
            FeedEvent::Chat(change) => Some(change.row().id),
            FeedEvent::Block(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClaimId, ItemId, MessageId, UserId};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_event_scope() {
        let chat_id = ChatId::new();
        let event = FeedEvent::Message(RowChange::Insert(Message {
            id: MessageId::new(),
            chat_id,
            sender_id: UserId::new(),
            message_text: "hi".into(),
            is_encrypted: false,
            is_read: false,
            is_deleted: false,
            created_at: Utc::now(),
        }));
        assert_eq!(event.scope(), Some(chat_id));

        let block = FeedEvent::Block(RowChange::Insert(BlockRelationship {
            blocker_id: UserId::new(),
            blocked_id: UserId::new(),
            reason: None,
            chat_id: Some(chat_id),
            created_at: Utc::now(),
        }));
        assert_eq!(block.scope(), None);
    }

    #[test]
    fn test_event_json_tagging() {
        let event = FeedEvent::Chat(RowChange::Update(Chat {
            id: ChatId::new(),
            finder_id: UserId::new(),
            claimant_id: UserId::new(),
            item_id: ItemId(Uuid::new_v4()),
            claim_id: ClaimId(Uuid::new_v4()),
            enabled: false,
            is_closed: false,
            finder_unread_count: 0,
            claimant_unread_count: 0,
        }));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["table"], "chat");
        assert_eq!(json["change"]["op"], "update");

        let back: FeedEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}

//! Chat lifecycle: the `{OPEN, SUSPENDED, CLOSED}` state machine derived
//! from the `(enabled, is_closed)` pair on the chat row.
//!
//! OPEN ↔ SUSPENDED transitions are driven externally by moderation
//! flipping `enabled`; the core only re-derives. The one transition the
//! core owns is into CLOSED, which is terminal.

use trouvaille_shared::events::{FeedEvent, RowChange};
use trouvaille_shared::models::Chat;
use trouvaille_shared::types::{ChatId, UserId};

use crate::core::ChatCore;
use crate::error::ChatError;

/// Derived lifecycle state of a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    /// Enabled and not closed; messages flow.
    Open,
    /// Administratively disabled; may reopen.
    Suspended,
    /// The finder marked the item returned. Terminal; `enabled` is
    /// irrelevant once set.
    Closed,
}

impl ChatState {
    pub fn derive(chat: &Chat) -> Self {
        if chat.is_closed {
            ChatState::Closed
        } else if chat.enabled {
            ChatState::Open
        } else {
            ChatState::Suspended
        }
    }
}

/// Result of a close request, distinguishing "just closed" from "was
/// already closed" so callers can message each case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    AlreadyClosed,
}

impl ChatCore {
    /// Current derived state of a chat.
    pub fn chat_state(&self, chat_id: ChatId) -> Result<ChatState, ChatError> {
        let chat = self.with_db(|db| db.get_chat(chat_id))?;
        Ok(ChatState::derive(&chat))
    }

    /// Close a chat, representing "item returned".
    ///
    /// Only the finder may close. Closing an already-closed chat is a
    /// no-op that reports [`CloseOutcome::AlreadyClosed`] rather than
    /// silently succeeding. On a real close the associated item's status
    /// change to "returned" is delegated to the external items service.
    pub async fn close_chat(
        &self,
        chat_id: ChatId,
        acting_user: UserId,
    ) -> Result<(Chat, CloseOutcome), ChatError> {
        let chat = self.with_db(|db| db.get_chat(chat_id))?;

        if acting_user != chat.finder_id {
            return Err(ChatError::Authorization);
        }

        if chat.is_closed {
            tracing::debug!(chat_id = %chat_id, "close requested on already-closed chat");
            return Ok((chat, CloseOutcome::AlreadyClosed));
        }

        self.with_db(|db| db.set_chat_closed(chat_id))?;
        let updated = self.with_db(|db| db.get_chat(chat_id))?;

        tracing::info!(
            chat_id = %chat_id,
            item_id = %updated.item_id,
            "chat closed, item marked returned"
        );
        self.publish(FeedEvent::Chat(RowChange::Update(updated.clone())));

        Ok((updated, CloseOutcome::Closed))
    }
}

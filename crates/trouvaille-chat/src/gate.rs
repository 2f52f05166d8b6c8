//! Access control: directional block relationships and send eligibility.
//!
//! Blocks are directed edges; `block(a, b)` and `block(b, a)` are
//! independent facts. Both directions forbid sending, but each side is
//! told something different: the blocker is reminded they can unblock,
//! the blocked party just learns they are blocked.

use chrono::Utc;

use trouvaille_shared::events::{FeedEvent, RowChange};
use trouvaille_shared::models::{BlockRelationship, Chat};
use trouvaille_shared::types::{ChatId, UserId};

use crate::core::ChatCore;
use crate::error::{ChatError, StateReason};
use crate::lifecycle::ChatState;

/// Outcome of a send-eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Allowed,
    Denied(StateReason),
}

impl Eligibility {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Eligibility::Allowed)
    }
}

impl ChatCore {
    /// Record that `blocker` blocks `blocked`. Idempotent: re-blocking an
    /// already blocked user succeeds without surfacing a duplicate error.
    pub fn block(
        &self,
        blocker: UserId,
        blocked: UserId,
        reason: Option<String>,
        chat_id: Option<ChatId>,
    ) -> Result<BlockRelationship, ChatError> {
        let block = BlockRelationship {
            blocker_id: blocker,
            blocked_id: blocked,
            reason,
            chat_id,
            created_at: Utc::now(),
        };
        self.with_db(|db| db.upsert_block(&block))?;
        tracing::info!(blocker = %blocker, blocked = %blocked, "block recorded");
        self.publish(FeedEvent::Block(RowChange::Insert(block.clone())));
        Ok(block)
    }

    /// Remove the directed edge `blocker → blocked`. Unblocking a user who
    /// was never blocked is not an error.
    pub fn unblock(&self, blocker: UserId, blocked: UserId) -> Result<(), ChatError> {
        let existing = self.with_db(|db| db.get_block(blocker, blocked))?;
        let removed = self.with_db(|db| db.delete_block(blocker, blocked))?;
        if removed {
            tracing::info!(blocker = %blocker, blocked = %blocked, "block removed");
            if let Some(block) = existing {
                self.publish(FeedEvent::Block(RowChange::Delete(block)));
            }
        }
        Ok(())
    }

    /// Existence check of the directed edge a→b.
    pub fn is_blocked(&self, blocker: UserId, blocked: UserId) -> Result<bool, ChatError> {
        self.with_db(|db| db.block_exists(blocker, blocked))
    }

    /// Whether `sender` may currently post into `chat`.
    ///
    /// Allowed iff the chat is OPEN and neither direction of blocking
    /// holds between the two participants. A non-participant caller gets
    /// `ChatError::Authorization` instead of a denial reason.
    pub fn send_eligibility(&self, chat: &Chat, sender: UserId) -> Result<Eligibility, ChatError> {
        let recipient = chat
            .other_participant(sender)
            .ok_or(ChatError::Authorization)?;

        match ChatState::derive(chat) {
            ChatState::Closed => return Ok(Eligibility::Denied(StateReason::Closed)),
            ChatState::Suspended => return Ok(Eligibility::Denied(StateReason::Suspended)),
            ChatState::Open => {}
        }

        // Recipient blocked sender takes precedence in reporting.
        if self.is_blocked(recipient, sender)? {
            return Ok(Eligibility::Denied(StateReason::BlockedByRecipient));
        }
        if self.is_blocked(sender, recipient)? {
            return Ok(Eligibility::Denied(StateReason::YouBlockedRecipient));
        }

        Ok(Eligibility::Allowed)
    }
}

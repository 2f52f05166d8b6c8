//! The message stream: append, read-state, unread accounting, soft delete.
//!
//! Every mutation persists to the row store and is echoed onto the push
//! feed, so subscribed sessions (the sender's included) converge through
//! the synchronizer. Validation and state checks resolve before any store
//! write; store failures after that point surface as retryable network
//! errors.

use trouvaille_shared::constants::MAX_MESSAGE_CHARS;
use trouvaille_shared::crypto;
use trouvaille_shared::events::{FeedEvent, RowChange};
use trouvaille_shared::models::Message;
use trouvaille_shared::types::{ChatId, MessageId, UserId};

use crate::core::ChatCore;
use crate::error::ChatError;
use crate::gate::Eligibility;

impl ChatCore {
    /// Append a message to a chat.
    ///
    /// Rejects empty or over-length text, non-participants, and sends that
    /// the lifecycle or block state forbids. If this device holds a key
    /// for the chat the payload is encrypted through the codec; otherwise
    /// it is stored plaintext. Concurrent sends are accepted and preserved
    /// as distinct messages ordered by completion time.
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        sender: UserId,
        text: &str,
    ) -> Result<Message, ChatError> {
        if text.is_empty() {
            return Err(ChatError::Validation("message is empty".into()));
        }
        let chars = text.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(ChatError::Validation(format!(
                "message is {chars} characters, maximum is {MAX_MESSAGE_CHARS}"
            )));
        }

        let chat = self.with_db(|db| db.get_chat(chat_id))?;
        match self.send_eligibility(&chat, sender)? {
            Eligibility::Allowed => {}
            Eligibility::Denied(reason) => return Err(ChatError::State(reason)),
        }

        let (message_text, is_encrypted) = match self.keys().get(chat_id)? {
            Some(key) => (crypto::encrypt(&key, text)?, true),
            None => (text.to_string(), false),
        };

        let message = Message {
            id: MessageId::new(),
            chat_id,
            sender_id: sender,
            message_text,
            is_encrypted,
            is_read: false,
            is_deleted: false,
            created_at: Self::now(),
        };

        self.with_db(|db| {
            db.insert_message(&message)?;
            db.increment_unread_for_other(chat_id, sender)
        })?;
        let updated_chat = self.with_db(|db| db.get_chat(chat_id))?;

        tracing::debug!(
            chat_id = %chat_id,
            message_id = %message.id,
            encrypted = is_encrypted,
            "message appended"
        );
        self.publish(FeedEvent::Message(RowChange::Insert(message.clone())));
        self.publish(FeedEvent::Chat(RowChange::Update(updated_chat)));

        Ok(message)
    }

    /// Mark every message addressed to `reader` as read and zero their
    /// unread counter. Batch and idempotent; a second call is a no-op and
    /// publishes nothing.
    pub async fn mark_read(&self, chat_id: ChatId, reader: UserId) -> Result<(), ChatError> {
        let chat = self.with_db(|db| db.get_chat(chat_id))?;
        if !chat.is_participant(reader) {
            return Err(ChatError::Authorization);
        }

        let flipped = self.with_db(|db| db.mark_messages_read(chat_id, reader))?;
        let had_counter = chat.unread_count_for(reader).unwrap_or(0) > 0;
        if flipped.is_empty() && !had_counter {
            return Ok(());
        }

        self.with_db(|db| db.clear_unread(chat_id, reader))?;
        let updated_chat = self.with_db(|db| db.get_chat(chat_id))?;

        tracing::debug!(chat_id = %chat_id, count = flipped.len(), "messages marked read");
        for message in flipped {
            self.publish(FeedEvent::Message(RowChange::Update(message)));
        }
        self.publish(FeedEvent::Chat(RowChange::Update(updated_chat)));
        Ok(())
    }

    /// Soft-delete a message: excluded from reads and counts, retained for
    /// audit. Only the sender may delete their own message; moderation
    /// deletes arrive as external feed events instead.
    pub async fn soft_delete(
        &self,
        message_id: MessageId,
        acting_user: UserId,
    ) -> Result<(), ChatError> {
        let message = self.with_db(|db| db.get_message(message_id))?;
        if message.sender_id != acting_user {
            return Err(ChatError::Authorization);
        }
        if message.is_deleted {
            return Ok(());
        }

        self.with_db(|db| db.soft_delete_message(message_id))?;
        // A deleted unread message must stop counting against the other
        // participant, so recompute from the messages table.
        self.with_db(|db| db.recompute_unread(message.chat_id).map(|_| ()))?;

        let deleted = self.with_db(|db| db.get_message(message_id))?;
        let updated_chat = self.with_db(|db| db.get_chat(message.chat_id))?;

        tracing::debug!(message_id = %message_id, "message soft-deleted");
        self.publish(FeedEvent::Message(RowChange::Update(deleted)));
        self.publish(FeedEvent::Chat(RowChange::Update(updated_chat)));
        Ok(())
    }

    /// Ground-truth unread count for a participant: non-deleted messages
    /// from the other side with `is_read = false`.
    pub fn unread_count(&self, chat_id: ChatId, participant: UserId) -> Result<u32, ChatError> {
        let chat = self.with_db(|db| db.get_chat(chat_id))?;
        if !chat.is_participant(participant) {
            return Err(ChatError::Authorization);
        }
        self.with_db(|db| db.unread_count(chat_id, participant))
    }

    /// The visible message log, ordered by `(created_at, id)` ascending.
    /// Payloads are returned as stored; decoding is the session's concern.
    pub fn list_messages(&self, chat_id: ChatId, viewer: UserId) -> Result<Vec<Message>, ChatError> {
        let chat = self.with_db(|db| db.get_chat(chat_id))?;
        if !chat.is_participant(viewer) {
            return Err(ChatError::Authorization);
        }
        self.with_db(|db| db.list_messages(chat_id))
    }
}

//! CRUD operations for [`Message`] rows: the ordered log, read flags,
//! unread counting, and soft delete.

use chrono::{DateTime, Utc};
use rusqlite::params;

use trouvaille_shared::models::Message;
use trouvaille_shared::types::{ChatId, MessageId, UserId};

use crate::chats::parse_uuid;
use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new message.
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages (id, chat_id, sender_id, message_text,
                                   is_encrypted, is_read, is_deleted, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.id.to_string(),
                message.chat_id.to_string(),
                message.sender_id.to_string(),
                message.message_text,
                message.is_encrypted,
                message.is_read,
                message.is_deleted,
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single message by id (including soft-deleted ones; callers
    /// needing the visible log should use [`Database::list_messages`]).
    pub fn get_message(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, chat_id, sender_id, message_text,
                        is_encrypted, is_read, is_deleted, created_at
                 FROM messages WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List a chat's visible (non-deleted) messages, totally ordered by
    /// `(created_at, id)` ascending. Past messages are never reordered.
    pub fn list_messages(&self, chat_id: ChatId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, chat_id, sender_id, message_text,
                    is_encrypted, is_read, is_deleted, created_at
             FROM messages
             WHERE chat_id = ?1 AND is_deleted = 0
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![chat_id.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Count the non-deleted unread messages addressed to `participant`
    /// (i.e. sent by the other side). This is the ground truth the
    /// denormalized chat counters must agree with.
    pub fn unread_count(&self, chat_id: ChatId, participant: UserId) -> Result<u32> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages
             WHERE chat_id = ?1 AND sender_id <> ?2 AND is_read = 0 AND is_deleted = 0",
            params![chat_id.to_string(), participant.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Flip `is_read` on every unread message in the chat not sent by
    /// `reader`. Batch and idempotent: a second call flips nothing.
    ///
    /// Returns the messages that were flipped, so the caller can echo one
    /// update event per row.
    pub fn mark_messages_read(&self, chat_id: ChatId, reader: UserId) -> Result<Vec<Message>> {
        let ids: Vec<String> = {
            let mut stmt = self.conn().prepare(
                "SELECT id FROM messages
                 WHERE chat_id = ?1 AND sender_id <> ?2 AND is_read = 0",
            )?;
            let rows = stmt.query_map(
                params![chat_id.to_string(), reader.to_string()],
                |row| row.get::<_, String>(0),
            )?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        self.conn().execute(
            "UPDATE messages SET is_read = 1
             WHERE chat_id = ?1 AND sender_id <> ?2 AND is_read = 0",
            params![chat_id.to_string(), reader.to_string()],
        )?;

        let mut flipped = Vec::with_capacity(ids.len());
        for id in ids {
            flipped.push(self.get_message(MessageId(parse_uuid(&id, 0)?))?);
        }
        Ok(flipped)
    }

    /// Soft-delete a message. Deleted messages disappear from reads and
    /// counts but the row is retained for audit.
    pub fn soft_delete_message(&self, id: MessageId) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE messages SET is_deleted = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id: String = row.get(0)?;
    let chat_id: String = row.get(1)?;
    let sender_id: String = row.get(2)?;
    let created_str: String = row.get(7)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Message {
        id: MessageId(parse_uuid(&id, 0)?),
        chat_id: ChatId(parse_uuid(&chat_id, 1)?),
        sender_id: UserId(parse_uuid(&sender_id, 2)?),
        message_text: row.get(3)?,
        is_encrypted: row.get(4)?,
        is_read: row.get(5)?,
        is_deleted: row.get(6)?,
        created_at,
    })
}

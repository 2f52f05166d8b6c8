//! CRUD operations for [`Chat`] rows, including maintenance of the
//! denormalized per-participant unread counters.

use rusqlite::params;

use trouvaille_shared::models::Chat;
use trouvaille_shared::types::{ChatId, ClaimId, ItemId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new chat (normally triggered by claim approval).
    pub fn insert_chat(&self, chat: &Chat) -> Result<()> {
        self.conn().execute(
            "INSERT INTO chats (id, finder_id, claimant_id, item_id, claim_id,
                                enabled, is_closed, finder_unread_count, claimant_unread_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                chat.id.to_string(),
                chat.finder_id.to_string(),
                chat.claimant_id.to_string(),
                chat.item_id.to_string(),
                chat.claim_id.to_string(),
                chat.enabled,
                chat.is_closed,
                chat.finder_unread_count,
                chat.claimant_unread_count,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single chat by id.
    pub fn get_chat(&self, id: ChatId) -> Result<Chat> {
        self.conn()
            .query_row(
                "SELECT id, finder_id, claimant_id, item_id, claim_id,
                        enabled, is_closed, finder_unread_count, claimant_unread_count
                 FROM chats
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_chat,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Flip the administrative `enabled` flag (moderation action).
    pub fn set_chat_enabled(&self, id: ChatId, enabled: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE chats SET enabled = ?2 WHERE id = ?1",
            params![id.to_string(), enabled],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Mark a chat closed. Monotonic: the statement only ever sets the flag,
    /// so a closed chat can never be reopened through this path.
    pub fn set_chat_closed(&self, id: ChatId) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE chats SET is_closed = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Increment the unread counter of the participant who did *not* send
    /// the message. The CASE keeps this a single statement regardless of
    /// which role the sender holds.
    pub fn increment_unread_for_other(&self, chat_id: ChatId, sender: UserId) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE chats SET
                 finder_unread_count = finder_unread_count
                     + CASE WHEN claimant_id = ?2 THEN 1 ELSE 0 END,
                 claimant_unread_count = claimant_unread_count
                     + CASE WHEN finder_id = ?2 THEN 1 ELSE 0 END
             WHERE id = ?1",
            params![chat_id.to_string(), sender.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Zero the unread counter belonging to `reader`.
    pub fn clear_unread(&self, chat_id: ChatId, reader: UserId) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE chats SET
                 finder_unread_count =
                     CASE WHEN finder_id = ?2 THEN 0 ELSE finder_unread_count END,
                 claimant_unread_count =
                     CASE WHEN claimant_id = ?2 THEN 0 ELSE claimant_unread_count END
             WHERE id = ?1",
            params![chat_id.to_string(), reader.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Recompute both unread counters from the message table and persist
    /// them. Used when a reconciliation pass observes a contradiction
    /// between a counter and the raw messages.
    ///
    /// Returns the recomputed `(finder_unread, claimant_unread)` pair.
    pub fn recompute_unread(&self, chat_id: ChatId) -> Result<(u32, u32)> {
        let chat = self.get_chat(chat_id)?;
        let finder = self.unread_count(chat_id, chat.finder_id)?;
        let claimant = self.unread_count(chat_id, chat.claimant_id)?;

        self.conn().execute(
            "UPDATE chats SET finder_unread_count = ?2, claimant_unread_count = ?3
             WHERE id = ?1",
            params![chat_id.to_string(), finder, claimant],
        )?;
        Ok((finder, claimant))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Chat`].
fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chat> {
    let id: String = row.get(0)?;
    let finder_id: String = row.get(1)?;
    let claimant_id: String = row.get(2)?;
    let item_id: String = row.get(3)?;
    let claim_id: String = row.get(4)?;

    Ok(Chat {
        id: ChatId(parse_uuid(&id, 0)?),
        finder_id: UserId(parse_uuid(&finder_id, 1)?),
        claimant_id: UserId(parse_uuid(&claimant_id, 2)?),
        item_id: ItemId(parse_uuid(&item_id, 3)?),
        claim_id: ClaimId(parse_uuid(&claim_id, 4)?),
        enabled: row.get(5)?,
        is_closed: row.get(6)?,
        finder_unread_count: row.get(7)?,
        claimant_unread_count: row.get(8)?,
    })
}

pub(crate) fn parse_uuid(s: &str, col: usize) -> rusqlite::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{open_test_db, sample_chat};

    #[test]
    fn test_insert_and_get_chat() {
        let (_dir, db) = open_test_db();
        let chat = sample_chat();

        db.insert_chat(&chat).unwrap();
        assert_eq!(db.get_chat(chat.id).unwrap(), chat);
    }

    #[test]
    fn test_get_missing_chat() {
        let (_dir, db) = open_test_db();
        assert!(matches!(
            db.get_chat(ChatId::new()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_set_enabled() {
        let (_dir, db) = open_test_db();
        let chat = sample_chat();
        db.insert_chat(&chat).unwrap();

        db.set_chat_enabled(chat.id, false).unwrap();
        assert!(!db.get_chat(chat.id).unwrap().enabled);

        db.set_chat_enabled(chat.id, true).unwrap();
        assert!(db.get_chat(chat.id).unwrap().enabled);
    }

    #[test]
    fn test_close_is_monotonic() {
        let (_dir, db) = open_test_db();
        let chat = sample_chat();
        db.insert_chat(&chat).unwrap();

        db.set_chat_closed(chat.id).unwrap();
        assert!(db.get_chat(chat.id).unwrap().is_closed);

        // Closing again changes nothing; the flag stays set.
        db.set_chat_closed(chat.id).unwrap();
        assert!(db.get_chat(chat.id).unwrap().is_closed);
    }

    #[test]
    fn test_unread_counter_maintenance() {
        let (_dir, db) = open_test_db();
        let chat = sample_chat();
        db.insert_chat(&chat).unwrap();

        // Finder sends twice: claimant's counter goes to 2.
        db.increment_unread_for_other(chat.id, chat.finder_id).unwrap();
        db.increment_unread_for_other(chat.id, chat.finder_id).unwrap();
        let loaded = db.get_chat(chat.id).unwrap();
        assert_eq!(loaded.claimant_unread_count, 2);
        assert_eq!(loaded.finder_unread_count, 0);

        // Claimant reads: their counter zeroes, finder's untouched.
        db.increment_unread_for_other(chat.id, chat.claimant_id).unwrap();
        db.clear_unread(chat.id, chat.claimant_id).unwrap();
        let loaded = db.get_chat(chat.id).unwrap();
        assert_eq!(loaded.claimant_unread_count, 0);
        assert_eq!(loaded.finder_unread_count, 1);
    }
}

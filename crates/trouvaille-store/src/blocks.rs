//! CRUD operations for [`BlockRelationship`] rows.
//!
//! One row per directed `(blocker_id, blocked_id)` pair; no symmetry is
//! implied or maintained.

use chrono::{DateTime, Utc};
use rusqlite::params;

use trouvaille_shared::models::BlockRelationship;
use trouvaille_shared::types::{ChatId, UserId};

use crate::chats::parse_uuid;
use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Idempotent upsert of a directed block edge. Re-blocking an already
    /// blocked user succeeds silently and keeps the original row.
    pub fn upsert_block(&self, block: &BlockRelationship) -> Result<()> {
        self.conn().execute(
            "INSERT INTO blocks (blocker_id, blocked_id, reason, chat_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (blocker_id, blocked_id) DO NOTHING",
            params![
                block.blocker_id.to_string(),
                block.blocked_id.to_string(),
                block.reason,
                block.chat_id.map(|c| c.to_string()),
                block.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete the directed edge if present. Returns `true` if a row was
    /// removed; deleting a non-existent edge is not an error.
    pub fn delete_block(&self, blocker: UserId, blocked: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
            params![blocker.to_string(), blocked.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Existence check of the directed edge a→b.
    pub fn block_exists(&self, blocker: UserId, blocked: UserId) -> Result<bool> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
            params![blocker.to_string(), blocked.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Fetch the directed edge, if present.
    pub fn get_block(&self, blocker: UserId, blocked: UserId) -> Result<Option<BlockRelationship>> {
        let mut stmt = self.conn().prepare(
            "SELECT blocker_id, blocked_id, reason, chat_id, created_at
             FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
        )?;
        let mut rows = stmt.query_map(
            params![blocker.to_string(), blocked.to_string()],
            row_to_block,
        )?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }
}

/// Map a `rusqlite::Row` to a [`BlockRelationship`].
fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlockRelationship> {
    let blocker: String = row.get(0)?;
    let blocked: String = row.get(1)?;
    let chat_id: Option<String> = row.get(3)?;
    let created_str: String = row.get(4)?;

    let chat_id = match chat_id {
        Some(s) => Some(ChatId(parse_uuid(&s, 3)?)),
        None => None,
    };

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(BlockRelationship {
        blocker_id: UserId(parse_uuid(&blocker, 0)?),
        blocked_id: UserId(parse_uuid(&blocked, 1)?),
        reason: row.get(2)?,
        chat_id,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::open_test_db;

    fn edge(blocker: UserId, blocked: UserId) -> BlockRelationship {
        BlockRelationship {
            blocker_id: blocker,
            blocked_id: blocked,
            reason: Some("harassment".into()),
            chat_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_block_is_directed() {
        let (_dir, db) = open_test_db();
        let (a, b) = (UserId::new(), UserId::new());

        db.upsert_block(&edge(a, b)).unwrap();
        assert!(db.block_exists(a, b).unwrap());
        assert!(!db.block_exists(b, a).unwrap());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let (_dir, db) = open_test_db();
        let (a, b) = (UserId::new(), UserId::new());

        db.upsert_block(&edge(a, b)).unwrap();
        let original = db.get_block(a, b).unwrap().unwrap();

        // Second block with a different reason keeps the original row.
        let mut second = edge(a, b);
        second.reason = Some("spam".into());
        db.upsert_block(&second).unwrap();

        assert_eq!(db.get_block(a, b).unwrap().unwrap(), original);
    }

    #[test]
    fn test_delete_block() {
        let (_dir, db) = open_test_db();
        let (a, b) = (UserId::new(), UserId::new());

        db.upsert_block(&edge(a, b)).unwrap();
        assert!(db.delete_block(a, b).unwrap());
        assert!(!db.block_exists(a, b).unwrap());

        // Unblocking when no edge exists is not an error.
        assert!(!db.delete_block(a, b).unwrap());
    }
}

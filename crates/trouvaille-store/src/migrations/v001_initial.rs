//! v001 -- Initial schema creation.
//!
//! Creates the three chat tables: `chats`, `messages`, and `blocks`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Chats
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chats (
    id                    TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    finder_id             TEXT NOT NULL,              -- UUID
    claimant_id           TEXT NOT NULL,              -- UUID
    item_id               TEXT NOT NULL,              -- opaque UUID reference
    claim_id              TEXT NOT NULL,              -- opaque UUID reference
    enabled               INTEGER NOT NULL DEFAULT 1, -- bool, admin-toggled
    is_closed             INTEGER NOT NULL DEFAULT 0, -- bool, monotonic
    finder_unread_count   INTEGER NOT NULL DEFAULT 0,
    claimant_unread_count INTEGER NOT NULL DEFAULT 0,

    CHECK (finder_unread_count >= 0),
    CHECK (claimant_unread_count >= 0)
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id           TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    chat_id      TEXT NOT NULL,              -- FK -> chats(id)
    sender_id    TEXT NOT NULL,              -- one of the chat participants
    message_text TEXT NOT NULL,              -- plaintext or base64 blob
    is_encrypted INTEGER NOT NULL DEFAULT 0,
    is_read      INTEGER NOT NULL DEFAULT 0,
    is_deleted   INTEGER NOT NULL DEFAULT 0, -- soft delete
    created_at   TEXT NOT NULL,              -- ISO-8601 / RFC-3339

    FOREIGN KEY (chat_id) REFERENCES chats(id)
);

CREATE INDEX IF NOT EXISTS idx_messages_chat_created
    ON messages(chat_id, created_at, id);

-- ----------------------------------------------------------------
-- Blocks (directed, one row per ordered pair)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS blocks (
    blocker_id TEXT NOT NULL,  -- UUID
    blocked_id TEXT NOT NULL,  -- UUID
    reason     TEXT,
    chat_id    TEXT,           -- originating chat, nullable
    created_at TEXT NOT NULL,

    PRIMARY KEY (blocker_id, blocked_id)
);
"#;

/// Apply the migration.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}

//! Shared helpers for the in-crate tests.

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use trouvaille_shared::models::{Chat, Message};
use trouvaille_shared::types::{ChatId, ClaimId, ItemId, MessageId, UserId};

use crate::database::Database;

/// Open a fresh database in a temp dir. The dir must outlive the handle.
pub fn open_test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("test.db")).unwrap();
    (dir, db)
}

pub fn sample_chat() -> Chat {
    Chat {
        id: ChatId::new(),
        finder_id: UserId::new(),
        claimant_id: UserId::new(),
        item_id: ItemId(Uuid::new_v4()),
        claim_id: ClaimId(Uuid::new_v4()),
        enabled: true,
        is_closed: false,
        finder_unread_count: 0,
        claimant_unread_count: 0,
    }
}

pub fn sample_message(chat: &Chat, sender: UserId, text: &str) -> Message {
    Message {
        id: MessageId::new(),
        chat_id: chat.id,
        sender_id: sender,
        message_text: text.to_string(),
        is_encrypted: false,
        is_read: false,
        is_deleted: false,
        // Nanosecond precision keeps consecutive test messages ordered.
        created_at: Utc::now(),
    }
}

//! Shared helpers for the in-crate tests.

use std::sync::Arc;

use tempfile::TempDir;
use uuid::Uuid;

use trouvaille_shared::models::Chat;
use trouvaille_shared::types::{ChatId, ClaimId, ItemId, UserId};
use trouvaille_shared::MemoryKeyStore;
use trouvaille_store::Database;

use crate::core::ChatCore;

/// A core over a fresh temp-dir database and an in-memory key store.
/// The dir must outlive the core.
pub fn test_core() -> (TempDir, ChatCore) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("test.db")).unwrap();
    let core = ChatCore::new(db, Arc::new(MemoryKeyStore::new()));
    (dir, core)
}

/// A chat row not yet persisted anywhere, for pure-state tests.
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

/// A chat created through the core, with its participants handy.
pub struct TestChat {
    pub chat: Chat,
    pub finder: UserId,
    pub claimant: UserId,
}

impl TestChat {
    pub fn create(core: &ChatCore) -> Self {
        let finder = UserId::new();
        let claimant = UserId::new();
        let chat = core
            .create_chat(
                finder,
                claimant,
                ItemId(Uuid::new_v4()),
                ClaimId(Uuid::new_v4()),
            )
            .unwrap();
        Self {
            chat,
            finder,
            claimant,
        }
    }
}

//! The [`ChatCore`] handle shared by every operation.
//!
//! Holds the row store behind a mutex (rusqlite connections are not
//! `Sync`), the injected key-store capability, and the feed publisher.
//! Cloning is cheap; all fields are shared.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::broadcast;

use trouvaille_shared::constants::SUBSCRIPTION_CAPACITY;
use trouvaille_shared::events::{FeedEvent, RowChange};
use trouvaille_shared::models::Chat;
use trouvaille_shared::types::{ChatId, ClaimId, ItemId, UserId};
use trouvaille_shared::KeyStore;
use trouvaille_store::{Database, StoreError};

use crate::error::ChatError;

#[derive(Clone)]
pub struct ChatCore {
    db: Arc<Mutex<Database>>,
    keys: Arc<dyn KeyStore>,
    feed: broadcast::Sender<FeedEvent>,
}

impl ChatCore {
    pub fn new(db: Database, keys: Arc<dyn KeyStore>) -> Self {
        let (feed, _) = broadcast::channel(SUBSCRIPTION_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(db)),
            keys,
            feed,
        }
    }

    /// Run a closure against the store, mapping failures into the chat
    /// error taxonomy (missing rows stay `NotFound`, everything else is a
    /// retryable `Network` error).
    pub(crate) fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, StoreError>,
    ) -> Result<T, ChatError> {
        let guard = self
            .db
            .lock()
            .map_err(|_| ChatError::Network("store lock poisoned".into()))?;
        f(&guard).map_err(ChatError::from)
    }

    pub(crate) fn keys(&self) -> &Arc<dyn KeyStore> {
        &self.keys
    }

    /// Publish an event on the push feed. A feed with no subscribers
    /// simply drops the event.
    pub(crate) fn publish(&self, event: FeedEvent) {
        if self.feed.send(event).is_err() {
            tracing::debug!("no feed subscribers, event dropped");
        }
    }

    pub(crate) fn feed_receiver(&self) -> broadcast::Receiver<FeedEvent> {
        self.feed.subscribe()
    }

    /// Create the chat for an approved claim (invoked by the external
    /// claims workflow). Starts enabled, open, with zeroed counters.
    pub fn create_chat(
        &self,
        finder: UserId,
        claimant: UserId,
        item: ItemId,
        claim: ClaimId,
    ) -> Result<Chat, ChatError> {
        let chat = Chat {
            id: ChatId::new(),
            finder_id: finder,
            claimant_id: claimant,
            item_id: item,
            claim_id: claim,
            enabled: true,
            is_closed: false,
            finder_unread_count: 0,
            claimant_unread_count: 0,
        };
        self.with_db(|db| db.insert_chat(&chat))?;
        tracing::info!(chat_id = %chat.id, item_id = %item, "chat created");
        self.publish(FeedEvent::Chat(RowChange::Insert(chat.clone())));
        Ok(chat)
    }

    /// Administrative enable/disable flip (moderation action). The core
    /// only observes the resulting derived state; this is the external
    /// actor's entry point.
    pub fn admin_set_enabled(&self, chat_id: ChatId, enabled: bool) -> Result<Chat, ChatError> {
        self.with_db(|db| db.set_chat_enabled(chat_id, enabled))?;
        let chat = self.with_db(|db| db.get_chat(chat_id))?;
        tracing::info!(chat_id = %chat_id, enabled, "chat enabled flag flipped");
        self.publish(FeedEvent::Chat(RowChange::Update(chat.clone())));
        Ok(chat)
    }

    /// Fetch the current chat row.
    pub fn get_chat(&self, chat_id: ChatId) -> Result<Chat, ChatError> {
        self.with_db(|db| db.get_chat(chat_id))
    }

    /// Enable encryption for a chat on this device: generate and persist a
    /// key if none exists. Sends encrypt iff a key is present.
    pub fn enable_encryption(&self, chat_id: ChatId) -> Result<(), ChatError> {
        if self.keys.get(chat_id)?.is_none() {
            let key = trouvaille_shared::crypto::generate_chat_key();
            self.keys.put(chat_id, &key)?;
            tracing::info!(chat_id = %chat_id, "chat key generated");
        }
        Ok(())
    }

    /// Erase this device's key for a chat. Subsequent sends go plaintext;
    /// previously encrypted messages render as the unavailable sentinel.
    pub fn disable_encryption(&self, chat_id: ChatId) -> Result<(), ChatError> {
        self.keys.delete(chat_id)?;
        Ok(())
    }

    pub(crate) fn now() -> chrono::DateTime<Utc> {
        Utc::now()
    }
}

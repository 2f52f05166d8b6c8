//! Per-chat session state: the client's local view of one conversation.
//!
//! A session holds the decoded message list, the viewer's unread count,
//! the derived lifecycle state, and the local block flags. All mutations
//! go through a per-chat `tokio::sync::Mutex`, so the background
//! synchronizer and foreground reads never interleave mid-update.
//! Different chats share no mutable state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};

use trouvaille_shared::constants::{
    SENTINEL_DECRYPT_FAILED, SENTINEL_KEY_MISSING, SUBSCRIPTION_CAPACITY,
};
use trouvaille_shared::crypto;
use trouvaille_shared::models::{Chat, Message};
use trouvaille_shared::types::{ChatId, MessageId, UserId};
use trouvaille_shared::KeyStore;

use crate::core::ChatCore;
use crate::error::ChatError;
use crate::gate::Eligibility;
use crate::lifecycle::ChatState;
use crate::sync::spawn_synchronizer;

/// A message as rendered in the session: payload already decoded (or
/// replaced by a sentinel), soft-deleted rows excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub text: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// One-shot notifications surfaced to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// A message became visible in the session.
    NewMessage {
        chat_id: ChatId,
        message_id: MessageId,
    },
    /// The chat transitioned into SUSPENDED. Not repeated while the state
    /// is re-asserted by duplicate deliveries.
    Suspended { chat_id: ChatId },
    /// The chat transitioned into CLOSED. At most once per session.
    Closed { chat_id: ChatId },
    /// Send eligibility changed (block added/removed, lifecycle moved);
    /// the input surface should reflect it without a reload.
    EligibilityChanged {
        chat_id: ChatId,
        eligibility: Eligibility,
    },
}

/// The mutable local view of one chat.
pub struct SessionState {
    pub(crate) viewer: UserId,
    pub(crate) chat: Chat,
    pub(crate) state: ChatState,
    pub(crate) messages: Vec<SessionMessage>,
    /// Viewer's unread count, maintained incrementally and recomputed from
    /// the message list whenever an event payload contradicts it.
    pub(crate) unread: u32,
    pub(crate) blocked_by_other: bool,
    pub(crate) blocked_other: bool,
    pub(crate) eligibility: Eligibility,
    pub(crate) closed_notified: bool,
}

impl SessionState {
    pub(crate) fn new(
        viewer: UserId,
        chat: Chat,
        raw_messages: &[Message],
        keys: &dyn KeyStore,
        blocked_by_other: bool,
        blocked_other: bool,
    ) -> Self {
        let messages: Vec<SessionMessage> = raw_messages
            .iter()
            .filter(|m| !m.is_deleted)
            .map(|m| decode_message(keys, m))
            .collect();

        let state = ChatState::derive(&chat);
        let mut session = Self {
            viewer,
            chat,
            state,
            messages,
            unread: 0,
            blocked_by_other,
            blocked_other,
            eligibility: Eligibility::Allowed,
            closed_notified: state == ChatState::Closed,
        };
        session.unread = session.count_unread();
        session.eligibility = session.local_eligibility();
        session
    }

    pub fn viewer(&self) -> UserId {
        self.viewer
    }

    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn messages(&self) -> &[SessionMessage] {
        &self.messages
    }

    pub fn unread(&self) -> u32 {
        self.unread
    }

    pub fn eligibility(&self) -> Eligibility {
        self.eligibility
    }

    /// Ground-truth unread count derived from the local message list.
    pub(crate) fn count_unread(&self) -> u32 {
        self.messages
            .iter()
            .filter(|m| m.sender_id != self.viewer && !m.is_read)
            .count() as u32
    }

    /// Eligibility derived purely from the local view, used to refresh the
    /// input surface without a round trip.
    pub(crate) fn local_eligibility(&self) -> Eligibility {
        use crate::error::StateReason;
        match self.state {
            ChatState::Closed => Eligibility::Denied(StateReason::Closed),
            ChatState::Suspended => Eligibility::Denied(StateReason::Suspended),
            ChatState::Open => {
                if self.blocked_by_other {
                    Eligibility::Denied(StateReason::BlockedByRecipient)
                } else if self.blocked_other {
                    Eligibility::Denied(StateReason::YouBlockedRecipient)
                } else {
                    Eligibility::Allowed
                }
            }
        }
    }

    pub(crate) fn contains_message(&self, id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Insert keeping the `(created_at, id)` total order.
    pub(crate) fn insert_sorted(&mut self, message: SessionMessage) {
        let pos = self
            .messages
            .partition_point(|m| (m.created_at, m.id) < (message.created_at, message.id));
        self.messages.insert(pos, message);
    }
}

/// Decode a raw message row for display. Decryption failures degrade to a
/// sentinel instead of propagating; a conversation renders around them.
pub(crate) fn decode_message(keys: &dyn KeyStore, message: &Message) -> SessionMessage {
    let text = if !message.is_encrypted {
        message.message_text.clone()
    } else {
        match keys.get(message.chat_id) {
            Ok(Some(key)) => match crypto::decrypt(&key, &message.message_text) {
                Ok(plaintext) => plaintext,
                Err(_) => {
                    tracing::warn!(message_id = %message.id, "message failed to decrypt");
                    SENTINEL_DECRYPT_FAILED.to_string()
                }
            },
            Ok(None) => SENTINEL_KEY_MISSING.to_string(),
            Err(e) => {
                tracing::warn!(message_id = %message.id, error = %e, "key store unavailable");
                SENTINEL_KEY_MISSING.to_string()
            }
        }
    };

    SessionMessage {
        id: message.id,
        sender_id: message.sender_id,
        text,
        is_read: message.is_read,
        created_at: message.created_at,
    }
}

/// Handle to an open chat session.
///
/// Owns the background synchronizer task; dropping or closing the handle
/// tears the subscription down, after which no further events are
/// processed for this scope. Other chats' sessions are unaffected.
pub struct ChatSession {
    pub chat_id: ChatId,
    pub state: Arc<Mutex<SessionState>>,
    pub notices: mpsc::Receiver<SessionNotice>,
    sync_task: tokio::task::JoinHandle<()>,
}

impl ChatSession {
    /// Tear the session down explicitly (navigation away).
    pub fn close(self) {
        // Drop does the work.
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.sync_task.abort();
    }
}

impl ChatCore {
    /// Open a session on a chat for one of its participants: load the
    /// snapshot (chat row, decoded messages, block flags), subscribe to
    /// the feed for this chat's scope, and start the synchronizer loop.
    pub fn open_session(
        &self,
        chat_id: ChatId,
        viewer: UserId,
    ) -> Result<ChatSession, ChatError> {
        let chat = self.with_db(|db| db.get_chat(chat_id))?;
        let other = chat
            .other_participant(viewer)
            .ok_or(ChatError::Authorization)?;

        let raw_messages = self.with_db(|db| db.list_messages(chat_id))?;
        let blocked_by_other = self.is_blocked(other, viewer)?;
        let blocked_other = self.is_blocked(viewer, other)?;

        let state = Arc::new(Mutex::new(SessionState::new(
            viewer,
            chat,
            &raw_messages,
            self.keys().as_ref(),
            blocked_by_other,
            blocked_other,
        )));

        let subscription = self.subscribe(chat_id);
        let (notice_tx, notice_rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let sync_task =
            spawn_synchronizer(state.clone(), self.keys().clone(), subscription, notice_tx);

        tracing::debug!(chat_id = %chat_id, viewer = %viewer, "session opened");

        Ok(ChatSession {
            chat_id,
            state,
            notices: notice_rx,
            sync_task,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_core, TestChat};
    use trouvaille_shared::MemoryKeyStore;

    fn raw_message(chat: &Chat, sender: UserId, text: &str, encrypted: bool) -> Message {
        Message {
            id: MessageId::new(),
            chat_id: chat.id,
            sender_id: sender,
            message_text: text.to_string(),
            is_encrypted: encrypted,
            is_read: false,
            is_deleted: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_decode_plaintext_passthrough() {
        let keys = MemoryKeyStore::new();
        let chat = crate::testutil::sample_chat();
        let raw = raw_message(&chat, chat.finder_id, "hello", false);

        assert_eq!(decode_message(&keys, &raw).text, "hello");
    }

    #[test]
    fn test_decode_without_key_uses_sentinel() {
        let keys = MemoryKeyStore::new();
        let chat = crate::testutil::sample_chat();
        let raw = raw_message(&chat, chat.finder_id, "bm90IHJlYWwgY2lwaGVydGV4dA==", true);

        assert_eq!(decode_message(&keys, &raw).text, SENTINEL_KEY_MISSING);
    }

    #[test]
    fn test_decode_failure_uses_sentinel() {
        let keys = MemoryKeyStore::new();
        let chat = crate::testutil::sample_chat();
        // A key exists, but the blob was produced under a different one.
        let other_key = crypto::generate_chat_key();
        let blob = crypto::encrypt(&other_key, "secret").unwrap();
        keys.put(chat.id, &crypto::generate_chat_key()).unwrap();

        let raw = raw_message(&chat, chat.finder_id, &blob, true);
        assert_eq!(decode_message(&keys, &raw).text, SENTINEL_DECRYPT_FAILED);
    }

    #[test]
    fn test_snapshot_unread_and_eligibility() {
        let keys = MemoryKeyStore::new();
        let chat = crate::testutil::sample_chat();
        let viewer = chat.claimant_id;
        let raws = vec![
            raw_message(&chat, chat.finder_id, "a", false),
            raw_message(&chat, chat.finder_id, "b", false),
            raw_message(&chat, viewer, "mine", false),
        ];

        let session = SessionState::new(viewer, chat, &raws, &keys, false, false);
        assert_eq!(session.unread(), 2);
        assert_eq!(session.eligibility(), Eligibility::Allowed);
        assert_eq!(session.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_open_session_requires_participant() {
        let (_dir, core) = test_core();
        let TestChat { chat, .. } = TestChat::create(&core);

        assert!(matches!(
            core.open_session(chat.id, UserId::new()),
            Err(ChatError::Authorization)
        ));
    }
}

//! Realtime synchronizer: applies the push feed to a session's local view.
//!
//! The feed delivers at-least-once, unordered across categories. Every
//! application is idempotent: inserts dedupe by message id, updates merge
//! per field with last-writer-wins semantics, and monotonic facts (a read
//! message, a deleted message, a closed chat) never revert from a stale
//! payload.
//!
//! Each open chat session owns one bounded subscription channel fed by a
//! fan-out task, consumed by a single synchronizer loop. Closing the
//! session stops both; other chats' subscriptions are untouched.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

use trouvaille_shared::constants::SUBSCRIPTION_CAPACITY;
use trouvaille_shared::events::{FeedEvent, RowChange};
use trouvaille_shared::models::{BlockRelationship, Chat, Message};
use trouvaille_shared::types::ChatId;
use trouvaille_shared::KeyStore;

use crate::core::ChatCore;
use crate::lifecycle::ChatState;
use crate::session::{decode_message, SessionNotice, SessionState};

/// A per-chat subscription scope on the push feed.
///
/// Message and chat events are filtered to this chat; block events have no
/// chat scope and pass through for relevance checking downstream.
pub struct FeedSubscription {
    chat_id: ChatId,
    rx: mpsc::Receiver<FeedEvent>,
    forward: JoinHandle<()>,
}

impl FeedSubscription {
    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.rx.recv().await
    }

    /// Stop the subscription; no further events are delivered.
    pub fn close(self) {
        // Drop does the work.
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.forward.abort();
    }
}

impl ChatCore {
    /// Open a subscription scope for one chat.
    pub fn subscribe(&self, chat_id: ChatId) -> FeedSubscription {
        let mut feed_rx = self.feed_receiver();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);

        let forward = tokio::spawn(async move {
            loop {
                match feed_rx.recv().await {
                    Ok(event) => {
                        let relevant = event.scope().map_or(true, |scope| scope == chat_id);
                        if relevant && tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // The session will reconcile from its next snapshot;
                        // at-least-once delivery makes gaps recoverable.
                        tracing::warn!(chat_id = %chat_id, skipped, "feed subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        FeedSubscription {
            chat_id,
            rx,
            forward,
        }
    }
}

/// Run the single-consumer synchronizer loop for one session.
pub(crate) fn spawn_synchronizer(
    state: Arc<Mutex<SessionState>>,
    keys: Arc<dyn KeyStore>,
    mut subscription: FeedSubscription,
    notices: mpsc::Sender<SessionNotice>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            let produced = {
                let mut session = state.lock().await;
                session.apply_event(keys.as_ref(), &event)
            };
            for notice in produced {
                if notices.send(notice).await.is_err() {
                    return;
                }
            }
        }
    })
}

impl SessionState {
    /// Apply one feed event to the local view, returning the notices it
    /// produced. Safe to call with duplicates and stale payloads.
    pub fn apply_event(&mut self, keys: &dyn KeyStore, event: &FeedEvent) -> Vec<SessionNotice> {
        match event {
            FeedEvent::Message(RowChange::Insert(row)) => self.apply_message_insert(keys, row),
            FeedEvent::Message(RowChange::Update(row)) => self.apply_message_update(keys, row),
            FeedEvent::Message(RowChange::Delete(row)) => self.apply_message_removed(row),
            FeedEvent::Chat(RowChange::Insert(row)) | FeedEvent::Chat(RowChange::Update(row)) => {
                self.apply_chat_update(row)
            }
            FeedEvent::Chat(RowChange::Delete(row)) => {
                // Chats are never deleted; a delete event is a feed anomaly.
                tracing::warn!(chat_id = %row.id, "ignoring chat delete event");
                Vec::new()
            }
            FeedEvent::Block(RowChange::Insert(row)) => self.apply_block(row, true),
            FeedEvent::Block(RowChange::Delete(row)) => self.apply_block(row, false),
            FeedEvent::Block(RowChange::Update(row)) => {
                // Block rows are created and destroyed, never updated.
                tracing::debug!(blocker = %row.blocker_id, "ignoring block update event");
                Vec::new()
            }
        }
    }

    fn apply_message_insert(&mut self, keys: &dyn KeyStore, row: &Message) -> Vec<SessionNotice> {
        if row.chat_id != self.chat.id || row.is_deleted {
            return Vec::new();
        }
        // At-least-once delivery: the same insert may arrive twice.
        if self.contains_message(row.id) {
            tracing::debug!(message_id = %row.id, "duplicate insert event ignored");
            return Vec::new();
        }

        let decoded = decode_message(keys, row);
        let counts_as_unread = row.sender_id != self.viewer && !row.is_read;
        self.insert_sorted(decoded);
        if counts_as_unread {
            self.unread += 1;
        }

        vec![SessionNotice::NewMessage {
            chat_id: self.chat.id,
            message_id: row.id,
        }]
    }

    fn apply_message_update(&mut self, keys: &dyn KeyStore, row: &Message) -> Vec<SessionNotice> {
        if row.chat_id != self.chat.id {
            return Vec::new();
        }
        if row.is_deleted {
            return self.apply_message_removed(row);
        }

        let Some(local) = self.messages.iter_mut().find(|m| m.id == row.id) else {
            // The update outran (or replaced) its insert; seed the row.
            return self.apply_message_insert(keys, row);
        };

        // Per-field last-writer-wins. is_read is monotonic: a stale
        // payload must not revert an already-read message to unread.
        if row.is_read && !local.is_read {
            local.is_read = true;
            if row.sender_id != self.viewer {
                self.unread = self.unread.saturating_sub(1);
            }
        }
        // The payload is immutable once created; text changes are ignored.
        Vec::new()
    }

    fn apply_message_removed(&mut self, row: &Message) -> Vec<SessionNotice> {
        if row.chat_id != self.chat.id {
            return Vec::new();
        }
        let Some(pos) = self.messages.iter().position(|m| m.id == row.id) else {
            return Vec::new();
        };
        let removed = self.messages.remove(pos);
        if removed.sender_id != self.viewer && !removed.is_read {
            self.unread = self.unread.saturating_sub(1);
        }
        Vec::new()
    }

    fn apply_chat_update(&mut self, row: &Chat) -> Vec<SessionNotice> {
        if row.id != self.chat.id {
            return Vec::new();
        }

        let previous = self.state;
        let mut merged = row.clone();
        // is_closed is monotonic; a stale update cannot reopen the chat.
        merged.is_closed |= self.chat.is_closed;
        self.chat = merged;
        self.state = ChatState::derive(&self.chat);

        // The denormalized counter rides along on chat events. It is a
        // maintained invariant, not an authority: on contradiction we
        // recompute from the raw message list instead of trusting it.
        if let Some(advertised) = self.chat.unread_count_for(self.viewer) {
            if advertised != self.unread {
                let recomputed = self.count_unread();
                if advertised != recomputed {
                    tracing::warn!(
                        chat_id = %self.chat.id,
                        advertised,
                        recomputed,
                        "unread counter contradiction, using recomputed value"
                    );
                }
                self.unread = recomputed;
            }
        }

        let mut notices = Vec::new();
        if self.state != previous {
            match self.state {
                ChatState::Suspended => {
                    notices.push(SessionNotice::Suspended {
                        chat_id: self.chat.id,
                    });
                }
                ChatState::Closed if !self.closed_notified => {
                    self.closed_notified = true;
                    notices.push(SessionNotice::Closed {
                        chat_id: self.chat.id,
                    });
                }
                _ => {}
            }
        }
        notices.extend(self.refresh_eligibility());
        notices
    }

    fn apply_block(&mut self, row: &BlockRelationship, blocked: bool) -> Vec<SessionNotice> {
        let Some(other) = self.chat.other_participant(self.viewer) else {
            return Vec::new();
        };

        if row.blocker_id == other && row.blocked_id == self.viewer {
            self.blocked_by_other = blocked;
        } else if row.blocker_id == self.viewer && row.blocked_id == other {
            self.blocked_other = blocked;
        } else {
            // Involves someone outside this conversation.
            return Vec::new();
        }
        self.refresh_eligibility()
    }

    fn refresh_eligibility(&mut self) -> Vec<SessionNotice> {
        let current = self.local_eligibility();
        if current == self.eligibility {
            return Vec::new();
        }
        self.eligibility = current;
        vec![SessionNotice::EligibilityChanged {
            chat_id: self.chat.id,
            eligibility: current,
        }]
    }
}

//! # trouvaille-chat
//!
//! The secure chat session core: lifecycle state machine, block gate,
//! message stream with unread accounting, and the realtime synchronizer
//! that reconciles a client's local view with the push feed.
//!
//! [`ChatCore`] is the single entry point. It owns the row store handle,
//! the injected [`KeyStore`] capability, and the feed publisher; the
//! per-concern operations live in their own modules as `impl ChatCore`
//! blocks (`lifecycle`, `gate`, `stream`, `session`).
//!
//! [`KeyStore`]: trouvaille_shared::KeyStore

pub mod core;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod session;
pub mod stream;
pub mod sync;

#[cfg(test)]
pub(crate) mod testutil;

pub use crate::core::ChatCore;
pub use error::{ChatError, StateReason};
pub use gate::Eligibility;
pub use lifecycle::{ChatState, CloseOutcome};
pub use session::{ChatSession, SessionMessage, SessionNotice, SessionState};
pub use sync::FeedSubscription;

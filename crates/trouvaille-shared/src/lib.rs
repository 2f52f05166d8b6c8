//! # trouvaille-shared
//!
//! Types shared by every Trouvaille crate: domain identifiers, policy
//! constants, the message codec (XChaCha20-Poly1305), the per-chat key
//! store, the domain models mirrored by the row store, and the feed-event
//! shapes pushed by the transport.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod events;
pub mod keystore;
pub mod models;
pub mod types;

pub use crypto::ChatKey;
pub use error::{CryptoError, KeyStoreError};
pub use events::{FeedEvent, RowChange};
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
pub use models::{BlockRelationship, Chat, Message};
pub use types::{ChatId, ClaimId, ItemId, MessageId, UserId};

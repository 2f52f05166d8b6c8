//! # trouvaille-store
//!
//! Local row store for the Trouvaille chat core, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection` with typed CRUD helpers for the three chat
//! tables: `chats`, `messages`, and `blocks`. Higher layers treat it as
//! the row store behind the push feed; every mutation here has a matching
//! feed event published by the caller.

pub mod blocks;
pub mod chats;
pub mod database;
pub mod messages;
pub mod migrations;

mod error;

#[cfg(test)]
pub(crate) mod testutil;

pub use database::Database;
pub use error::StoreError;

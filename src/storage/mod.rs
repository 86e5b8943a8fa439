//! Storage layer for the meta store
//!
//! One SQLite table per namespace holds `meta_key -> meta_value` rows with a
//! `modify_at` timestamp. Everything here borrows a caller-owned connection.

pub mod meta;
pub mod migrations;
pub mod secret;
pub mod sqlite;
pub mod stmt;
pub mod tx;

pub use meta::{Fetched, MetaRow, MetaStore};
pub use migrations::{CURRENT_REVISION, revision_key};
pub use secret::{KeyAlgorithm, KeyFetch, RotatingKey};
pub use sqlite::Database;
pub use tx::{MetaTx, RowLock};

/// Current time in unix seconds, the unit of `modify_at`.
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

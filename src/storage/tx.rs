//! Row-scoped locks inside a caller-owned transaction.
//!
//! The `modify_at` column doubles as the lock token: a locking read takes the
//! database writer lock and returns the row's timestamp, and
//! [`MetaTx::unlock`] stamps a fresh timestamp once the guarded work is done.
//! Nothing here releases a lock. The lock ends when the enclosing
//! [`rusqlite::Transaction`] commits or rolls back.

use rusqlite::{OptionalExtension, Transaction, params};
use tracing::debug;

use crate::error::{MetaStoreError, Result};
use crate::storage::meta::store_row;
use crate::storage::{stmt, unix_now};

/// Meta store operations bound to a transaction.
#[derive(Debug)]
pub struct MetaTx<'t> {
    table: &'t str,
    tx: &'t Transaction<'t>,
}

/// A held row lock.
///
/// Borrows the [`MetaTx`] it came from, so it cannot outlive the transaction.
/// Dropping the guard does not release the row; committing or rolling back
/// the transaction does.
#[derive(Debug)]
#[must_use = "a row lock is held until the transaction ends"]
pub struct RowLock<'a> {
    meta_tx: &'a MetaTx<'a>,
    key: String,
    modify_at: i64,
}

impl<'t> MetaTx<'t> {
    pub fn new(tx: &'t Transaction<'t>, table: &'t str) -> Result<Self> {
        stmt::validate_table_name(table)?;
        Ok(Self { table, tx })
    }

    /// Lock the row for `meta_key` if it exists.
    ///
    /// A missing row is `Ok(None)`. The writer lock is taken either way, so a
    /// caller may go on to create the row without racing another locker.
    pub fn optional_lock(&self, meta_key: &str) -> Result<Option<RowLock<'_>>> {
        let modify_at = self
            .tx
            .query_row(&stmt::lock_modify_time(self.table), [meta_key], |row| {
                row.get::<_, i64>(0)
            })
            .optional()
            .map_err(|err| MetaStoreError::from_sqlite(self.table, err))?;
        debug!(table = self.table, key = meta_key, found = modify_at.is_some(), "row lock");
        Ok(modify_at.map(|modify_at| RowLock {
            meta_tx: self,
            key: meta_key.to_string(),
            modify_at,
        }))
    }

    /// Lock the row for `meta_key`, which must exist.
    pub fn required_lock(&self, meta_key: &str) -> Result<RowLock<'_>> {
        self.optional_lock(meta_key)?
            .ok_or_else(|| MetaStoreError::NotFound {
                table: self.table.to_string(),
                key: meta_key.to_string(),
            })
    }

    /// Stamp `modify_at = now` on the row to mark the guarded work as done.
    ///
    /// The database lock is still held afterwards.
    pub fn unlock(&self, meta_key: &str) -> Result<i64> {
        let modify_at = unix_now();
        self.tx
            .execute(
                &stmt::touch_modify_time(self.table),
                params![modify_at, meta_key],
            )
            .map_err(|err| MetaStoreError::from_sqlite(self.table, err))?;
        Ok(modify_at)
    }

    /// Upsert an integer value inside the transaction.
    pub fn store_i64(&self, meta_key: &str, value: i64) -> Result<()> {
        store_row(self.tx, self.table, meta_key, &value.to_string())
    }
}

impl RowLock<'_> {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Timestamp read when the lock was taken.
    #[must_use]
    pub const fn modify_at(&self) -> i64 {
        self.modify_at
    }

    /// See [`MetaTx::unlock`]. Returns the new timestamp.
    pub fn unlock(self) -> Result<i64> {
        self.meta_tx.unlock(&self.key)
    }
}

//! Typed key-value access to a single meta store table.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, warn};

use crate::error::{MetaStoreError, Result};
use crate::storage::{migrations, stmt, unix_now};

/// A raw meta row as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaRow {
    pub value: String,
    /// Unix seconds of the last write.
    pub modify_at: i64,
}

/// A typed value together with the timestamp of the row it came from.
///
/// `modify_at` is 0 when the row does not exist and the default was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fetched<T> {
    pub value: T,
    pub modify_at: i64,
}

/// Meta information store bound to one table on a borrowed connection.
#[derive(Debug, Clone, Copy)]
pub struct MetaStore<'c> {
    table: &'c str,
    conn: &'c Connection,
}

impl<'c> MetaStore<'c> {
    /// Bind to `table` on `conn`. The table does not have to exist yet.
    pub fn new(conn: &'c Connection, table: &'c str) -> Result<Self> {
        stmt::validate_table_name(table)?;
        Ok(Self { table, conn })
    }

    #[must_use]
    pub const fn table(&self) -> &'c str {
        self.table
    }

    pub(crate) const fn conn(&self) -> &'c Connection {
        self.conn
    }

    /// Read a row. A missing row is `Ok(None)`; a missing table is
    /// [`MetaStoreError::TableMissing`].
    pub fn fetch(&self, meta_key: &str) -> Result<Option<MetaRow>> {
        fetch_row(self.conn, self.table, meta_key)
    }

    /// Insert `meta_value` unless `meta_key` already exists (first write wins).
    pub fn initialize(&self, meta_key: &str, meta_value: &str) -> Result<()> {
        stmt::validate_meta_key(meta_key)?;
        let inserted = self
            .conn
            .execute(
                &stmt::init_meta_value(self.table),
                params![meta_key, meta_value, unix_now()],
            )
            .map_err(|err| MetaStoreError::from_sqlite(self.table, err))?;
        debug!(table = self.table, key = meta_key, inserted = inserted > 0, "initialize meta value");
        Ok(())
    }

    /// Upsert `meta_value` and stamp `modify_at` with the current time.
    pub fn store(&self, meta_key: &str, meta_value: &str) -> Result<()> {
        store_row(self.conn, self.table, meta_key, meta_value)
    }

    /// `"1"` reads as true, any other stored text as false.
    pub fn fetch_bool(&self, meta_key: &str, default: bool) -> Result<Fetched<bool>> {
        Ok(match self.fetch(meta_key)? {
            Some(row) => Fetched {
                value: row.value == "1",
                modify_at: row.modify_at,
            },
            None => Fetched {
                value: default,
                modify_at: 0,
            },
        })
    }

    pub fn store_bool(&self, meta_key: &str, value: bool) -> Result<()> {
        self.store(meta_key, encode_bool(value))
    }

    /// Reads a base-10 `i32`.
    ///
    /// Stored text that does not parse (or is out of range) yields `default`
    /// rather than an error. Callers relying on a strict read should use
    /// [`MetaStore::fetch`].
    pub fn fetch_i32(&self, meta_key: &str, default: i32) -> Result<Fetched<i32>> {
        self.fetch_parsed(meta_key, default)
    }

    pub fn store_i32(&self, meta_key: &str, value: i32) -> Result<()> {
        self.store(meta_key, &value.to_string())
    }

    /// Reads a base-10 `i64`, falling back to `default` like [`MetaStore::fetch_i32`].
    pub fn fetch_i64(&self, meta_key: &str, default: i64) -> Result<Fetched<i64>> {
        self.fetch_parsed(meta_key, default)
    }

    pub fn store_i64(&self, meta_key: &str, value: i64) -> Result<()> {
        self.store(meta_key, &value.to_string())
    }

    /// Revision recorded under `meta_key`; 0 means no revision recorded.
    pub fn fetch_revision(&self, meta_key: &str) -> Result<Fetched<i32>> {
        self.fetch_i32(meta_key, 0)
    }

    pub fn store_revision(&self, meta_key: &str, revision: i32) -> Result<()> {
        self.store_i32(meta_key, revision)
    }

    /// Move a revision recorded under `legacy_key` to this table's scoped
    /// revision key.
    ///
    /// Returns whether a row was moved. Safe to call on every start: a
    /// missing legacy row or a missing table is a no-op, and an existing
    /// scoped revision is never overwritten.
    pub fn migrate_legacy_revision_key(&self, legacy_key: &str) -> Result<bool> {
        match self.fetch(legacy_key) {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(false),
            Err(err) if err.is_table_missing() => {
                warn!(table = self.table, legacy_key, "meta store table missing; legacy revision key not migrated");
                return Ok(false);
            }
            Err(err) => return Err(err),
        }
        let moved = self
            .conn
            .execute(
                &stmt::migrate_legacy_revision_key(self.table),
                params![migrations::revision_key(self.table), legacy_key],
            )
            .map_err(|err| MetaStoreError::from_sqlite(self.table, err))?;
        debug!(table = self.table, legacy_key, moved, "migrated legacy revision key");
        Ok(moved > 0)
    }

    fn fetch_parsed<T>(&self, meta_key: &str, default: T) -> Result<Fetched<T>>
    where
        T: std::str::FromStr,
    {
        Ok(match self.fetch(meta_key)? {
            Some(row) => Fetched {
                value: decode_or(&row.value, default),
                modify_at: row.modify_at,
            },
            None => Fetched {
                value: default,
                modify_at: 0,
            },
        })
    }
}

pub(crate) fn fetch_row(conn: &Connection, table: &str, meta_key: &str) -> Result<Option<MetaRow>> {
    conn.query_row(&stmt::fetch_meta_value(table), [meta_key], |row| {
        Ok(MetaRow {
            value: row.get(0)?,
            modify_at: row.get(1)?,
        })
    })
    .optional()
    .map_err(|err| MetaStoreError::from_sqlite(table, err))
}

pub(crate) fn store_row(conn: &Connection, table: &str, meta_key: &str, meta_value: &str) -> Result<()> {
    stmt::validate_meta_key(meta_key)?;
    conn.execute(
        &stmt::store_meta_value(table),
        params![meta_key, meta_value, unix_now()],
    )
    .map_err(|err| MetaStoreError::from_sqlite(table, err))?;
    Ok(())
}

const fn encode_bool(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn decode_or<T: std::str::FromStr>(text: &str, default: T) -> T {
    text.parse().unwrap_or(default)
}

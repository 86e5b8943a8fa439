//! SQLite connection wrapper

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::error::Result;
use crate::storage::meta::MetaStore;

/// Lock wait applied when none is configured.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Owned SQLite connection that meta stores borrow.
pub struct Database {
    conn: Connection,
    in_memory: bool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("in_memory", &self.in_memory)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open database at `path`, waiting up to `busy_timeout` for locks held
    /// by other connections.
    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::configure_pragmas(&conn, true)?;
        debug!(path = %path.display(), ?busy_timeout, "opened meta store database");

        Ok(Self {
            conn,
            in_memory: false,
        })
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_pragmas(&conn, false)?;
        Ok(Self {
            conn,
            in_memory: true,
        })
    }

    /// Get a reference to the connection
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    pub const fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Meta store over `table` on this connection.
    pub fn meta_store<'a>(&'a self, table: &'a str) -> Result<MetaStore<'a>> {
        MetaStore::new(&self.conn, table)
    }

    /// Begin a transaction that takes the writer lock up front.
    ///
    /// Row locks taken through [`crate::storage::MetaTx`] live until this
    /// transaction commits or rolls back.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    fn configure_pragmas(conn: &Connection, wal: bool) -> Result<()> {
        if wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }
}

//! Meta store schema revisions.
//!
//! Each table records its own revision as a meta row under
//! [`revision_key`]. A missing row (or a missing table) is revision 0.

use rusqlite::{Transaction, TransactionBehavior, params};
use tracing::{debug, info};

use crate::error::{MetaStoreError, Result};
use crate::storage::meta::MetaStore;
use crate::storage::{stmt, unix_now};

/// Prefix of the per-table revision key.
pub const REVISION_KEY_PREFIX: &str = "meta-store.schema";

/// Revision every table is brought to.
pub const CURRENT_REVISION: i32 = 2;

/// One step of the migration table.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub from: i32,
    pub to: i32,
    pub description: &'static str,
    sql: fn(&str) -> String,
}

impl Migration {
    #[must_use]
    pub fn sql(&self, table: &str) -> String {
        (self.sql)(table)
    }
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        from: 0,
        to: CURRENT_REVISION,
        description: "create meta store table",
        sql: stmt::create_meta_store,
    },
    Migration {
        from: 1,
        to: 2,
        description: "restrict meta_key to ASCII",
        sql: stmt::migrate_meta_store_to_rev2,
    },
];

/// Key holding the schema revision of `table`.
#[must_use]
pub fn revision_key(table: &str) -> String {
    format!("{REVISION_KEY_PREFIX}:{table}")
}

/// Migration that starts at `revision`, if any.
#[must_use]
pub fn migration_from(revision: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.from == revision)
}

impl MetaStore<'_> {
    /// Current schema revision; 0 when the table or the revision row is absent.
    pub fn schema_revision(&self) -> Result<i32> {
        match self.fetch_revision(&revision_key(self.table())) {
            Ok(fetched) => Ok(fetched.value),
            Err(err) if err.is_table_missing() => Ok(0),
            Err(err) => Err(err),
        }
    }

    /// Bring the table to [`CURRENT_REVISION`].
    ///
    /// Returns whether the schema changed. Idempotent, and meant to run on
    /// every process start. At most one migration step is applied per call;
    /// if the table is still not current afterwards the call fails with
    /// [`MetaStoreError::SchemaInconsistent`].
    pub fn prepare_schema(&self) -> Result<bool> {
        let table = self.table();
        let revision = self.schema_revision()?;
        if revision == CURRENT_REVISION {
            debug!(table, revision, "meta store schema up to date");
            return Ok(false);
        }

        // Re-read even when nothing changed: another writer may have
        // migrated the table while this call waited for the writer lock.
        let changed = self.upgrade_schema()?;
        let revision = self.schema_revision()?;
        if revision != CURRENT_REVISION {
            return Err(MetaStoreError::SchemaInconsistent {
                table: table.to_string(),
                found: revision,
                expected: CURRENT_REVISION,
            });
        }
        Ok(changed)
    }

    /// Apply the single migration step matching the stored revision.
    ///
    /// The step runs in one `BEGIN IMMEDIATE` transaction together with the
    /// revision update. The revision is read again under the writer lock, so
    /// a concurrent migrator that got there first turns this into a no-op.
    fn upgrade_schema(&self) -> Result<bool> {
        let table = self.table();
        let tx = Transaction::new_unchecked(self.conn(), TransactionBehavior::Immediate)
            .map_err(|err| MetaStoreError::from_sqlite(table, err))?;

        let revision = MetaStore::new(&tx, table)?.schema_revision()?;
        if revision == CURRENT_REVISION {
            debug!(table, "meta store schema upgraded by another writer");
            tx.commit()?;
            return Ok(false);
        }
        let migration = migration_from(revision).ok_or_else(|| MetaStoreError::UnknownRevision {
            table: table.to_string(),
            revision,
        })?;

        let failed = |source: rusqlite::Error| MetaStoreError::MigrationFailed {
            table: table.to_string(),
            revision,
            source,
        };
        tx.execute_batch(&migration.sql(table)).map_err(failed)?;
        tx.execute(
            &stmt::store_meta_value(table),
            params![revision_key(table), migration.to.to_string(), unix_now()],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;

        info!(
            table,
            from = migration.from,
            to = migration.to,
            step = migration.description,
            "meta store schema migrated"
        );
        Ok(true)
    }
}

//! SQL text for the meta store table.
//!
//! Table names are spliced into statements, so every builder expects a name
//! that already passed [`validate_table_name`].

use crate::error::{MetaStoreError, Result};

/// Longest accepted table name, in bytes.
pub const MAX_TABLE_NAME_LEN: usize = 64;

/// Longest accepted meta key, in bytes.
pub const MAX_META_KEY_LEN: usize = 128;

/// Accepts `[A-Za-z_][A-Za-z0-9_]*` up to [`MAX_TABLE_NAME_LEN`] bytes.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_head || !valid_tail || name.len() > MAX_TABLE_NAME_LEN {
        return Err(MetaStoreError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

/// Meta keys are non-empty ASCII of at most [`MAX_META_KEY_LEN`] bytes.
pub fn validate_meta_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        "empty key"
    } else if !key.is_ascii() {
        "key must be ASCII"
    } else if key.len() > MAX_META_KEY_LEN {
        "key longer than 128 bytes"
    } else {
        return Ok(());
    };
    Err(MetaStoreError::InvalidMetaKey {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

pub fn init_meta_value(table: &str) -> String {
    format!(
        "INSERT OR IGNORE INTO \"{table}\" (meta_key, meta_value, modify_at) VALUES (?1, ?2, ?3)"
    )
}

pub fn fetch_meta_value(table: &str) -> String {
    format!("SELECT meta_value, modify_at FROM \"{table}\" WHERE meta_key = ?1")
}

pub fn store_meta_value(table: &str) -> String {
    format!(
        "INSERT INTO \"{table}\" (meta_key, meta_value, modify_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(meta_key) DO UPDATE SET \
         meta_value = excluded.meta_value, modify_at = excluded.modify_at"
    )
}

/// No-op write that takes the writer lock and returns the row's timestamp.
pub fn lock_modify_time(table: &str) -> String {
    format!(
        "UPDATE \"{table}\" SET modify_at = modify_at WHERE meta_key = ?1 RETURNING modify_at"
    )
}

pub fn touch_modify_time(table: &str) -> String {
    format!("UPDATE \"{table}\" SET modify_at = ?1 WHERE meta_key = ?2")
}

/// Renames the legacy revision row unless the scoped key already exists.
pub fn migrate_legacy_revision_key(table: &str) -> String {
    format!("UPDATE OR IGNORE \"{table}\" SET meta_key = ?1 WHERE meta_key = ?2")
}

/// Table definition at the current revision.
pub fn create_meta_store(table: &str) -> String {
    format!(
        "CREATE TABLE \"{table}\" (\
         meta_key TEXT NOT NULL PRIMARY KEY \
         CHECK (length(CAST(meta_key AS BLOB)) = length(meta_key) \
         AND length(CAST(meta_key AS BLOB)) <= {MAX_META_KEY_LEN}), \
         meta_value TEXT NOT NULL, \
         modify_at INTEGER NOT NULL DEFAULT 0\
         ) WITHOUT ROWID"
    )
}

/// Rebuilds a revision-1 table in place with the ASCII key constraint.
///
/// SQLite cannot alter a column's attributes, so the table is copied into a
/// shadow table built at the current layout and renamed back.
pub fn migrate_meta_store_to_rev2(table: &str) -> String {
    let shadow = format!("{table}__rev2");
    format!(
        "{create};\n\
         INSERT INTO \"{shadow}\" (meta_key, meta_value, modify_at) \
         SELECT meta_key, meta_value, modify_at FROM \"{table}\";\n\
         DROP TABLE \"{table}\";\n\
         ALTER TABLE \"{shadow}\" RENAME TO \"{table}\";",
        create = create_meta_store(&shadow),
    )
}

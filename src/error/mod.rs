//! Error handling for the meta store.
//!
//! This module provides:
//! - [`MetaStoreError`]: The main error enum for all meta store operations
//! - [`ErrorCode`]: Stable error codes for machine parsing

mod codes;

use std::io;

use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

/// Main error type for meta store operations.
#[derive(Error, Debug)]
pub enum MetaStoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Meta store table does not exist: {0}")]
    TableMissing(String),

    #[error("Meta row not found: {key} (table {table})")]
    NotFound { table: String, key: String },

    #[error("Invalid meta store table name: {0:?}")]
    InvalidTableName(String),

    #[error("Invalid meta key {key:?}: {reason}")]
    InvalidMetaKey { key: String, reason: String },

    #[error("Unknown meta-store schema revision {revision} for table {table}")]
    UnknownRevision { table: String, revision: i32 },

    #[error("Upgrade of meta-store {table} from revision {revision} failed: {source}")]
    MigrationFailed {
        table: String,
        revision: i32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Meta-store {table} schema not up to date: revision {found}, expected {expected}")]
    SchemaInconsistent {
        table: String,
        found: i32,
        expected: i32,
    },

    #[error("Cannot store generated private key into storage: {0}")]
    KeyPersistence(String),

    #[error("Cannot decode stored private key {key}: {reason}")]
    KeyDecode { key: String, reason: String },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid private key material: {0}")]
    KeyMaterial(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Unsupported key size: {0} bits (supported: 256, 384)")]
    UnsupportedKeySize(usize),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MetaStoreError {
    /// Wraps a driver error raised while touching `table`, lifting SQLite's
    /// "no such table" failure into [`MetaStoreError::TableMissing`].
    pub(crate) fn from_sqlite(table: &str, err: rusqlite::Error) -> Self {
        if is_no_such_table(&err) {
            Self::TableMissing(table.to_string())
        } else {
            Self::Database(err)
        }
    }

    /// True when the backing table does not exist yet.
    #[must_use]
    pub const fn is_table_missing(&self) -> bool {
        matches!(self, Self::TableMissing(_))
    }

    /// True when a required meta row was absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Database(_) => ErrorCode::Backend,
            Self::Io(_) => ErrorCode::Io,
            Self::TableMissing(_) => ErrorCode::TableMissing,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidTableName(_) | Self::InvalidMetaKey { .. } => ErrorCode::InvalidInput,
            Self::UnknownRevision { .. }
            | Self::MigrationFailed { .. }
            | Self::SchemaInconsistent { .. } => ErrorCode::SchemaInconsistent,
            Self::KeyPersistence(_) => ErrorCode::PersistenceRace,
            Self::KeyDecode { .. } | Self::KeyMaterial(_) => ErrorCode::DecodeFailure,
            Self::KeyGeneration(_) | Self::UnsupportedKeySize(_) => ErrorCode::KeyGeneration,
            Self::Signing(_) => ErrorCode::Signing,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::Serialization(_) => ErrorCode::Serialization,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::TableMissing(table) => Some(serde_json::json!({ "table": table })),
            Self::NotFound { table, key } => {
                Some(serde_json::json!({ "table": table, "key": key }))
            }
            Self::UnknownRevision { table, revision }
            | Self::MigrationFailed {
                table, revision, ..
            } => Some(serde_json::json!({ "table": table, "revision": revision })),
            Self::SchemaInconsistent {
                table,
                found,
                expected,
            } => Some(serde_json::json!({
                "table": table,
                "found": found,
                "expected": expected,
            })),
            Self::KeyDecode { key, reason } => {
                Some(serde_json::json!({ "key": key, "reason": reason }))
            }
            _ => None,
        }
    }
}

fn is_no_such_table(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.starts_with("no such table"),
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, MetaStoreError>;

//! Stable error codes for machine-parseable output.

use serde::{Deserialize, Serialize};

/// Error codes emitted in `--json` mode.
///
/// The string form (`SCREAMING_SNAKE_CASE`) is the stable contract; the
/// numeric form groups codes by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Storage errors (1xx)
    // ========================================
    /// E101: Driver or connectivity failure
    Backend,
    /// E102: Backing table does not exist
    TableMissing,
    /// E103: Required meta row is absent
    NotFound,
    /// E104: Filesystem failure while opening the database
    Io,

    // ========================================
    // Schema errors (2xx)
    // ========================================
    /// E201: Revision unknown, migration failed, or revision still stale
    SchemaInconsistent,

    // ========================================
    // Secret errors (3xx)
    // ========================================
    /// E301: Generated key could not be read back after writing
    PersistenceRace,
    /// E302: Stored key material does not decode
    DecodeFailure,
    /// E303: Key generation failed or key size unsupported
    KeyGeneration,
    /// E304: Signing with a loaded key failed
    Signing,

    // ========================================
    // Input and config errors (4xx)
    // ========================================
    /// E401: Table name or meta key rejected
    InvalidInput,
    /// E402: Config file unreadable or invalid
    ConfigInvalid,
    /// E403: Output could not be serialized
    Serialization,
}

impl ErrorCode {
    /// Numeric form of the code.
    #[must_use]
    pub const fn numeric(self) -> u16 {
        match self {
            Self::Backend => 101,
            Self::TableMissing => 102,
            Self::NotFound => 103,
            Self::Io => 104,
            Self::SchemaInconsistent => 201,
            Self::PersistenceRace => 301,
            Self::DecodeFailure => 302,
            Self::KeyGeneration => 303,
            Self::Signing => 304,
            Self::InvalidInput => 401,
            Self::ConfigInvalid => 402,
            Self::Serialization => 403,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E{}", self.numeric())
    }
}

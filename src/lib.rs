pub mod cli;
pub mod config;
pub mod error;
pub mod storage;

pub use error::{MetaStoreError, Result};
pub use storage::{Database, MetaStore, MetaTx};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

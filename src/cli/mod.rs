//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

use commands::rotate::RotateArgs;
use commands::schema::PrepareArgs;
use commands::value::{GetArgs, InitArgs, SetArgs};

/// metastore - versioned key-value meta store on SQLite
#[derive(Parser, Debug)]
#[command(name = "metastore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit JSON on stdout (and JSON logs on stderr)
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/metastore/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Meta store table (overrides config)
    #[arg(long, global = true)]
    pub table: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or upgrade the meta store table
    Prepare(PrepareArgs),

    /// Show the table's schema revision
    Revision,

    /// Read a meta value
    Get(GetArgs),

    /// Write a meta value (overwrites)
    Set(SetArgs),

    /// Write a meta value only if the key is absent
    Init(InitArgs),

    /// Fetch a rotating private key, generating it when absent or expired
    Rotate(RotateArgs),
}

/// How a meta value is interpreted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ValueKind {
    /// Raw stored text
    #[default]
    Text,
    /// "1" / "0"
    Bool,
    /// Base-10 32-bit integer
    I32,
    /// Base-10 64-bit integer
    I64,
}

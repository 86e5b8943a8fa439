//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::Result;
use crate::storage::{Database, MetaStore};

pub mod rotate;
pub mod schema;
pub mod value;

/// Everything a command needs: resolved config and an open database.
#[derive(Debug)]
pub struct AppContext {
    pub config: Config,
    pub db: Database,
    pub json: bool,
}

impl AppContext {
    /// Load config, apply CLI overrides, and open the database.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(cli.config.as_deref())?;
        if let Some(path) = &cli.db {
            config.database.path.clone_from(path);
        }
        if let Some(table) = &cli.table {
            config.store.table.clone_from(table);
        }
        let db = Database::open_with_timeout(
            &config.database.path,
            config.database.busy_timeout(),
        )?;
        Ok(Self {
            config,
            db,
            json: cli.json,
        })
    }

    pub fn store(&self) -> Result<MetaStore<'_>> {
        self.db.meta_store(&self.config.store.table)
    }
}

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Prepare(args) => schema::run_prepare(ctx, args),
        Commands::Revision => schema::run_revision(ctx),
        Commands::Get(args) => value::run_get(ctx, args),
        Commands::Set(args) => value::run_set(ctx, args),
        Commands::Init(args) => value::run_init(ctx, args),
        Commands::Rotate(args) => rotate::run(ctx, args),
    }
}

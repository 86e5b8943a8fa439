//! metastore prepare / revision - Schema preparation and inspection.

use clap::Args;

use crate::cli::commands::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::Result;
use crate::storage::CURRENT_REVISION;

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Legacy revision key to move to the table-scoped key first
    #[arg(long)]
    pub legacy_key: Option<String>,
}

#[derive(serde::Serialize)]
struct PrepareReport<'a> {
    table: &'a str,
    legacy_key_migrated: bool,
    schema_changed: bool,
    revision: i32,
}

pub fn run_prepare(ctx: &AppContext, args: &PrepareArgs) -> Result<()> {
    let store = ctx.store()?;
    let legacy_key = args
        .legacy_key
        .as_deref()
        .or(ctx.config.store.legacy_revision_key.as_deref());

    let legacy_key_migrated = match legacy_key {
        Some(key) => store.migrate_legacy_revision_key(key)?,
        None => false,
    };
    let schema_changed = store.prepare_schema()?;
    let report = PrepareReport {
        table: store.table(),
        legacy_key_migrated,
        schema_changed,
        revision: store.schema_revision()?,
    };

    if ctx.json {
        return emit_json(&report);
    }
    let mut layout = HumanLayout::new();
    layout
        .title("Meta Store Schema")
        .kv("Table", report.table)
        .kv("Revision", &report.revision.to_string())
        .kv("Changed", if report.schema_changed { "yes" } else { "no" });
    if report.legacy_key_migrated {
        layout.kv("Legacy key", "migrated");
    }
    emit_human(layout);
    Ok(())
}

pub fn run_revision(ctx: &AppContext) -> Result<()> {
    let store = ctx.store()?;
    let revision = store.schema_revision()?;
    let current = revision == CURRENT_REVISION;

    if ctx.json {
        return emit_json(&serde_json::json!({
            "table": store.table(),
            "revision": revision,
            "expected": CURRENT_REVISION,
            "current": current,
        }));
    }
    let mut layout = HumanLayout::new();
    layout
        .title("Meta Store Schema")
        .kv("Table", store.table())
        .kv("Revision", &revision.to_string())
        .kv("Expected", &CURRENT_REVISION.to_string());
    emit_human(layout);
    Ok(())
}

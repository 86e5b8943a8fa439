//! metastore get / set / init - Typed meta value access.

use clap::Args;
use serde_json::Value;

use crate::cli::ValueKind;
use crate::cli::commands::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::{MetaStoreError, Result};

#[derive(Args, Debug)]
pub struct GetArgs {
    pub key: String,

    /// How to interpret the stored text
    #[arg(long, value_enum, default_value_t)]
    pub kind: ValueKind,

    /// Value reported when the key is absent or does not parse
    #[arg(long)]
    pub default: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    pub key: String,
    pub value: String,

    /// Validate and encode the value as this kind
    #[arg(long, value_enum, default_value_t)]
    pub kind: ValueKind,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    pub key: String,
    pub value: String,
}

pub fn run_get(ctx: &AppContext, args: &GetArgs) -> Result<()> {
    let store = ctx.store()?;
    let row = store.fetch(&args.key)?;
    let found = row.is_some();
    let default = args.default.as_deref();
    let (value, modify_at) = match args.kind {
        ValueKind::Text => match row {
            Some(row) => (Value::from(row.value), row.modify_at),
            None => (default.map_or(Value::Null, Value::from), 0),
        },
        ValueKind::Bool => {
            let default = parse_input(ValueKind::Bool, default)?.is_some_and(|v| v == 1);
            let fetched = store.fetch_bool(&args.key, default)?;
            (Value::from(fetched.value), fetched.modify_at)
        }
        ValueKind::I32 => {
            let default = parse_i32_default(default)?;
            let fetched = store.fetch_i32(&args.key, default)?;
            (Value::from(fetched.value), fetched.modify_at)
        }
        ValueKind::I64 => {
            let default = parse_input(ValueKind::I64, default)?.unwrap_or_default();
            let fetched = store.fetch_i64(&args.key, default)?;
            (Value::from(fetched.value), fetched.modify_at)
        }
    };

    if ctx.json {
        return emit_json(&serde_json::json!({
            "key": args.key,
            "found": found,
            "value": value,
            "modify_at": modify_at,
        }));
    }
    let shown = match &value {
        Value::String(text) => text.clone(),
        Value::Null => "(absent)".to_string(),
        other => other.to_string(),
    };
    let mut layout = HumanLayout::new();
    layout
        .title("Meta Value")
        .kv("Key", &args.key)
        .kv("Value", &shown)
        .kv("Modified", &format_modify_at(modify_at));
    emit_human(layout);
    Ok(())
}

pub fn run_set(ctx: &AppContext, args: &SetArgs) -> Result<()> {
    let store = ctx.store()?;
    match (args.kind, parse_input(args.kind, Some(&args.value))?) {
        (ValueKind::Text, _) | (_, None) => store.store(&args.key, &args.value)?,
        (ValueKind::Bool, Some(v)) => store.store_bool(&args.key, v == 1)?,
        (ValueKind::I32, Some(v)) => store.store_i32(
            &args.key,
            i32::try_from(v).map_err(|err| invalid_value(&args.value, &err))?,
        )?,
        (ValueKind::I64, Some(v)) => store.store_i64(&args.key, v)?,
    }
    report_write(ctx, &args.key, "stored")
}

pub fn run_init(ctx: &AppContext, args: &InitArgs) -> Result<()> {
    let store = ctx.store()?;
    store.initialize(&args.key, &args.value)?;
    report_write(ctx, &args.key, "initialized")
}

fn report_write(ctx: &AppContext, key: &str, status: &str) -> Result<()> {
    let row = ctx.store()?.fetch(key)?;
    let modify_at = row.as_ref().map_or(0, |row| row.modify_at);
    if ctx.json {
        return emit_json(&serde_json::json!({
            "status": status,
            "key": key,
            "value": row.map(|row| row.value),
            "modify_at": modify_at,
        }));
    }
    let mut layout = HumanLayout::new();
    layout
        .title("Meta Value")
        .kv("Key", key)
        .kv("Status", status)
        .kv("Modified", &format_modify_at(modify_at));
    emit_human(layout);
    Ok(())
}

/// Parse command-line input for a typed kind; `Text` never parses.
fn parse_input(kind: ValueKind, raw: Option<&str>) -> Result<Option<i64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match kind {
        ValueKind::Text => Ok(None),
        ValueKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(1)),
            "0" | "false" | "no" | "off" => Ok(Some(0)),
            _ => Err(invalid_value(raw, &"expected a boolean")),
        },
        ValueKind::I32 | ValueKind::I64 => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| invalid_value(raw, &err)),
    }
}

fn parse_i32_default(raw: Option<&str>) -> Result<i32> {
    match (raw, parse_input(ValueKind::I32, raw)?) {
        (Some(raw), Some(v)) => i32::try_from(v).map_err(|err| invalid_value(raw, &err)),
        _ => Ok(0),
    }
}

fn invalid_value(raw: &str, reason: &dyn std::fmt::Display) -> MetaStoreError {
    MetaStoreError::Config(format!("invalid value {raw:?}: {reason}"))
}

fn format_modify_at(modify_at: i64) -> String {
    if modify_at == 0 {
        return "-".to_string();
    }
    chrono::DateTime::from_timestamp(modify_at, 0)
        .map_or_else(|| modify_at.to_string(), |at| at.to_rfc3339())
}

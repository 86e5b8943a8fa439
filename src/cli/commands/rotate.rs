//! metastore rotate - Fetch or rotate a private key.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::Args;

use crate::cli::commands::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::Result;
use crate::storage::KeyFetch;

#[derive(Args, Debug)]
pub struct RotateArgs {
    pub key: String,

    /// Key size in bits: 256 (P-256) or 384 (P-384) (default: from config)
    #[arg(long)]
    pub bits: Option<usize>,

    /// Maximum key age, e.g. "24h" (default: from config)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub max_age: Option<Duration>,

    /// Timestamp of the key already held; an unchanged key is not parsed
    #[arg(long, default_value_t = 0)]
    pub current_modify_at: i64,
}

#[derive(serde::Serialize)]
struct RotateReport {
    key: String,
    fresh: bool,
    generated: bool,
    modify_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_key: Option<String>,
}

pub fn run(ctx: &AppContext, args: &RotateArgs) -> Result<()> {
    let store = ctx.store()?;
    let bits = args.bits.unwrap_or(ctx.config.secret.key_bits);
    let max_age = args.max_age.unwrap_or(ctx.config.secret.max_age);

    let fetched = store.fetch_private_key(&args.key, bits, max_age, args.current_modify_at)?;
    let report = match fetched {
        KeyFetch::Unchanged { modify_at } => RotateReport {
            key: args.key.clone(),
            fresh: false,
            generated: false,
            modify_at,
            algorithm: None,
            public_key: None,
        },
        KeyFetch::Loaded {
            key,
            modify_at,
            generated,
        } => RotateReport {
            key: args.key.clone(),
            fresh: true,
            generated,
            modify_at,
            algorithm: Some(format!("ecdsa-p{}", key.algorithm().bits())),
            public_key: Some(STANDARD.encode(key.public_key())),
        },
    };

    if ctx.json {
        return emit_json(&report);
    }
    let status = match (report.fresh, report.generated) {
        (false, _) => "unchanged",
        (true, true) => "generated",
        (true, false) => "loaded",
    };
    let mut layout = HumanLayout::new();
    layout
        .title("Rotating Key")
        .kv("Key", &report.key)
        .kv("Status", status)
        .kv("Modified at", &report.modify_at.to_string());
    if let Some(algorithm) = &report.algorithm {
        layout.kv("Algorithm", algorithm);
    }
    if let Some(public_key) = &report.public_key {
        layout.kv("Public key", public_key);
    }
    emit_human(layout);
    Ok(())
}

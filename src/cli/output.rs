use console::style;
use serde::Serialize;

use crate::error::{MetaStoreError, Result};

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| MetaStoreError::Serialization(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

/// JSON body printed on failure in `--json` mode.
#[must_use]
pub fn error_json(err: &MetaStoreError) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "error": true,
        "code": err.code(),
        "numeric_code": err.code().numeric(),
        "message": err.to_string(),
    });
    if let Some(context) = err.context() {
        payload["context"] = context;
    }
    payload
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 14,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        let padded = format!("{key:width$}", width = self.key_width);
        self.lines.push(format!("{} {value}", style(padded).dim()));
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: HumanLayout) {
    println!("{}", layout.build());
}

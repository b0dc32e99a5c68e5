// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook payload rendering.
//!
//! With no template configured, the event serializes straight to JSON.
//! Otherwise the endpoint's template renders against the event with two
//! helpers: `json` (marshal any value) and `json_escape` (escape a
//! string for embedding inside JSON quotes). Template failures are
//! permanent — the delivery dead-letters without a retry.

use std::collections::HashMap;

use tera::{Context, Tera, Value};

use crate::event::Event;

/// Render the payload bytes for one delivery attempt.
pub fn render_payload(template: Option<&str>, event: &Event) -> anyhow::Result<String> {
    match template {
        None => Ok(serde_json::to_string(event)?),
        Some(t) if t.trim().is_empty() => Ok(serde_json::to_string(event)?),
        Some(t) => {
            let mut tera = Tera::default();
            tera.register_filter("json", json_filter);
            tera.register_filter("json_escape", json_escape_filter);
            tera.add_raw_template("payload", t)
                .map_err(|e| anyhow::anyhow!("template parse failed: {e}"))?;
            let context = Context::from_serialize(event)
                .map_err(|e| anyhow::anyhow!("template context failed: {e}"))?;
            tera.render("payload", &context)
                .map_err(|e| anyhow::anyhow!("template render failed: {e}"))
        }
    }
}

fn json_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let marshalled =
        serde_json::to_string(value).map_err(|e| tera::Error::msg(e.to_string()))?;
    Ok(Value::String(marshalled))
}

fn json_escape_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let escaped = match value {
        Value::String(s) => escape_json(s),
        other => escape_json(&other.to_string()),
    };
    Ok(Value::String(escaped))
}

/// Escape a string for embedding between JSON quotes.
fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;

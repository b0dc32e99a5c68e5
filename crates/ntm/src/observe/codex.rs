// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pattern set for Codex.
//!
//! Codex prints a "N% context left" gauge in its idle status line. That
//! line doubles as the idle prompt signal, and still matches when context
//! is fully exhausted (0%) — the context-low flag covers that case.

use regex::Regex;

use super::patterns::{compile_all, PatternSet};

const WORKING: &[&str] = &[
    "Working",
    "Running command",
    "Applying patch",
    "Thinking",
    "esc to interrupt",
];

const IDLE: &[&str] = &[
    "? for shortcuts",
    "Send a message",
];

const ERROR: &[&str] = &[
    "stream error",
    "unexpected status",
    "ERROR:",
];

const RATE_LIMIT: &[&str] = &[
    "Rate limit",
    "usage limit",
    "Too many requests",
    "429",
];

pub(super) fn pattern_set() -> anyhow::Result<PatternSet> {
    Ok(PatternSet {
        working: WORKING,
        idle: IDLE,
        error: ERROR,
        rate_limit: RATE_LIMIT,
        idle_prompts: compile_all("codex", &[r"\d+(?:\.\d+)?% context left", r"^\u{203a}"])?,
        headers: compile_all("codex", &[r"OpenAI Codex", r"codex-\w+", r"(?m)^codex\b"])?,
        context: Some(Regex::new(r"([\d,]+(?:\.\d+)?)% context left")?),
        tokens: Some(Regex::new(r"Tokens used:?\s*([\d,]+)")?),
        memory: None,
    })
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pattern set for Claude Code.
//!
//! Claude renders a `❯` (U+276F) input prompt when idle, spinner verbs
//! while working, and a "Context left until auto-compact" gauge near the
//! status line.

use regex::Regex;

use super::patterns::{compile_all, PatternSet};

const WORKING: &[&str] = &[
    "Writing to",
    "Reading file",
    "Running\u{2026}",
    "Thinking",
    "Analyzing",
    "esc to interrupt",
    "Effort:",
];

const IDLE: &[&str] = &[
    "? for shortcuts",
];

const ERROR: &[&str] = &[
    "API Error",
    "authentication_error",
    "overloaded_error",
    "failed to connect",
];

const RATE_LIMIT: &[&str] = &[
    "Rate limit exceeded",
    "rate_limit_error",
    "usage limit reached",
    "Too many requests",
];

pub(super) fn pattern_set() -> anyhow::Result<PatternSet> {
    Ok(PatternSet {
        working: WORKING,
        idle: IDLE,
        error: ERROR,
        rate_limit: RATE_LIMIT,
        idle_prompts: compile_all("claude", &[r"^\u{276f}", r"^>\s*Try \x22"])?,
        headers: compile_all("claude", &[r"Claude Code", r"claude\.ai", r"Anthropic"])?,
        context: Some(Regex::new(
            r"Context left until auto-compact: ([\d,]+(?:\.\d+)?)%",
        )?),
        tokens: Some(Regex::new(r"([\d,]+) tokens")?),
        memory: None,
    })
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;

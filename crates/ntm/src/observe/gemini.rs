// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pattern set for Gemini CLI.
//!
//! Gemini idles on a bare `>` prompt and reports context and process
//! memory in its footer line.

use regex::Regex;

use super::patterns::{compile_all, PatternSet};

const WORKING: &[&str] = &[
    "Loading",
    "Generating",
    "esc to cancel",
    "Tool call",
];

const IDLE: &[&str] = &[
    "Type your message",
];

const ERROR: &[&str] = &[
    "Error executing",
    "GaxiosError",
    "FATAL",
];

const RATE_LIMIT: &[&str] = &[
    "Quota exceeded",
    "RESOURCE_EXHAUSTED",
    "rate limit",
];

pub(super) fn pattern_set() -> anyhow::Result<PatternSet> {
    Ok(PatternSet {
        working: WORKING,
        idle: IDLE,
        error: ERROR,
        rate_limit: RATE_LIMIT,
        idle_prompts: compile_all("gemini", &[r"^>\s*$", r"^>\s+\S"])?,
        headers: compile_all("gemini", &[r"Gemini CLI", r"gemini-\d", r"GEMINI\.md"])?,
        context: Some(Regex::new(r"\(([\d,]+(?:\.\d+)?)% context left\)")?),
        tokens: None,
        memory: Some(Regex::new(r"([\d,]+(?:\.\d+)?)\s*MB")?),
    })
}

#[cfg(test)]
#[path = "gemini_tests.rs"]
mod tests;

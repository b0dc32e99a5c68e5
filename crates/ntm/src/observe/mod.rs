// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent state inference from captured terminal output.
//!
//! Everything here is pure: classification reads the pattern table and the
//! text, holds no state, and is safe to call concurrently from any number
//! of producers. Parsing never fails — degenerate input produces an
//! [`AgentStatus::unknown`] snapshot.

pub mod ansi;
mod claude;
mod codex;
pub mod extract;
mod gemini;
pub mod patterns;
pub mod state;

pub use patterns::{PatternSet, PatternTable};
pub use state::{AgentStatus, Recommendation};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Known assistant kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
    Codex,
    Gemini,
    Unknown,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for [`parse`].
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// How many trailing lines of the capture to classify.
    pub sample_length: usize,
    /// Context percentage at or below which the context-low flag sets.
    pub context_low_threshold: f64,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self { sample_length: 500, context_low_threshold: 20.0 }
    }
}

/// Identify which assistant produced `text` by its identity headers.
///
/// Every known kind's header regexes run against the recent output; the
/// kind with the most matches wins. No match at all yields
/// [`AgentKind::Unknown`].
pub fn detect_kind(text: &str, table: &PatternTable) -> AgentKind {
    let stripped = ansi::strip_ansi(text);

    let mut best = AgentKind::Unknown;
    let mut best_hits = 0;
    for kind in PatternTable::known_kinds() {
        let hits = table.get(kind).header_match_count(&stripped);
        if hits > best_hits {
            best = kind;
            best_hits = hits;
        }
    }
    best
}

/// Classify one pane capture into an [`AgentStatus`].
///
/// Single pass: strip ANSI, sample the trailing window, run the kind's
/// literal and regex sets, extract numeric signals, resolve flag
/// precedence, and compute confidence.
pub fn parse(text: &str, kind: AgentKind, table: &PatternTable, config: &ParseConfig) -> AgentStatus {
    let stripped = ansi::strip_ansi(text);
    let window = ansi::tail_lines(&stripped, config.sample_length);
    if window.trim().is_empty() {
        return AgentStatus::unknown();
    }

    let set = table.get(kind);
    let lower = window.to_lowercase();

    let mut work_indicators = Vec::new();
    for phrase in set.working {
        if lower.contains(&phrase.to_lowercase()) {
            work_indicators.push((*phrase).to_owned());
        }
    }
    let is_working = !work_indicators.is_empty();

    let is_rate_limited = set.rate_limit.iter().any(|p| lower.contains(&p.to_lowercase()));
    let is_in_error = set.error.iter().any(|p| lower.contains(&p.to_lowercase()));

    // Idle prompts render at the bottom of the screen; literal idle hints
    // may sit anywhere in the window. Either signal counts, but idle is
    // suppressed whenever a working indicator fired.
    let idle_signal = set.idle.iter().any(|p| lower.contains(&p.to_lowercase()))
        || ansi::trimmed_tail(&window)
            .map(|tail| set.idle_prompts.iter().any(|re| re.is_match(tail)))
            .unwrap_or(false);
    let is_idle = idle_signal && !is_working;

    let context_remaining_pct = set
        .context
        .as_ref()
        .and_then(|re| extract::extract_float(re, &window))
        .filter(|pct| (0.0..=100.0).contains(pct));
    let tokens_used = set.tokens.as_ref().and_then(|re| extract::extract_u64(re, &window));
    let memory_mb = set.memory.as_ref().and_then(|re| extract::extract_float(re, &window));

    let is_context_low =
        context_remaining_pct.is_some_and(|pct| pct <= config.context_low_threshold);

    let header_matched = set.header_matches(&window);
    let mut confidence: f64 = if header_matched { 0.5 } else { 0.3 };
    for fired in [is_working, idle_signal, context_remaining_pct.is_some()] {
        if fired {
            confidence += 0.1;
        }
    }
    confidence = confidence.min(0.95);
    if kind == AgentKind::Unknown {
        confidence = confidence.min(0.3);
    }

    AgentStatus {
        kind,
        parsed_at: Utc::now(),
        is_working,
        is_idle,
        is_in_error,
        is_rate_limited,
        is_context_low,
        context_remaining_pct,
        tokens_used,
        memory_mb,
        work_indicators,
        confidence,
    }
}

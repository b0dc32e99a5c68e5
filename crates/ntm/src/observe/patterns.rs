// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-kind pattern sets and the compiled lookup table.
//!
//! The variation between assistant kinds is data, not polymorphism: each
//! kind contributes ordered literal phrase lists and compiled regex sets,
//! and classification is a table lookup. Compilation happens once at
//! startup; a bad pattern is fatal there and nowhere else.

use regex::Regex;

use super::AgentKind;

/// Literal phrases and compiled regexes for one assistant kind.
///
/// Literal sets match case-insensitively by substring containment. Regex
/// sets match the text verbatim (no case folding unless the pattern asks
/// for it). Idle-prompt regexes are anchored to the trimmed tail of the
/// sampled window by the caller.
pub struct PatternSet {
    pub working: &'static [&'static str],
    pub idle: &'static [&'static str],
    pub error: &'static [&'static str],
    pub rate_limit: &'static [&'static str],
    pub idle_prompts: Vec<Regex>,
    pub headers: Vec<Regex>,
    pub context: Option<Regex>,
    pub tokens: Option<Regex>,
    pub memory: Option<Regex>,
}

impl PatternSet {
    /// The empty set: matches nothing. Used for [`AgentKind::Unknown`].
    pub fn empty() -> Self {
        Self {
            working: &[],
            idle: &[],
            error: &[],
            rate_limit: &[],
            idle_prompts: vec![],
            headers: vec![],
            context: None,
            tokens: None,
            memory: None,
        }
    }

    /// True when any identity-header regex matches `text`.
    pub fn header_matches(&self, text: &str) -> bool {
        self.headers.iter().any(|re| re.is_match(text))
    }

    /// Number of identity-header regexes matching `text`.
    pub fn header_match_count(&self, text: &str) -> usize {
        self.headers.iter().filter(|re| re.is_match(text)).count()
    }
}

impl std::fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternSet")
            .field("working", &self.working.len())
            .field("idle", &self.idle.len())
            .field("error", &self.error.len())
            .field("rate_limit", &self.rate_limit.len())
            .field("idle_prompts", &self.idle_prompts.len())
            .field("headers", &self.headers.len())
            .finish()
    }
}

/// Compiled pattern sets for every known kind.
#[derive(Debug)]
pub struct PatternTable {
    claude: PatternSet,
    codex: PatternSet,
    gemini: PatternSet,
    unknown: PatternSet,
}

impl PatternTable {
    /// Compile all pattern sets. Called once at startup; a compilation
    /// error here is fatal.
    pub fn compile() -> anyhow::Result<Self> {
        Ok(Self {
            claude: super::claude::pattern_set()?,
            codex: super::codex::pattern_set()?,
            gemini: super::gemini::pattern_set()?,
            unknown: PatternSet::empty(),
        })
    }

    /// Look up the pattern set for `kind`. Unknown kinds get the empty set.
    pub fn get(&self, kind: AgentKind) -> &PatternSet {
        match kind {
            AgentKind::Claude => &self.claude,
            AgentKind::Codex => &self.codex,
            AgentKind::Gemini => &self.gemini,
            AgentKind::Unknown => &self.unknown,
        }
    }

    /// Kinds with a real pattern set, in detection-priority order.
    pub fn known_kinds() -> [AgentKind; 3] {
        [AgentKind::Claude, AgentKind::Codex, AgentKind::Gemini]
    }
}

/// Compile a list of regex sources, labelling failures with the kind.
pub(super) fn compile_all(kind: &str, sources: &[&str]) -> anyhow::Result<Vec<Regex>> {
    sources
        .iter()
        .map(|s| {
            Regex::new(s).map_err(|e| anyhow::anyhow!("{kind} pattern {s:?} failed to compile: {e}"))
        })
        .collect()
}

#[cfg(test)]
#[path = "patterns_tests.rs"]
mod tests;

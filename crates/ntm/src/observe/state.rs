// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AgentKind;

/// What the orchestrator should do with an agent given its current flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    SafeToRestart,
    DoNotInterrupt,
    RateLimitedWait,
    ContextLowContinue,
    ErrorState,
    Unknown,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SafeToRestart => "safe_to_restart",
            Self::DoNotInterrupt => "do_not_interrupt",
            Self::RateLimitedWait => "rate_limited_wait",
            Self::ContextLowContinue => "context_low_continue",
            Self::ErrorState => "error_state",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified snapshot of one agent's terminal output.
///
/// Produced by [`super::parse`]; a fresh snapshot supersedes the previous
/// one for the same pane. Flags are not mutually exclusive: working and
/// rate-limited (or working and error) can hold at once, and the
/// [`Recommendation`] ladder resolves the conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub kind: AgentKind,
    pub parsed_at: DateTime<Utc>,
    pub is_working: bool,
    pub is_idle: bool,
    pub is_in_error: bool,
    pub is_rate_limited: bool,
    pub is_context_low: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_remaining_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
    /// Literal patterns that fired, for explainability.
    #[serde(default)]
    pub work_indicators: Vec<String>,
    pub confidence: f64,
}

impl AgentStatus {
    /// A degenerate snapshot: unknown kind, no flags, minimal confidence.
    pub fn unknown() -> Self {
        Self {
            kind: AgentKind::Unknown,
            parsed_at: Utc::now(),
            is_working: false,
            is_idle: false,
            is_in_error: false,
            is_rate_limited: false,
            is_context_low: false,
            context_remaining_pct: None,
            tokens_used: None,
            memory_mb: None,
            work_indicators: vec![],
            confidence: 0.0,
        }
    }

    /// Derive the action recommendation from the five flags.
    ///
    /// Pure in the flags; nothing else participates. The ladder, highest
    /// priority first:
    ///
    /// ```text
    /// rate-limited > error > working∧context-low > working
    ///              > idle∧context-low > idle > unknown
    /// ```
    ///
    /// An idle agent with exhausted context (Codex reports "0% context
    /// left" from its idle prompt) maps to `ContextLowContinue`, never
    /// `SafeToRestart`.
    pub fn recommendation(&self) -> Recommendation {
        if self.is_rate_limited {
            Recommendation::RateLimitedWait
        } else if self.is_in_error {
            Recommendation::ErrorState
        } else if self.is_working && self.is_context_low {
            Recommendation::ContextLowContinue
        } else if self.is_working {
            Recommendation::DoNotInterrupt
        } else if self.is_idle && self.is_context_low {
            Recommendation::ContextLowContinue
        } else if self.is_idle {
            Recommendation::SafeToRestart
        } else {
            Recommendation::Unknown
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

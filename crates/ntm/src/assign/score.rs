// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure scoring of (agent × task) pairs.

use std::collections::BTreeSet;

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use crate::observe::AgentKind;

use super::{AgentView, Strategy, Task, TaskScoreBreakdown, TaskType};

/// Tunable weights and affinity coefficients.
///
/// The affinity numbers reflect the current calibration; they are
/// configuration rather than constants so deployments can retune them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub tag_weight: f64,
    pub focus_weight: f64,
    pub critical_path_weight: f64,
    /// Context usage above this starts to penalize.
    pub context_threshold: f64,
    pub claude_complex_bonus: f64,
    pub claude_trivial_penalty: f64,
    pub codex_trivial_bonus: f64,
    pub codex_complex_penalty: f64,
    pub gemini_mid_bonus: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            tag_weight: 0.1,
            focus_weight: 0.1,
            critical_path_weight: 0.3,
            context_threshold: 80.0,
            claude_complex_bonus: 0.15,
            claude_trivial_penalty: 0.1,
            codex_trivial_bonus: 0.15,
            codex_complex_penalty: 0.1,
            gemini_mid_bonus: 0.05,
        }
    }
}

/// Which score terms a strategy enables, and at what weights.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreConfig {
    pub weights: ScoreWeights,
    pub profile_bonuses: bool,
    pub overlap_penalty: bool,
    pub critical_path: bool,
    /// Force "unblocks N tasks" to lead the reason string.
    pub highlight_unblocks: bool,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            profile_bonuses: true,
            overlap_penalty: true,
            critical_path: true,
            highlight_unblocks: false,
        }
    }
}

impl Strategy {
    /// The score configuration this strategy runs under.
    pub fn score_config(&self) -> ScoreConfig {
        let mut cfg = ScoreConfig::default();
        match self {
            Self::Balanced | Self::RoundRobin => {}
            Self::Speed => {
                cfg.profile_bonuses = false;
                cfg.overlap_penalty = false;
                cfg.critical_path = false;
            }
            Self::Quality => {
                cfg.weights.tag_weight = 0.2;
                cfg.weights.focus_weight = 0.15;
            }
            Self::Dependency => {
                cfg.weights.critical_path_weight = 0.5;
                cfg.highlight_unblocks = true;
            }
        }
        cfg
    }
}

/// Per-term contributions to one pair's total score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    /// Agent-type affinity; the only term that can go negative.
    pub affinity: f64,
    pub tag_bonus: f64,
    pub focus_bonus: f64,
    pub critical_path: f64,
    pub context_penalty: f64,
    pub overlap_penalty: f64,
    pub total: f64,
}

/// Estimated task complexity in [0,1], by type.
pub fn task_complexity(task: &Task) -> f64 {
    match task.task_type {
        TaskType::Epic => (0.85 + 0.03 * task.unblocks.len() as f64).min(1.0),
        TaskType::Feature => 0.7,
        TaskType::Refactor => 0.6,
        TaskType::Task => 0.5,
        // Critical bugs tend to be focused fixes, not sprawling work.
        TaskType::Bug => {
            if task.priority == 0 {
                0.3
            } else {
                0.4
            }
        }
        TaskType::Docs => 0.3,
        TaskType::Chore => 0.2,
    }
}

/// Agent-type affinity for a task of the given complexity.
///
/// Claude leans into complex work, Codex into focused chores, Gemini is
/// mildly happiest in the middle.
pub fn agent_type_bonus(kind: AgentKind, complexity: f64, w: &ScoreWeights) -> f64 {
    match kind {
        AgentKind::Claude => {
            if complexity >= 0.6 {
                w.claude_complex_bonus
            } else if complexity < 0.3 {
                -w.claude_trivial_penalty
            } else {
                0.0
            }
        }
        AgentKind::Codex => {
            if complexity <= 0.3 {
                w.codex_trivial_bonus
            } else if complexity >= 0.7 {
                -w.codex_complex_penalty
            } else {
                0.0
            }
        }
        AgentKind::Gemini => {
            if (0.4..=0.6).contains(&complexity) {
                w.gemini_mid_bonus
            } else {
                0.0
            }
        }
        AgentKind::Unknown => 0.0,
    }
}

const TAG_KEYWORDS: &[(&str, &str)] = &[
    ("test", "testing"),
    ("architect", "architecture"),
    ("design", "architecture"),
    ("doc", "documentation"),
    ("readme", "documentation"),
    ("implement", "implementation"),
    ("build", "implementation"),
    ("review", "review"),
    ("bug", "bugs"),
    ("fix", "bugs"),
    ("crash", "bugs"),
];

/// Capability tags inferred from a task's title and description.
pub fn task_tags(task: &Task) -> BTreeSet<String> {
    let mut text = task.title.to_lowercase();
    if let Some(desc) = &task.description {
        text.push(' ');
        text.push_str(&desc.to_lowercase());
    }
    TAG_KEYWORDS
        .iter()
        .filter(|(keyword, _)| text.contains(keyword))
        .map(|(_, tag)| (*tag).to_owned())
        .collect()
}

/// File-looking tokens mentioned in the task's title or description.
pub fn mentioned_files(task: &Task) -> Vec<String> {
    let mut text = task.title.clone();
    if let Some(desc) = &task.description {
        text.push(' ');
        text.push_str(desc);
    }

    let mut files: Vec<String> = Vec::new();
    for raw in text.split_whitespace() {
        let token = raw.trim_matches(|c: char| ",;:()[]{}<>\"'`".contains(c));
        if token.len() < 3 {
            continue;
        }
        if (token.contains('/') || has_extension(token)) && !files.iter().any(|f| f == token) {
            files.push(token.to_owned());
        }
    }
    files
}

fn has_extension(token: &str) -> bool {
    match token.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && (1..=8).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Share of the agent's capability tags the task hits, scaled by `w_tag`.
pub fn tag_bonus(profile_tags: &BTreeSet<String>, task_tags: &BTreeSet<String>, w_tag: f64) -> f64 {
    if profile_tags.is_empty() {
        return 0.0;
    }
    let hits = profile_tags.intersection(task_tags).count();
    w_tag * hits as f64 / profile_tags.len() as f64
}

/// Share of mentioned files covered by the agent's focus globs, scaled by
/// `w_focus`. `**` spans directories; `*` stays within one segment.
pub fn focus_bonus(focus_patterns: &[String], files: &[String], w_focus: f64) -> f64 {
    if focus_patterns.is_empty() || files.is_empty() {
        return 0.0;
    }
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::default()
    };
    let patterns: Vec<Pattern> =
        focus_patterns.iter().filter_map(|p| Pattern::new(p).ok()).collect();
    if patterns.is_empty() {
        return 0.0;
    }
    let matches = files
        .iter()
        .filter(|f| patterns.iter().any(|p| p.matches_with(f, options)))
        .count();
    w_focus * matches as f64 / files.len() as f64
}

/// Critical-path bonus: proportional to the strongest graph sub-score
/// once any of pagerank, blocker-ratio, or time-to-impact clears 0.05.
pub fn critical_path_bonus(breakdown: Option<&TaskScoreBreakdown>, weight: f64) -> f64 {
    let Some(b) = breakdown else { return 0.0 };
    let strongest = b.pagerank.max(b.blocker_ratio).max(b.time_to_impact);
    if strongest >= 0.05 {
        weight * strongest
    } else {
        0.0
    }
}

/// Penalty for running an agent hot: 10 points over threshold ≈ 0.05.
pub fn context_penalty(usage: f64, threshold: f64) -> f64 {
    ((usage - threshold) / 200.0).max(0.0)
}

/// Penalty for an agent already holding file reservations.
pub fn overlap_penalty(reservation_count: usize) -> f64 {
    if reservation_count == 0 {
        return 0.0;
    }
    let extra = reservation_count.saturating_sub(3) as f64;
    (0.05 + 0.01 * extra).min(0.15)
}

/// A fully scored pair, ready for selection.
#[derive(Debug, Clone)]
pub struct ScoredPair {
    pub score: f64,
    pub confidence: f64,
    pub reason: String,
    pub breakdown: ScoreBreakdown,
}

/// Score one (task, agent) pair under `cfg`.
pub fn score_pair(
    task: &Task,
    agent: &AgentView,
    external_reservations: &[String],
    cfg: &ScoreConfig,
) -> ScoredPair {
    let w = &cfg.weights;
    let complexity = task_complexity(task);
    let affinity = agent_type_bonus(agent.kind, complexity, w);

    let (tag, focus) = match (&agent.profile, cfg.profile_bonuses) {
        (Some(profile), true) => (
            tag_bonus(&profile.tags, &task_tags(task), w.tag_weight),
            focus_bonus(&profile.focus_patterns, &mentioned_files(task), w.focus_weight),
        ),
        _ => (0.0, 0.0),
    };

    let critical_path = if cfg.critical_path {
        critical_path_bonus(task.breakdown.as_ref(), w.critical_path_weight)
    } else {
        0.0
    };

    let ctx_penalty = context_penalty(agent.context_usage, w.context_threshold);
    let reservations = agent.reservations.len() + external_reservations.len();
    let ovl_penalty = if cfg.overlap_penalty { overlap_penalty(reservations) } else { 0.0 };

    let total = task.score + affinity + tag + focus + critical_path - ctx_penalty - ovl_penalty;

    let bonuses = affinity.max(0.0) + tag + focus + critical_path;
    let penalties = ctx_penalty + ovl_penalty + (-affinity).max(0.0);
    let confidence =
        (total * 0.4 + bonuses * 0.3 - penalties * 0.5 + 0.1).clamp(0.1, 0.95);

    let breakdown = ScoreBreakdown {
        base: task.score,
        affinity,
        tag_bonus: tag,
        focus_bonus: focus,
        critical_path,
        context_penalty: ctx_penalty,
        overlap_penalty: ovl_penalty,
        total,
    };

    let reason = build_reason(task, &breakdown, cfg);

    ScoredPair { score: total, confidence, reason, breakdown }
}

/// Name the dominant terms, largest first, at most three.
fn build_reason(task: &Task, b: &ScoreBreakdown, cfg: &ScoreConfig) -> String {
    let unblocks = task.unblocks.len();
    let mut terms: Vec<(f64, String)> = Vec::new();

    if unblocks > 0 {
        let value = if cfg.highlight_unblocks { f64::INFINITY } else { 0.03 * unblocks as f64 };
        terms.push((value, format!("unblocks {unblocks} tasks")));
    }
    if b.affinity > 0.0 {
        terms.push((b.affinity, "agent type bonus".to_owned()));
    }
    if b.tag_bonus > 0.0 {
        terms.push((b.tag_bonus, "matching profile tags".to_owned()));
    }
    if b.focus_bonus > 0.0 {
        terms.push((b.focus_bonus, "focus pattern match".to_owned()));
    }
    if b.critical_path > 0.0 {
        terms.push((b.critical_path, "critical path".to_owned()));
    }
    if b.base >= 0.7 {
        terms.push((b.base, "high triage score".to_owned()));
    }

    if terms.is_empty() {
        return "best available pairing".to_owned();
    }
    terms.sort_by(|a, b| b.0.total_cmp(&a.0));
    terms.into_iter().take(3).map(|(_, label)| label).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
#[path = "score_tests.rs"]
mod tests;

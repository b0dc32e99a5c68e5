// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-to-agent assignment.
//!
//! Tasks and agents are plain records; scoring is pure; selection is
//! greedy with explicit tie-breakers so identical inputs always produce
//! identical output. Assignments carry copies of what they need — no
//! shared pointer graphs.

pub mod matcher;
pub mod score;

pub use matcher::assign_tasks;
pub use score::{ScoreBreakdown, ScoreConfig, ScoreWeights};

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::observe::AgentKind;

/// Work item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Bug,
    Feature,
    Epic,
    Chore,
    Task,
    Refactor,
    Docs,
}

/// Work item state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Open,
    Blocked,
    InProgress,
    Closed,
}

/// Graph-derived sub-scores attached to a triage recommendation.
///
/// All values are in [0,1]. Only pagerank, blocker-ratio, and
/// time-to-impact feed the critical-path bonus; the rest ride along for
/// explainability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskScoreBreakdown {
    #[serde(default)]
    pub pagerank: f64,
    #[serde(default)]
    pub betweenness: f64,
    #[serde(default)]
    pub blocker_ratio: f64,
    #[serde(default)]
    pub staleness: f64,
    #[serde(default)]
    pub priority_boost: f64,
    #[serde(default)]
    pub time_to_impact: f64,
    #[serde(default)]
    pub urgency: f64,
    #[serde(default)]
    pub risk: f64,
}

/// A triage recommendation: one unit of assignable work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    /// 0 = highest urgency, 4 = lowest.
    pub priority: u8,
    /// Base triage score in [0,1].
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<TaskScoreBreakdown>,
    /// Ids of tasks this one would unblock when finished.
    #[serde(default)]
    pub unblocks: Vec<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            task_type,
            status: TaskStatus::Open,
            priority: 2,
            score: 0.5,
            breakdown: None,
            unblocks: vec![],
        }
    }
}

/// Capability tags and file focus globs describing what an agent is good at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaProfile {
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub focus_patterns: Vec<String>,
}

/// Assignment-time view of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub pane_id: String,
    pub kind: AgentKind,
    /// Context consumed, 0–100.
    pub context_usage: f64,
    pub idle: bool,
    /// In-flight assignment count; −1 when tracking is unavailable
    /// (treated as 0 everywhere).
    pub assignments: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_assigned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<PersonaProfile>,
    /// Path globs this agent currently holds reservations on.
    #[serde(default)]
    pub reservations: Vec<String>,
}

impl AgentView {
    pub fn new(pane_id: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            pane_id: pane_id.into(),
            kind,
            context_usage: 0.0,
            idle: true,
            assignments: 0,
            last_assigned_at: None,
            profile: None,
            reservations: vec![],
        }
    }

    /// Eligible to receive work: idle with headroom left.
    pub fn available(&self) -> bool {
        self.idle && self.context_usage <= 90.0
    }

    /// Assignment count with the −1 "unavailable" sentinel normalized.
    pub fn assignment_load(&self) -> i32 {
        self.assignments.max(0)
    }
}

/// One selected (task, agent) pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub task: Task,
    pub pane_id: String,
    pub score: f64,
    pub confidence: f64,
    pub reason: String,
    pub breakdown: ScoreBreakdown,
}

/// Named assignment policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    Balanced,
    Speed,
    Quality,
    Dependency,
    RoundRobin,
}

impl Strategy {
    /// Parse a strategy name. Unknown names fall back to balanced with a
    /// logged warning rather than failing the caller.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "balanced" | "" => Self::Balanced,
            "speed" => Self::Speed,
            "quality" => Self::Quality,
            "dependency" => Self::Dependency,
            "round-robin" | "round_robin" | "roundrobin" => Self::RoundRobin,
            other => {
                warn!(strategy = other, "unknown assignment strategy, using balanced");
                Self::Balanced
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Speed => "speed",
            Self::Quality => "quality",
            Self::Dependency => "dependency",
            Self::RoundRobin => "round-robin",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

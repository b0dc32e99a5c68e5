// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contracts for the external backends the orchestrator consumes.
//!
//! The core never implements these: the terminal multiplexer, the triage
//! engine, and the memory store are separate processes reached through
//! thin adapters. Adapter failures must degrade — the orchestrator logs
//! and continues with empty results, never aborts a tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assign::Task;

/// One terminal pane hosting an assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pane {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub active: bool,
}

/// Terminal multiplexer operations.
pub trait TerminalAdapter: Send + Sync {
    /// Capture the current visible output of a pane.
    fn capture_pane(&self, pane_id: &str) -> anyhow::Result<String>;
    /// Type text into a pane.
    fn send_to_pane(&self, pane_id: &str, text: &str) -> anyhow::Result<()>;
    /// List the panes of a session.
    fn list_panes(&self, session: &str) -> anyhow::Result<Vec<Pane>>;
}

/// Triage output: ready-to-assign recommendations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriageSnapshot {
    pub recommendations: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub issue_count: usize,
}

/// One node in a dependency-graph metric listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntry {
    pub id: String,
    pub value: f64,
}

/// Dependency-graph analysis from the issue tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphInsights {
    #[serde(default)]
    pub bottlenecks: Vec<GraphEntry>,
    #[serde(default)]
    pub keystones: Vec<GraphEntry>,
    #[serde(default)]
    pub hubs: Vec<GraphEntry>,
    #[serde(default)]
    pub authorities: Vec<GraphEntry>,
    #[serde(default)]
    pub cycles: Vec<Vec<String>>,
}

/// Issue-tracker triage operations.
pub trait TriageAdapter: Send + Sync {
    fn triage(&self) -> anyhow::Result<TriageSnapshot>;
    fn insights(&self) -> anyhow::Result<GraphInsights>;
}

/// A retrieved workspace rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRule {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Rules and history retrieved for one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryContext {
    #[serde(default)]
    pub rules: Vec<MemoryRule>,
    #[serde(default)]
    pub anti_patterns: Vec<MemoryRule>,
    #[serde(default)]
    pub history_snippets: Vec<String>,
}

/// Memory-rule retrieval operations.
pub trait MemoryAdapter: Send + Sync {
    fn context(&self, project: &str, task: &str) -> anyhow::Result<MemoryContext>;
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use clap::Parser;

use crate::adapter::{
    GraphInsights, MemoryAdapter, MemoryContext, MemoryRule, Pane, TerminalAdapter, TriageAdapter,
    TriageSnapshot,
};
use crate::assign::{Task, TaskType};
use crate::config::Config;
use crate::quality::QualityMonitor;
use crate::webhook::{ManagerConfig, WebhookManager};

use super::Orchestrator;

struct MockTerminal {
    panes: Vec<Pane>,
    captures: HashMap<String, String>,
    sent: Mutex<Vec<(String, String)>>,
    fail_list: bool,
}

impl MockTerminal {
    fn new(captures: &[(&str, &str)]) -> Self {
        Self {
            panes: captures
                .iter()
                .map(|(id, _)| Pane { id: (*id).to_owned(), title: String::new(), active: true })
                .collect(),
            captures: captures
                .iter()
                .map(|(id, text)| ((*id).to_owned(), (*text).to_owned()))
                .collect(),
            sent: Mutex::new(vec![]),
            fail_list: false,
        }
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TerminalAdapter for MockTerminal {
    fn capture_pane(&self, pane_id: &str) -> anyhow::Result<String> {
        self.captures
            .get(pane_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such pane: {pane_id}"))
    }

    fn send_to_pane(&self, pane_id: &str, text: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pane_id.to_owned(), text.to_owned()));
        Ok(())
    }

    fn list_panes(&self, _session: &str) -> anyhow::Result<Vec<Pane>> {
        anyhow::ensure!(!self.fail_list, "tmux server gone");
        Ok(self.panes.clone())
    }
}

struct MockTriage {
    tasks: Vec<Task>,
    fail: bool,
}

impl TriageAdapter for MockTriage {
    fn triage(&self) -> anyhow::Result<TriageSnapshot> {
        anyhow::ensure!(!self.fail, "triage engine offline");
        Ok(TriageSnapshot {
            recommendations: self.tasks.clone(),
            generated_at: None,
            issue_count: self.tasks.len(),
        })
    }

    fn insights(&self) -> anyhow::Result<GraphInsights> {
        Ok(GraphInsights::default())
    }
}

struct MockMemory;

impl MemoryAdapter for MockMemory {
    fn context(&self, _project: &str, _task: &str) -> anyhow::Result<MemoryContext> {
        Ok(MemoryContext {
            rules: vec![MemoryRule {
                id: "r1".into(),
                content: "run the linter before committing".into(),
                category: None,
            }],
            anti_patterns: vec![],
            history_snippets: vec![],
        })
    }
}

const IDLE_CLAUDE: &str = "Claude Code v2.1.37\n\u{276f} ";
const WORKING_CLAUDE: &str = "Claude Code v2.1.37\nWriting to src/main.rs";

fn fixture(
    terminal: Arc<MockTerminal>,
) -> anyhow::Result<(Orchestrator, Arc<QualityMonitor>, Arc<WebhookManager>)> {
    let config = Config::try_parse_from(["ntm"])?;
    let quality = Arc::new(QualityMonitor::new());
    let webhooks = Arc::new(WebhookManager::new(ManagerConfig::default())?);
    webhooks.start()?;
    let orchestrator =
        Orchestrator::new(&config, terminal, Arc::clone(&quality), Arc::clone(&webhooks))?;
    Ok((orchestrator, quality, webhooks))
}

#[tokio::test]
async fn tick_assigns_idle_pane_only() -> anyhow::Result<()> {
    let terminal = Arc::new(MockTerminal::new(&[
        ("pane-idle", IDLE_CLAUDE),
        ("pane-busy", WORKING_CLAUDE),
    ]));
    let (orchestrator, _, webhooks) = fixture(Arc::clone(&terminal))?;
    let orchestrator = orchestrator.with_triage(Arc::new(MockTriage {
        tasks: vec![Task::new("t-1", "wire up the parser", TaskType::Task)],
        fail: false,
    }));

    let outcome = orchestrator.tick().await;
    assert_eq!(outcome.panes_observed, 2);
    assert_eq!(outcome.tasks_considered, 1);
    assert_eq!(outcome.assignments.len(), 1);
    assert_eq!(outcome.assignments[0].pane_id, "pane-idle");

    let sent = terminal.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "pane-idle");
    assert!(sent[0].1.contains("Work on t-1: wire up the parser"));

    webhooks.stop().await;
    Ok(())
}

#[tokio::test]
async fn missing_triage_adapter_degrades_to_empty() -> anyhow::Result<()> {
    let terminal = Arc::new(MockTerminal::new(&[("pane-1", IDLE_CLAUDE)]));
    let (orchestrator, _, webhooks) = fixture(Arc::clone(&terminal))?;

    let outcome = orchestrator.tick().await;
    assert_eq!(outcome.panes_observed, 1);
    assert_eq!(outcome.tasks_considered, 0);
    assert!(outcome.assignments.is_empty());
    assert!(terminal.sent().is_empty());

    webhooks.stop().await;
    Ok(())
}

#[tokio::test]
async fn failing_triage_adapter_degrades_to_empty() -> anyhow::Result<()> {
    let terminal = Arc::new(MockTerminal::new(&[("pane-1", IDLE_CLAUDE)]));
    let (orchestrator, _, webhooks) = fixture(Arc::clone(&terminal))?;
    let orchestrator =
        orchestrator.with_triage(Arc::new(MockTriage { tasks: vec![], fail: true }));

    let outcome = orchestrator.tick().await;
    assert!(outcome.assignments.is_empty());

    webhooks.stop().await;
    Ok(())
}

#[tokio::test]
async fn failing_terminal_adapter_skips_tick() -> anyhow::Result<()> {
    let mut terminal = MockTerminal::new(&[("pane-1", IDLE_CLAUDE)]);
    terminal.fail_list = true;
    let (orchestrator, _, webhooks) = fixture(Arc::new(terminal))?;

    let outcome = orchestrator.tick().await;
    assert_eq!(outcome.panes_observed, 0);

    webhooks.stop().await;
    Ok(())
}

#[tokio::test]
async fn briefing_prefixes_memory_rules() -> anyhow::Result<()> {
    let terminal = Arc::new(MockTerminal::new(&[("pane-1", IDLE_CLAUDE)]));
    let (orchestrator, _, webhooks) = fixture(Arc::clone(&terminal))?;
    let orchestrator = orchestrator
        .with_triage(Arc::new(MockTriage {
            tasks: vec![Task::new("t-1", "tidy the docs", TaskType::Docs)],
            fail: false,
        }))
        .with_memory(Arc::new(MockMemory));

    orchestrator.tick().await;

    let sent = terminal.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.starts_with("Follow these workspace rules:"));
    assert!(sent[0].1.contains("run the linter before committing"));
    assert!(sent[0].1.contains("Work on t-1"));

    webhooks.stop().await;
    Ok(())
}

#[tokio::test]
async fn context_usage_feeds_quality_monitor() -> anyhow::Result<()> {
    let terminal = Arc::new(MockTerminal::new(&[(
        "pane-1",
        "OpenAI Codex (research preview)\n47% context left \u{b7} ? for shortcuts",
    )]));
    let (orchestrator, quality, webhooks) = fixture(Arc::clone(&terminal))?;

    orchestrator.tick().await;

    let summary = quality.summary();
    let agent = summary.agents.get("pane-1");
    assert!(agent.is_some_and(|a| (a.context_avg - 53.0).abs() < 1e-9), "{summary:?}");

    webhooks.stop().await;
    Ok(())
}

#[tokio::test]
async fn error_transition_records_once() -> anyhow::Result<()> {
    let terminal = Arc::new(MockTerminal::new(&[(
        "pane-1",
        "Claude Code\nAPI Error: overloaded_error",
    )]));
    let (orchestrator, quality, webhooks) = fixture(Arc::clone(&terminal))?;

    orchestrator.tick().await;
    orchestrator.tick().await;

    let summary = quality.summary();
    let agent = summary.agents.get("pane-1");
    assert!(agent.is_some_and(|a| a.errors == 1), "{summary:?}");

    webhooks.stop().await;
    Ok(())
}

#[tokio::test]
async fn repeat_ticks_spread_load() -> anyhow::Result<()> {
    let terminal = Arc::new(MockTerminal::new(&[
        ("pane-a", IDLE_CLAUDE),
        ("pane-b", IDLE_CLAUDE),
    ]));
    let (orchestrator, _, webhooks) = fixture(Arc::clone(&terminal))?;
    let orchestrator = orchestrator.with_triage(Arc::new(MockTriage {
        tasks: vec![Task::new("t-1", "first", TaskType::Task)],
        fail: false,
    }));

    let first = orchestrator.tick().await;
    let second = orchestrator.tick().await;
    assert_eq!(first.assignments.len(), 1);
    assert_eq!(second.assignments.len(), 1);
    // The second tick goes to the other pane: its tracked load is lower.
    assert_ne!(first.assignments[0].pane_id, second.assignments[0].pane_id);

    webhooks.stop().await;
    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler tick: observe panes, fetch triage, assign, deliver,
//! record.
//!
//! Every adapter call degrades on failure — a missing triage engine or a
//! flaky capture produces an empty result and a warning, never a failed
//! tick.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::{MemoryAdapter, Pane, TerminalAdapter, TriageAdapter};
use crate::assign::{assign_tasks, AgentView, Assignment, Strategy, Task};
use crate::config::Config;
use crate::event::{event_type, Event};
use crate::observe::{detect_kind, parse, AgentStatus, ParseConfig, PatternTable, Recommendation};
use crate::quality::QualityMonitor;
use crate::webhook::WebhookManager;

/// What one tick observed and decided.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub panes_observed: usize,
    pub tasks_considered: usize,
    pub assignments: Vec<Assignment>,
}

#[derive(Default)]
struct AgentTracking {
    assignments: i32,
    last_assigned_at: Option<DateTime<Utc>>,
    reservations: Vec<String>,
    last_recommendation: Option<Recommendation>,
}

#[derive(Default)]
struct TrackingState {
    agents: HashMap<String, AgentTracking>,
    alerts: HashSet<String>,
}

/// Composes the pattern matcher, assignment matcher, quality monitor, and
/// webhook manager over the adapter seams.
pub struct Orchestrator {
    terminal: Arc<dyn TerminalAdapter>,
    triage: Option<Arc<dyn TriageAdapter>>,
    memory: Option<Arc<dyn MemoryAdapter>>,
    quality: Arc<QualityMonitor>,
    webhooks: Arc<WebhookManager>,
    patterns: PatternTable,
    session: String,
    strategy: Strategy,
    parse_config: ParseConfig,
    tick_interval: Duration,
    tracking: Mutex<TrackingState>,
}

impl Orchestrator {
    /// Build an orchestrator. Pattern compilation happens here and is the
    /// only fatal failure.
    pub fn new(
        config: &Config,
        terminal: Arc<dyn TerminalAdapter>,
        quality: Arc<QualityMonitor>,
        webhooks: Arc<WebhookManager>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            terminal,
            triage: None,
            memory: None,
            quality,
            webhooks,
            patterns: PatternTable::compile()?,
            session: config.session.clone(),
            strategy: config.strategy(),
            parse_config: config.parse_config(),
            tick_interval: config.tick_interval(),
            tracking: Mutex::new(TrackingState::default()),
        })
    }

    pub fn with_triage(mut self, triage: Arc<dyn TriageAdapter>) -> Self {
        self.triage = Some(triage);
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryAdapter>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Run ticks on the configured interval until cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            let outcome = self.tick().await;
            debug!(
                panes = outcome.panes_observed,
                tasks = outcome.tasks_considered,
                assignments = outcome.assignments.len(),
                "tick complete"
            );
        }
    }

    /// One scheduler pass.
    pub async fn tick(&self) -> TickOutcome {
        let panes = match self.terminal.list_panes(&self.session) {
            Ok(panes) => panes,
            Err(e) => {
                warn!(err = %e, "terminal adapter unavailable, skipping tick");
                return TickOutcome::default();
            }
        };

        let mut views = Vec::with_capacity(panes.len());
        for pane in &panes {
            let capture = match self.terminal.capture_pane(&pane.id) {
                Ok(capture) => capture,
                Err(e) => {
                    warn!(pane = %pane.id, err = %e, "pane capture failed");
                    continue;
                }
            };
            let kind = detect_kind(&capture, &self.patterns);
            let status = parse(&capture, kind, &self.patterns, &self.parse_config);

            if let Some(pct) = status.context_remaining_pct {
                self.quality.record_context_usage(&pane.id, 100.0 - pct);
            }
            self.note_transition(pane, &status);
            views.push(self.agent_view(pane, &status));
        }

        let tasks = self.fetch_tasks();
        let assignments = assign_tasks(&tasks, &views, self.strategy, &HashMap::new());

        let mut delivered = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let briefing = self.briefing(&assignment.task);
            if let Err(e) = self.terminal.send_to_pane(&assignment.pane_id, &briefing) {
                warn!(pane = %assignment.pane_id, err = %e, "failed to deliver assignment");
                continue;
            }

            {
                let mut tracking = self.tracking.lock().unwrap_or_else(PoisonError::into_inner);
                let agent = tracking.agents.entry(assignment.pane_id.clone()).or_default();
                agent.assignments = agent.assignments.max(0) + 1;
                agent.last_assigned_at = Some(Utc::now());
            }

            info!(
                task = %assignment.task.id,
                pane = %assignment.pane_id,
                score = assignment.score,
                "assigned task"
            );
            self.emit(
                Event::new(
                    event_type::TASK_ASSIGNED,
                    format!("assigned {} to {}", assignment.task.id, assignment.pane_id),
                )
                .with_session(self.session.clone())
                .with_pane(assignment.pane_id.clone())
                .with_details(serde_json::json!({
                    "task": assignment.task.id,
                    "score": assignment.score,
                    "reason": assignment.reason,
                })),
            );
            delivered.push(assignment);
        }

        self.emit_new_alerts();

        TickOutcome {
            panes_observed: panes.len(),
            tasks_considered: tasks.len(),
            assignments: delivered,
        }
    }

    /// Track recommendation transitions, emitting events and quality
    /// records on the edges.
    fn note_transition(&self, pane: &Pane, status: &AgentStatus) {
        let recommendation = status.recommendation();
        let previous = {
            let mut tracking = self.tracking.lock().unwrap_or_else(PoisonError::into_inner);
            let agent = tracking.agents.entry(pane.id.clone()).or_default();
            let previous = agent.last_recommendation;
            agent.last_recommendation = Some(recommendation);
            previous
        };

        if previous == Some(recommendation) {
            return;
        }

        match recommendation {
            Recommendation::RateLimitedWait => {
                self.emit(
                    Event::new(
                        event_type::AGENT_RATE_LIMITED,
                        format!("{} is rate limited", pane.id),
                    )
                    .with_session(self.session.clone())
                    .with_pane(pane.id.clone())
                    .with_agent(status.kind.to_string()),
                );
            }
            Recommendation::ErrorState => {
                self.quality.record_agent_error(&pane.id, "agent entered error state");
                self.emit(
                    Event::new(event_type::AGENT_ERROR, format!("{} reported an error", pane.id))
                        .with_session(self.session.clone())
                        .with_pane(pane.id.clone())
                        .with_agent(status.kind.to_string()),
                );
            }
            _ => {
                if previous == Some(Recommendation::ErrorState) {
                    self.quality.record_agent_recovery(&pane.id);
                }
                if previous.is_some() {
                    self.emit(
                        Event::new(
                            event_type::AGENT_STATE_CHANGED,
                            format!("{} is now {}", pane.id, recommendation),
                        )
                        .with_session(self.session.clone())
                        .with_pane(pane.id.clone())
                        .with_agent(status.kind.to_string()),
                    );
                }
            }
        }
    }

    fn agent_view(&self, pane: &Pane, status: &AgentStatus) -> AgentView {
        let tracking = self.tracking.lock().unwrap_or_else(PoisonError::into_inner);
        let record = tracking.agents.get(&pane.id);
        AgentView {
            pane_id: pane.id.clone(),
            kind: status.kind,
            context_usage: status.context_remaining_pct.map_or(0.0, |pct| 100.0 - pct),
            idle: status.is_idle,
            assignments: record.map_or(0, |r| r.assignments),
            last_assigned_at: record.and_then(|r| r.last_assigned_at),
            profile: None,
            reservations: record.map(|r| r.reservations.clone()).unwrap_or_default(),
        }
    }

    fn fetch_tasks(&self) -> Vec<Task> {
        let Some(triage) = &self.triage else {
            debug!("no triage adapter configured");
            return vec![];
        };
        match triage.insights() {
            Ok(insights) if !insights.bottlenecks.is_empty() => {
                debug!(bottlenecks = insights.bottlenecks.len(), "dependency bottlenecks present");
            }
            Ok(_) => {}
            Err(e) => debug!(err = %e, "graph insights unavailable"),
        }
        match triage.triage() {
            Ok(snapshot) => snapshot.recommendations,
            Err(e) => {
                warn!(err = %e, "triage adapter unavailable, continuing without tasks");
                vec![]
            }
        }
    }

    /// The text typed into a pane to hand over a task. Memory rules are
    /// prefixed when a memory adapter is configured.
    fn briefing(&self, task: &Task) -> String {
        let mut text = String::new();

        if let Some(memory) = &self.memory {
            match memory.context(&self.session, &task.id) {
                Ok(context) if !context.rules.is_empty() => {
                    text.push_str("Follow these workspace rules:\n");
                    for rule in &context.rules {
                        text.push_str("- ");
                        text.push_str(&rule.content);
                        text.push('\n');
                    }
                    text.push('\n');
                }
                Ok(_) => {}
                Err(e) => warn!(task = %task.id, err = %e, "memory adapter unavailable"),
            }
        }

        text.push_str(&format!("Work on {}: {}", task.id, task.title));
        if let Some(description) = &task.description {
            text.push('\n');
            text.push_str(description);
        }
        text
    }

    fn emit(&self, event: Event) {
        if let Err(e) = self.webhooks.dispatch(event) {
            debug!(err = %e, "event not dispatched");
        }
    }

    /// Dispatch quality alerts that were not present last tick.
    fn emit_new_alerts(&self) {
        let summary = self.quality.summary();
        let fresh: Vec<String> = {
            let mut tracking = self.tracking.lock().unwrap_or_else(PoisonError::into_inner);
            let current: HashSet<String> = summary.alerts.iter().cloned().collect();
            let fresh =
                current.difference(&tracking.alerts).cloned().collect::<Vec<_>>();
            tracking.alerts = current;
            fresh
        };
        for alert in fresh {
            self.emit(
                Event::new(event_type::QUALITY_ALERT, alert)
                    .with_session(self.session.clone())
                    .with_details(serde_json::json!({
                        "quality_score": summary.quality_score,
                    })),
            );
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

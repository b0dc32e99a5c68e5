// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project-quality aggregation.
//!
//! One reader-writer lock guards all state. Recording operations take the
//! write lock briefly and maintain trends incrementally; snapshot
//! accessors take the read lock once and never recompute trends. Nothing
//! here awaits, so the monitor is safe to share across async tasks.

pub mod trend;

pub use trend::TrendDirection;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bounded history sizes.
const SCAN_HISTORY_LIMIT: usize = 100;
const TEST_HISTORY_LIMIT: usize = 500;
const CONTEXT_SAMPLE_LIMIT: usize = 1000;
const AGENT_ERROR_LIMIT: usize = 100;

/// Result of one scanner run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetrics {
    pub critical: u32,
    pub warning: u32,
    pub info: u32,
    pub files_scanned: u32,
    pub duration_ms: u64,
    pub exit_code: i32,
    pub timestamp: DateTime<Utc>,
}

/// Result of one test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub duration_ms: u64,
    pub package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One recorded context-usage observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextSample {
    pub timestamp: DateTime<Utc>,
    pub usage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AgentError {
    timestamp: DateTime<Utc>,
    message: String,
}

#[derive(Debug, Default)]
struct AgentRecord {
    tests_passed: u64,
    tests_failed: u64,
    errors: VecDeque<AgentError>,
    error_total: u64,
    recoveries: u64,
    bugs_introduced: u64,
    bugs_fixed: u64,
    context: VecDeque<ContextSample>,
    context_avg: f64,
    context_peak: f64,
    context_count: u64,
}

/// Trend directions for each tracked signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTrends {
    pub bugs: TrendDirection,
    pub tests: TrendDirection,
    pub errors: TrendDirection,
    pub context: TrendDirection,
}

/// Per-agent portion of a quality summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub tests_passed: u64,
    pub tests_failed: u64,
    pub errors: u64,
    pub recoveries: u64,
    pub bugs_introduced: u64,
    pub bugs_fixed: u64,
    pub context_avg: f64,
    pub context_peak: f64,
    pub score: f64,
}

/// Consistent snapshot of the monitor's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub quality_score: f64,
    pub scans_recorded: usize,
    pub tests_recorded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_scan: Option<ScanMetrics>,
    pub trends: QualityTrends,
    pub alerts: Vec<String>,
    pub agents: BTreeMap<String, AgentSummary>,
}

#[derive(Default)]
struct Inner {
    scans: VecDeque<ScanMetrics>,
    tests: VecDeque<TestRun>,
    agents: HashMap<String, AgentRecord>,
    trends: QualityTrends,
    consecutive_scan_failures: u32,
    scanner_available: bool,
}

/// Thread-safe quality aggregator.
#[derive(Default)]
pub struct QualityMonitor {
    inner: RwLock<Inner>,
}

impl QualityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declare whether an external scanner is configured. Staleness alerts
    /// only fire when one is.
    pub fn set_scanner_available(&self, available: bool) {
        self.write().scanner_available = available;
    }

    /// Record one scanner run.
    pub fn record_scan(&self, scan: ScanMetrics) {
        let mut inner = self.write();
        if scan.exit_code != 0 {
            inner.consecutive_scan_failures += 1;
        } else {
            inner.consecutive_scan_failures = 0;
        }
        inner.scans.push_back(scan);
        while inner.scans.len() > SCAN_HISTORY_LIMIT {
            inner.scans.pop_front();
        }
        update_bugs_trend(&mut inner);
    }

    /// Record one test run, crediting the owning agent when named.
    pub fn record_test_run(&self, run: TestRun) {
        let mut inner = self.write();
        if let Some(pane) = run.agent.clone() {
            let record = inner.agents.entry(pane).or_default();
            record.tests_passed += u64::from(run.passed);
            record.tests_failed += u64::from(run.failed);
        }
        inner.tests.push_back(run);
        while inner.tests.len() > TEST_HISTORY_LIMIT {
            inner.tests.pop_front();
        }
        update_tests_trend(&mut inner);
    }

    /// Record an agent-reported error.
    pub fn record_agent_error(&self, pane_id: &str, message: impl Into<String>) {
        self.record_agent_error_at(pane_id, message, Utc::now());
    }

    /// Record an agent-reported error with an explicit timestamp
    /// (backfill entry point).
    pub fn record_agent_error_at(
        &self,
        pane_id: &str,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        let mut inner = self.write();
        let record = inner.agents.entry(pane_id.to_owned()).or_default();
        record.error_total += 1;
        record.errors.push_back(AgentError { timestamp: at, message: message.into() });
        while record.errors.len() > AGENT_ERROR_LIMIT {
            record.errors.pop_front();
        }
        update_errors_trend(&mut inner, at);
    }

    /// Record that an agent recovered from an error state.
    pub fn record_agent_recovery(&self, pane_id: &str) {
        let mut inner = self.write();
        inner.agents.entry(pane_id.to_owned()).or_default().recoveries += 1;
    }

    /// Record a context-usage sample for an agent.
    pub fn record_context_usage(&self, pane_id: &str, usage: f64) {
        self.record_context_usage_at(pane_id, usage, Utc::now());
    }

    /// Record a context-usage sample with an explicit timestamp.
    pub fn record_context_usage_at(&self, pane_id: &str, usage: f64, at: DateTime<Utc>) {
        let mut inner = self.write();
        let record = inner.agents.entry(pane_id.to_owned()).or_default();
        record.context.push_back(ContextSample { timestamp: at, usage });
        while record.context.len() > CONTEXT_SAMPLE_LIMIT {
            record.context.pop_front();
        }
        record.context_count += 1;
        // Running average over everything ever recorded, not just the
        // retained window.
        record.context_avg +=
            (usage - record.context_avg) / record.context_count as f64;
        record.context_peak = record.context_peak.max(usage);
        update_context_trend(&mut inner);
    }

    /// Record that an agent introduced a bug.
    pub fn record_bug_introduced(&self, pane_id: &str) {
        let mut inner = self.write();
        inner.agents.entry(pane_id.to_owned()).or_default().bugs_introduced += 1;
        debug!(pane = pane_id, "bug introduced");
    }

    /// Record that an agent fixed a bug.
    pub fn record_bug_fixed(&self, pane_id: &str) {
        let mut inner = self.write();
        inner.agents.entry(pane_id.to_owned()).or_default().bugs_fixed += 1;
    }

    /// Project-wide quality score in [0,100].
    pub fn quality_score(&self) -> f64 {
        project_score(&self.read())
    }

    /// Per-agent quality score in [0,100]; `None` for unseen panes.
    pub fn agent_quality_score(&self, pane_id: &str) -> Option<f64> {
        self.read().agents.get(pane_id).map(agent_score)
    }

    /// One consistent snapshot: scores, trends, alerts, per-agent stats.
    ///
    /// Takes the read lock once; trends come from the incrementally
    /// maintained state.
    pub fn summary(&self) -> QualitySummary {
        let inner = self.read();
        let agents = inner
            .agents
            .iter()
            .map(|(pane, record)| {
                (
                    pane.clone(),
                    AgentSummary {
                        tests_passed: record.tests_passed,
                        tests_failed: record.tests_failed,
                        errors: record.error_total,
                        recoveries: record.recoveries,
                        bugs_introduced: record.bugs_introduced,
                        bugs_fixed: record.bugs_fixed,
                        context_avg: record.context_avg,
                        context_peak: record.context_peak,
                        score: agent_score(record),
                    },
                )
            })
            .collect();

        QualitySummary {
            quality_score: project_score(&inner),
            scans_recorded: inner.scans.len(),
            tests_recorded: inner.tests.len(),
            last_scan: inner.scans.back().cloned(),
            trends: inner.trends,
            alerts: alerts(&inner, Utc::now()),
            agents,
        }
    }
}

fn overall_test_rates(tests: &VecDeque<TestRun>) -> (u64, u64) {
    let passed = tests.iter().map(|t| u64::from(t.passed)).sum();
    let failed = tests.iter().map(|t| u64::from(t.failed)).sum();
    (passed, failed)
}

fn project_score(inner: &Inner) -> f64 {
    let mut score = 100.0;

    if let Some(scan) = inner.scans.back() {
        score -= 10.0 * f64::from(scan.critical);
        score -= 2.0 * f64::from(scan.warning);
    }

    let (passed, failed) = overall_test_rates(&inner.tests);
    if passed + failed > 0 {
        let fail_rate = failed as f64 / (passed + failed) as f64;
        score -= 30.0 * fail_rate;
    }

    let total_errors: u64 = inner.agents.values().map(|a| a.error_total).sum();
    score -= 0.5 * total_errors as f64;

    score.clamp(0.0, 100.0)
}

fn agent_score(record: &AgentRecord) -> f64 {
    let mut score = 100.0;

    let attempted = record.tests_passed + record.tests_failed;
    if attempted > 0 {
        let pass_rate = record.tests_passed as f64 / attempted as f64;
        score *= 0.5 + 0.5 * pass_rate;
    }

    score += 5.0 * (record.bugs_fixed as f64 - record.bugs_introduced as f64);

    let ratio = record.error_total as f64 / record.recoveries.max(1) as f64;
    if ratio > 1.0 {
        score -= (ratio - 1.0) * 10.0;
    }

    if record.context_avg > 80.0 {
        score -= (record.context_avg - 80.0) * 0.5;
    }

    score.clamp(0.0, 100.0)
}

fn update_bugs_trend(inner: &mut Inner) {
    let n = inner.scans.len();
    if n < 3 {
        return;
    }
    let older = &inner.scans[n - 3];
    let newer = &inner.scans[n - 1];
    inner.trends.bugs = trend::count_trend(
        u64::from(older.critical + older.warning),
        u64::from(newer.critical + newer.warning),
    );
}

fn half_pass_rate(runs: &[&TestRun]) -> f64 {
    let passed: u64 = runs.iter().map(|t| u64::from(t.passed)).sum();
    let failed: u64 = runs.iter().map(|t| u64::from(t.failed)).sum();
    if passed + failed == 0 {
        return 1.0;
    }
    passed as f64 / (passed + failed) as f64
}

fn update_tests_trend(inner: &mut Inner) {
    let n = inner.tests.len();
    if n < 10 {
        return;
    }
    let window: Vec<&TestRun> = inner.tests.iter().skip(n.saturating_sub(20)).collect();
    let mid = window.len() / 2;
    let older = half_pass_rate(&window[..mid]);
    let newer = half_pass_rate(&window[mid..]);
    inner.trends.tests = trend::rate_trend(older, newer, 0.05);
}

fn update_errors_trend(inner: &mut Inner, now: DateTime<Utc>) {
    let hour_ago = now - Duration::hours(1);
    let two_hours_ago = now - Duration::hours(2);

    let mut recent = 0u64;
    let mut previous = 0u64;
    for record in inner.agents.values() {
        for err in &record.errors {
            if err.timestamp > hour_ago && err.timestamp <= now {
                recent += 1;
            } else if err.timestamp > two_hours_ago && err.timestamp <= hour_ago {
                previous += 1;
            }
        }
    }
    inner.trends.errors = trend::count_trend(previous, recent);
}

fn update_context_trend(inner: &mut Inner) {
    let total: usize = inner.agents.values().map(|a| a.context.len()).sum();
    if total < 20 {
        return;
    }
    let mut samples: Vec<ContextSample> =
        inner.agents.values().flat_map(|a| a.context.iter().copied()).collect();
    samples.sort_by_key(|s| s.timestamp);

    let tail: Vec<f64> =
        samples.iter().skip(samples.len().saturating_sub(20)).map(|s| s.usage).collect();
    let mid = tail.len() / 2;
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len().max(1) as f64;
    inner.trends.context = trend::usage_trend(mean(&tail[..mid]), mean(&tail[mid..]), 5.0);
}

fn alerts(inner: &Inner, now: DateTime<Utc>) -> Vec<String> {
    let mut alerts = Vec::new();

    if let Some(scan) = inner.scans.back() {
        if scan.critical > 0 {
            alerts.push(format!("critical findings in last scan: {}", scan.critical));
        }
        if inner.scanner_available {
            let age = now - scan.timestamp;
            if age > Duration::minutes(30) {
                alerts.push(format!("scan results stale ({} minutes old)", age.num_minutes()));
            }
        }
    }

    if inner.tests.len() >= 5 {
        let (passed, failed) = overall_test_rates(&inner.tests);
        if passed + failed > 0 {
            let rate = passed as f64 / (passed + failed) as f64;
            if rate < 0.8 {
                alerts.push(format!("test pass rate below 80% ({:.0}%)", rate * 100.0));
            }
        }
    }

    for (pane, record) in &inner.agents {
        if record.context_avg > 80.0 {
            alerts.push(format!(
                "agent {pane} context usage high (avg {:.0}%)",
                record.context_avg
            ));
        }
    }

    if inner.consecutive_scan_failures >= 3 {
        alerts.push(format!("{} consecutive scan failures", inner.consecutive_scan_failures));
    }

    for (name, direction) in [
        ("bugs", inner.trends.bugs),
        ("tests", inner.trends.tests),
        ("errors", inner.trends.errors),
        ("context", inner.trends.context),
    ] {
        if direction == TrendDirection::Declining {
            alerts.push(format!("{name} trend declining"));
        }
    }

    alerts
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;

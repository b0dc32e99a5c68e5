// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pair enumeration and greedy non-conflicting selection.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::score::{score_pair, ScoredPair};
use super::{AgentView, Assignment, Strategy, Task, TaskStatus};

/// Assign ready tasks to available agents under `strategy`.
///
/// `external_reservations` maps pane ids to path globs reserved outside
/// the agents' own records (e.g. by a coordinator process).
///
/// Each agent and each task appears in at most one assignment. Empty or
/// fully filtered input yields an empty result, never an error.
pub fn assign_tasks(
    tasks: &[Task],
    agents: &[AgentView],
    strategy: Strategy,
    external_reservations: &HashMap<String, Vec<String>>,
) -> Vec<Assignment> {
    let eligible_tasks: Vec<&Task> = tasks
        .iter()
        .filter(|t| {
            if t.id.is_empty() {
                warn!(title = %t.title, "skipping task with missing id");
                return false;
            }
            t.status != TaskStatus::Blocked
        })
        .collect();

    let eligible_agents: Vec<&AgentView> = agents.iter().filter(|a| a.available()).collect();

    if eligible_tasks.is_empty() || eligible_agents.is_empty() {
        return vec![];
    }

    if strategy == Strategy::RoundRobin {
        return round_robin(&eligible_tasks, &eligible_agents, external_reservations);
    }

    let cfg = strategy.score_config();

    struct Candidate<'a> {
        task: &'a Task,
        agent: &'a AgentView,
        scored: ScoredPair,
    }

    let mut candidates: Vec<Candidate<'_>> = Vec::with_capacity(
        eligible_tasks.len() * eligible_agents.len(),
    );
    for &task in &eligible_tasks {
        for &agent in &eligible_agents {
            let external = external_reservations
                .get(&agent.pane_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let scored = score_pair(task, agent, external, &cfg);
            candidates.push(Candidate { task, agent, scored });
        }
    }

    // Descending score, then the deterministic tie-break chain. The
    // dependency strategy puts blocker length ahead of everything so a
    // modest task that unblocks three others beats a high-scoring leaf.
    candidates.sort_by(|a, b| {
        if strategy == Strategy::Dependency {
            let by_unblocks = b.task.unblocks.len().cmp(&a.task.unblocks.len());
            if by_unblocks != Ordering::Equal {
                return by_unblocks;
            }
        }
        b.scored
            .score
            .total_cmp(&a.scored.score)
            .then_with(|| a.agent.assignment_load().cmp(&b.agent.assignment_load()))
            .then_with(|| b.agent.idle.cmp(&a.agent.idle))
            .then_with(|| match (a.agent.last_assigned_at, b.agent.last_assigned_at) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => x.cmp(&y),
            })
            .then_with(|| a.agent.pane_id.cmp(&b.agent.pane_id))
            .then_with(|| a.task.id.cmp(&b.task.id))
    });

    let mut used_agents: HashSet<&str> = HashSet::new();
    let mut used_tasks: HashSet<&str> = HashSet::new();
    let mut assignments = Vec::new();

    for c in candidates {
        if used_agents.contains(c.agent.pane_id.as_str()) || used_tasks.contains(c.task.id.as_str())
        {
            continue;
        }
        used_agents.insert(c.agent.pane_id.as_str());
        used_tasks.insert(c.task.id.as_str());
        debug!(
            task = %c.task.id,
            pane = %c.agent.pane_id,
            score = c.scored.score,
            reason = %c.scored.reason,
            "selected assignment"
        );
        assignments.push(Assignment {
            task: c.task.clone(),
            pane_id: c.agent.pane_id.clone(),
            score: c.scored.score,
            confidence: c.scored.confidence,
            reason: c.scored.reason,
            breakdown: c.scored.breakdown,
        });
        if assignments.len() == eligible_agents.len() {
            break;
        }
    }

    assignments
}

/// One task per agent, agents ordered by (load, pane id), best tasks first.
fn round_robin(
    tasks: &[&Task],
    agents: &[&AgentView],
    external_reservations: &HashMap<String, Vec<String>>,
) -> Vec<Assignment> {
    let mut ordered_agents: Vec<&AgentView> = agents.to_vec();
    ordered_agents.sort_by(|a, b| {
        a.assignment_load()
            .cmp(&b.assignment_load())
            .then_with(|| a.pane_id.cmp(&b.pane_id))
    });

    let mut ordered_tasks: Vec<&Task> = tasks.to_vec();
    ordered_tasks.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

    let cfg = Strategy::RoundRobin.score_config();
    ordered_agents
        .iter()
        .copied()
        .zip(ordered_tasks)
        .map(|(agent, task)| {
            let external = external_reservations
                .get(&agent.pane_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let scored = score_pair(task, agent, external, &cfg);
            Assignment {
                task: task.clone(),
                pane_id: agent.pane_id.clone(),
                score: scored.score,
                confidence: scored.confidence,
                reason: scored.reason,
                breakdown: scored.breakdown,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;

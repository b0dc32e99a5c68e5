// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known event types emitted by the orchestrator.
pub mod event_type {
    pub const TASK_ASSIGNED: &str = "task_assigned";
    pub const AGENT_STATE_CHANGED: &str = "agent_state_changed";
    pub const AGENT_RATE_LIMITED: &str = "agent_rate_limited";
    pub const AGENT_ERROR: &str = "agent_error";
    pub const QUALITY_ALERT: &str = "quality_alert";
}

/// One orchestrator event, fanned out to subscribed webhook endpoints.
///
/// `id` and `timestamp` may be left empty by producers; the webhook
/// manager fills them at dispatch time. Timestamps serialize as RFC 3339
/// UTC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pane: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self { event_type: event_type.into(), message: message.into(), ..Self::default() }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn with_pane(mut self, pane: impl Into<String>) -> Self {
        self.pane = Some(pane.into());
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

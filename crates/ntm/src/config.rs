// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::assign::Strategy;
use crate::observe::ParseConfig;
use crate::webhook::ManagerConfig;

/// Multi-agent terminal orchestrator.
#[derive(Debug, Clone, Parser)]
#[command(name = "ntm", version, about)]
pub struct Config {
    /// Terminal session to supervise.
    #[arg(long, env = "NTM_SESSION", default_value = "ntm")]
    pub session: String,

    /// Seconds between orchestrator ticks.
    #[arg(long, env = "NTM_TICK_INTERVAL", default_value = "10")]
    pub tick_interval: u64,

    /// Assignment strategy (balanced, speed, quality, dependency, round-robin).
    #[arg(long, env = "NTM_STRATEGY", default_value = "balanced")]
    pub strategy: String,

    /// Trailing lines of each pane capture to classify.
    #[arg(long, env = "NTM_SAMPLE_LENGTH", default_value = "500")]
    pub sample_length: usize,

    /// Context percentage at or below which an agent counts as low.
    #[arg(long, env = "NTM_CONTEXT_LOW", default_value = "20")]
    pub context_low_threshold: f64,

    /// State directory for policy, logs, and the state store.
    #[arg(long, env = "NTM_STATE_DIR", default_value = ".ntm")]
    pub state_dir: PathBuf,

    /// Webhook delivery queue capacity.
    #[arg(long, env = "NTM_QUEUE_SIZE", default_value = "1000")]
    pub queue_size: usize,

    /// Webhook delivery worker count.
    #[arg(long, env = "NTM_WORKERS", default_value = "10")]
    pub workers: usize,

    /// Dead letters retained for inspection.
    #[arg(long, env = "NTM_DEAD_LETTER_LIMIT", default_value = "100")]
    pub dead_letter_limit: usize,

    /// Default per-endpoint delivery timeout in seconds.
    #[arg(long, env = "NTM_WEBHOOK_TIMEOUT", default_value = "30")]
    pub webhook_timeout: u64,

    /// Shutdown drain budget in seconds.
    #[arg(long, env = "NTM_DRAIN_TIMEOUT", default_value = "10")]
    pub drain_timeout: u64,

    /// Log format (json or text).
    #[arg(long, env = "NTM_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "NTM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.log_format != "json" && self.log_format != "text" {
            anyhow::bail!("invalid log format: {} (expected json or text)", self.log_format);
        }
        if self.tick_interval == 0 {
            anyhow::bail!("tick interval must be at least 1 second");
        }
        if !(0.0..=100.0).contains(&self.context_low_threshold) {
            anyhow::bail!("context low threshold must be within 0..=100");
        }
        Ok(())
    }

    /// The parsed assignment strategy (unknown names fall back to balanced).
    pub fn strategy(&self) -> Strategy {
        Strategy::parse(&self.strategy)
    }

    /// Parsing tunables for the pattern matcher.
    pub fn parse_config(&self) -> ParseConfig {
        ParseConfig {
            sample_length: self.sample_length,
            context_low_threshold: self.context_low_threshold,
        }
    }

    /// Webhook manager settings.
    pub fn webhook_config(&self) -> ManagerConfig {
        ManagerConfig {
            queue_size: self.queue_size,
            workers: self.workers,
            dead_letter_limit: self.dead_letter_limit,
            default_timeout: Duration::from_secs(self.webhook_timeout),
            drain_timeout: Duration::from_secs(self.drain_timeout),
            ..ManagerConfig::default()
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

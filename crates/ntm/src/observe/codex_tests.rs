// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::observe::{parse, AgentKind, ParseConfig, PatternTable, Recommendation};

fn table() -> anyhow::Result<PatternTable> {
    PatternTable::compile()
}

#[test]
fn idle_status_line_extracts_context() -> anyhow::Result<()> {
    let table = table()?;
    let status = parse(
        "47% context left \u{b7} ? for shortcuts",
        AgentKind::Codex,
        &table,
        &ParseConfig::default(),
    );
    assert!(status.is_idle);
    assert!(!status.is_working);
    assert_eq!(status.context_remaining_pct, Some(47.0));
    assert!(!status.is_context_low);
    assert_eq!(status.recommendation(), Recommendation::SafeToRestart);
    Ok(())
}

#[test]
fn exhausted_context_is_idle_but_not_restartable() -> anyhow::Result<()> {
    let table = table()?;
    let status = parse(
        "0% context left \u{b7} ? for shortcuts",
        AgentKind::Codex,
        &table,
        &ParseConfig::default(),
    );
    assert!(status.is_idle);
    assert!(status.is_context_low);
    assert_eq!(status.context_remaining_pct, Some(0.0));
    assert_eq!(status.recommendation(), Recommendation::ContextLowContinue);
    Ok(())
}

#[test]
fn working_status() -> anyhow::Result<()> {
    let table = table()?;
    let status = parse(
        "Running command: cargo check\nesc to interrupt",
        AgentKind::Codex,
        &table,
        &ParseConfig::default(),
    );
    assert!(status.is_working);
    assert_eq!(status.recommendation(), Recommendation::DoNotInterrupt);
    Ok(())
}

#[test]
fn token_count_tolerates_commas() -> anyhow::Result<()> {
    let table = table()?;
    let status = parse(
        "Tokens used: 1,234,567\n88% context left",
        AgentKind::Codex,
        &table,
        &ParseConfig::default(),
    );
    assert_eq!(status.tokens_used, Some(1_234_567));
    assert_eq!(status.context_remaining_pct, Some(88.0));
    Ok(())
}

#[test]
fn rate_limited_overrides_idle_recommendation() -> anyhow::Result<()> {
    let table = table()?;
    let status = parse(
        "Rate limit reached, retrying\n12% context left",
        AgentKind::Codex,
        &table,
        &ParseConfig::default(),
    );
    assert!(status.is_rate_limited);
    assert_eq!(status.recommendation(), Recommendation::RateLimitedWait);
    Ok(())
}

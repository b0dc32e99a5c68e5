// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::observe::{detect_kind, parse, AgentKind, ParseConfig, PatternTable, Recommendation};

fn table() -> anyhow::Result<PatternTable> {
    PatternTable::compile()
}

#[test]
fn working_indicator_sets_working() -> anyhow::Result<()> {
    let table = table()?;
    let status = parse(
        "Claude Code v2.1.37\nWriting to src/main.rs\n",
        AgentKind::Claude,
        &table,
        &ParseConfig::default(),
    );
    assert!(status.is_working);
    assert!(!status.is_idle);
    assert_eq!(status.work_indicators, vec!["Writing to".to_owned()]);
    assert_eq!(status.recommendation(), Recommendation::DoNotInterrupt);
    Ok(())
}

#[test]
fn rate_limit_with_working_prefers_wait() -> anyhow::Result<()> {
    let table = table()?;
    let text = "Writing to foo.go\nRate limit exceeded\n";
    let status = parse(text, AgentKind::Claude, &table, &ParseConfig::default());
    assert!(status.is_working);
    assert!(status.is_rate_limited);
    assert_eq!(status.recommendation(), Recommendation::RateLimitedWait);
    Ok(())
}

#[test]
fn idle_prompt_on_tail() -> anyhow::Result<()> {
    let table = table()?;
    let text = "Claude Code v2.1.37\n\n\u{276f} Try \"fix lint errors\"\n\n";
    let status = parse(text, AgentKind::Claude, &table, &ParseConfig::default());
    assert!(status.is_idle);
    assert!(!status.is_working);
    assert_eq!(status.recommendation(), Recommendation::SafeToRestart);
    Ok(())
}

#[test]
fn working_suppresses_idle_even_with_prompt() -> anyhow::Result<()> {
    let table = table()?;
    let text = "Thinking\n\u{276f} \n";
    let status = parse(text, AgentKind::Claude, &table, &ParseConfig::default());
    assert!(status.is_working);
    assert!(!status.is_idle);
    Ok(())
}

#[test]
fn context_gauge_extracts_and_flags_low() -> anyhow::Result<()> {
    let table = table()?;
    let text = "Context left until auto-compact: 8%\nThinking\n";
    let status = parse(text, AgentKind::Claude, &table, &ParseConfig::default());
    assert_eq!(status.context_remaining_pct, Some(8.0));
    assert!(status.is_context_low);
    assert_eq!(status.recommendation(), Recommendation::ContextLowContinue);
    Ok(())
}

#[test]
fn matching_is_case_insensitive_for_literals() -> anyhow::Result<()> {
    let table = table()?;
    let status =
        parse("RATE LIMIT EXCEEDED\n", AgentKind::Claude, &table, &ParseConfig::default());
    assert!(status.is_rate_limited);
    Ok(())
}

#[test]
fn ansi_escapes_do_not_hide_signals() -> anyhow::Result<()> {
    let table = table()?;
    let text = "\u{1b}[1mWriting to\u{1b}[0m src/lib.rs\n";
    let status = parse(text, AgentKind::Claude, &table, &ParseConfig::default());
    assert!(status.is_working);
    Ok(())
}

#[test]
fn header_detection() -> anyhow::Result<()> {
    let table = table()?;
    assert_eq!(detect_kind("Claude Code v2.1.37\n\u{276f} ", &table), AgentKind::Claude);
    Ok(())
}

#[test]
fn confidence_grows_with_signals() -> anyhow::Result<()> {
    let table = table()?;
    let bare = parse("some unrelated output\n", AgentKind::Claude, &table, &ParseConfig::default());
    let rich = parse(
        "Claude Code v2.1.37\nContext left until auto-compact: 45%\nThinking\n",
        AgentKind::Claude,
        &table,
        &ParseConfig::default(),
    );
    assert!(rich.confidence > bare.confidence);
    assert!((rich.confidence - 0.7).abs() < 1e-9);
    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use regex::Regex;

use super::{extract_float, extract_u64};

fn pct_re() -> anyhow::Result<Regex> {
    Ok(Regex::new(r"(\d+(?:\.\d+)?)% context left")?)
}

fn tokens_re() -> anyhow::Result<Regex> {
    Ok(Regex::new(r"([\d,]+) tokens used")?)
}

#[test]
fn float_ignores_surrounding_text() -> anyhow::Result<()> {
    let re = pct_re()?;
    let bare = extract_float(&re, "47% context left");
    let framed = extract_float(&re, "status bar · 47% context left · ? for shortcuts");
    assert_eq!(bare, Some(47.0));
    assert_eq!(framed, bare);
    Ok(())
}

#[test]
fn float_parses_decimals() -> anyhow::Result<()> {
    let re = pct_re()?;
    assert_eq!(extract_float(&re, "12.5% context left"), Some(12.5));
    Ok(())
}

#[test]
fn u64_strips_thousands_separators() -> anyhow::Result<()> {
    let re = tokens_re()?;
    assert_eq!(extract_u64(&re, "1,234,567 tokens used"), Some(1_234_567));
    assert_eq!(extract_u64(&re, "1234567 tokens used"), Some(1_234_567));
    Ok(())
}

#[test]
fn no_match_returns_none() -> anyhow::Result<()> {
    let re = pct_re()?;
    assert_eq!(extract_float(&re, "no context markers here"), None);
    assert_eq!(extract_float(&re, ""), None);
    Ok(())
}

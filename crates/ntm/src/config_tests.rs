// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use crate::assign::Strategy;

use super::Config;

fn parse(args: &[&str]) -> anyhow::Result<Config> {
    let mut full = vec!["ntm"];
    full.extend_from_slice(args);
    Ok(Config::try_parse_from(full)?)
}

#[test]
fn defaults_are_valid() -> anyhow::Result<()> {
    let config = parse(&[])?;
    config.validate()?;
    assert_eq!(config.session, "ntm");
    assert_eq!(config.queue_size, 1000);
    assert_eq!(config.workers, 10);
    assert_eq!(config.strategy(), Strategy::Balanced);
    Ok(())
}

#[test]
fn strategy_flag_parses() -> anyhow::Result<()> {
    let config = parse(&["--strategy", "dependency"])?;
    assert_eq!(config.strategy(), Strategy::Dependency);

    let config = parse(&["--strategy", "bogus"])?;
    assert_eq!(config.strategy(), Strategy::Balanced);
    Ok(())
}

#[test]
fn invalid_log_format_fails_validation() -> anyhow::Result<()> {
    let config = parse(&["--log-format", "xml"])?;
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn zero_tick_interval_fails_validation() -> anyhow::Result<()> {
    let config = parse(&["--tick-interval", "0"])?;
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn out_of_range_threshold_fails_validation() -> anyhow::Result<()> {
    let config = parse(&["--context-low-threshold", "150"])?;
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn webhook_config_maps_durations() -> anyhow::Result<()> {
    let config = parse(&["--webhook-timeout", "5", "--drain-timeout", "2"])?;
    let manager = config.webhook_config();
    assert_eq!(manager.default_timeout, std::time::Duration::from_secs(5));
    assert_eq!(manager.drain_timeout, std::time::Duration::from_secs(2));
    Ok(())
}

#[test]
fn parse_config_maps_tunables() -> anyhow::Result<()> {
    let config = parse(&["--sample-length", "100", "--context-low-threshold", "35"])?;
    let parse_config = config.parse_config();
    assert_eq!(parse_config.sample_length, 100);
    assert!((parse_config.context_low_threshold - 35.0).abs() < 1e-9);
    Ok(())
}

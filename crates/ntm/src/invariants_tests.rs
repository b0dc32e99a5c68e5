// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{check_invariants, CheckStatus};

#[test]
fn missing_state_dir_is_not_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state_dir = dir.path().join(".ntm");

    let report = check_invariants(&state_dir);
    assert_eq!(report.checks.len(), 6);
    assert_eq!(report.errors, 0);
    // The guard marker is the only thing a fresh checkout lacks outright.
    assert_eq!(report.warnings, 1);
    assert!(!report.all_passed);
    assert!(report
        .checks
        .iter()
        .filter(|c| c.name != "safe_by_default")
        .all(|c| c.status == CheckStatus::Ok));
    Ok(())
}

#[test]
fn fully_provisioned_state_passes() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state_dir = dir.path().join(".ntm");
    std::fs::create_dir_all(state_dir.join("logs"))?;
    std::fs::write(state_dir.join("logs").join("events.jsonl"), "{}\n")?;
    std::fs::write(state_dir.join("logs").join("blocked.jsonl"), "")?;
    std::fs::write(state_dir.join("policy.yaml"), "version: 1\n")?;
    std::fs::write(state_dir.join("state.db"), b"\x00")?;
    std::fs::write(state_dir.join("guard-installed"), "")?;

    let report = check_invariants(&state_dir);
    assert!(report.all_passed, "report: {report:?}");
    assert_eq!(report.passed, 6);
    Ok(())
}

#[test]
fn empty_policy_is_a_warning() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state_dir = dir.path().join(".ntm");
    std::fs::create_dir_all(&state_dir)?;
    std::fs::write(state_dir.join("policy.yaml"), "")?;

    let report = check_invariants(&state_dir);
    let policy_check = report.checks.iter().find(|c| c.name == "graceful_degradation");
    assert!(policy_check.is_some_and(|c| c.status == CheckStatus::Warning));
    Ok(())
}

#[test]
fn misplaced_artifact_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state_dir = dir.path().join(".ntm");
    // A directory where the event log file should be.
    std::fs::create_dir_all(state_dir.join("logs").join("events.jsonl"))?;

    let report = check_invariants(&state_dir);
    let check = report.checks.iter().find(|c| c.name == "no_silent_data_loss");
    assert!(check.is_some_and(|c| c.status == CheckStatus::Error));
    assert!(!report.all_passed);
    Ok(())
}

#[test]
fn counts_add_up() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let report = check_invariants(&dir.path().join(".ntm"));
    assert_eq!(report.passed + report.warnings + report.errors, report.checks.len());
    Ok(())
}

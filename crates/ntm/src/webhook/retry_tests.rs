// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::backoff_delay;

#[yare::parameterized(
    first = { 1, 10, 10 },
    second = { 2, 10, 20 },
    third = { 3, 10, 40 },
    fourth = { 4, 10, 80 },
    capped = { 9, 10, 1000 },
    deep_attempt_stays_capped = { 40, 10, 1000 },
)]
fn backoff_doubles_and_caps(attempt: u32, base_ms: u64, expected_ms: u64) {
    let delay = backoff_delay(
        attempt,
        Duration::from_millis(base_ms),
        Duration::from_secs(1),
    );
    assert_eq!(delay, Duration::from_millis(expected_ms));
}

#[test]
fn zero_attempt_behaves_like_first() {
    // The scheduler always increments before scheduling, but a zero
    // attempt must not underflow.
    let delay = backoff_delay(0, Duration::from_millis(10), Duration::from_secs(1));
    assert_eq!(delay, Duration::from_millis(10));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry scheduling for failed deliveries.
//!
//! Retry-eligible deliveries sit in a plain list guarded by an async
//! mutex; a [`Notify`] stands in for the condition variable. One
//! processor loop partitions the list into ready and not-ready, redrives
//! the ready items inline, and sleeps until the earliest due time
//! (bounded to [5 ms, 1 s]) or the next wakeup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify};
use tracing::debug;

use super::{Delivery, Shared};

const MIN_SLEEP: Duration = Duration::from_millis(5);
const MAX_SLEEP: Duration = Duration::from_secs(1);

/// Exponential backoff: `min(base · 2^(attempt−1), max)` for the given
/// just-failed attempt number (1-based).
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    base.saturating_mul(1u32 << exponent).min(max)
}

/// Condvar-guarded list of deliveries awaiting their next attempt.
#[derive(Default)]
pub(crate) struct RetryQueue {
    entries: Mutex<Vec<Delivery>>,
    notify: Notify,
}

impl RetryQueue {
    pub(crate) async fn push(&self, delivery: Delivery) {
        self.entries.lock().await.push(delivery);
        self.notify.notify_one();
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Wake the processor (shutdown or new work).
    pub(crate) fn wake(&self) {
        self.notify.notify_waiters();
    }
}

/// The retry processor loop. Exits promptly on shutdown.
pub(crate) async fn retry_loop(shared: Arc<Shared>) {
    loop {
        if shared.cancel.is_cancelled() {
            break;
        }

        let now = Instant::now();
        let (ready, next_due) = {
            let mut entries = shared.retry.entries.lock().await;
            let mut ready = Vec::new();
            let mut i = 0;
            while i < entries.len() {
                let due = entries[i].next_retry.map_or(true, |at| at <= now);
                if due {
                    ready.push(entries.swap_remove(i));
                } else {
                    i += 1;
                }
            }
            let next_due = entries.iter().filter_map(|d| d.next_retry).min();
            (ready, next_due)
        };

        for delivery in ready {
            debug!(delivery = %delivery.id, attempt = delivery.attempt, "redriving delivery");
            shared.process_delivery(delivery).await;
        }

        match next_due {
            None => {
                tokio::select! {
                    _ = shared.cancel.cancelled() => break,
                    _ = shared.retry.notify.notified() => {}
                }
            }
            Some(due) => {
                let wait = due
                    .saturating_duration_since(Instant::now())
                    .clamp(MIN_SLEEP, MAX_SLEEP);
                tokio::select! {
                    _ = shared.cancel.cancelled() => break,
                    _ = shared.retry.notify.notified() => {}
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::event::{event_type, Event};

use super::{Delivery, ManagerConfig, RetryPolicy, WebhookConfig, WebhookManager};

fn manager() -> anyhow::Result<WebhookManager> {
    WebhookManager::new(ManagerConfig::default())
}

#[test]
fn register_requires_url() -> anyhow::Result<()> {
    let manager = manager()?;
    assert!(manager.register(WebhookConfig::default()).is_err());
    assert!(manager.register(WebhookConfig::new("not a url")).is_err());
    Ok(())
}

#[test]
fn register_fills_defaults() -> anyhow::Result<()> {
    let manager = manager()?;
    let id = manager.register(WebhookConfig::new("http://127.0.0.1:1/hook"))?;
    assert!(!id.is_empty());

    let endpoints = manager.shared.endpoints.read().unwrap_or_else(std::sync::PoisonError::into_inner);
    let config = endpoints.get(&id).cloned();
    drop(endpoints);
    let config = config.ok_or_else(|| anyhow::anyhow!("endpoint not registered"))?;
    assert_eq!(config.method, "POST");
    assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.base_delay, Duration::from_secs(1));
    Ok(())
}

#[test]
fn register_keeps_caller_retry_settings() -> anyhow::Result<()> {
    let manager = manager()?;
    let mut config = WebhookConfig::new("http://127.0.0.1:1/hook");
    config.id = "wh-1".into();
    config.retry = RetryPolicy {
        enabled: true,
        max_retries: 7,
        base_delay: Duration::from_millis(50),
        max_delay: Duration::from_secs(5),
    };
    let id = manager.register(config)?;
    assert_eq!(id, "wh-1");

    let endpoints = manager.shared.endpoints.read().unwrap_or_else(std::sync::PoisonError::into_inner);
    let config = endpoints.get("wh-1").cloned();
    drop(endpoints);
    assert!(config.is_some_and(|c| c.retry.max_retries == 7));
    Ok(())
}

#[test]
fn unregister_unknown_errors() -> anyhow::Result<()> {
    let manager = manager()?;
    assert!(manager.unregister("nope").is_err());

    let id = manager.register(WebhookConfig::new("http://127.0.0.1:1/hook"))?;
    manager.unregister(&id)?;
    assert!(manager.unregister(&id).is_err());
    Ok(())
}

#[yare::parameterized(
    empty_subscribes_all = { &[], "task_assigned", true },
    star_subscribes_all = { &["*"], "agent_error", true },
    exact_match = { &["task_assigned"], "task_assigned", true },
    mismatch = { &["task_assigned"], "agent_error", false },
    star_among_others = { &["agent_error", "*"], "task_assigned", true },
)]
fn subscription_filter(events: &[&str], event_type: &str, expected: bool) {
    let mut config = WebhookConfig::new("http://127.0.0.1:1/hook");
    config.events = events.iter().map(|s| (*s).to_owned()).collect();
    assert_eq!(config.subscribes(event_type), expected);
}

#[test]
fn dispatch_before_start_is_an_error() -> anyhow::Result<()> {
    let manager = manager()?;
    let result = manager.dispatch(Event::new(event_type::TASK_ASSIGNED, "x"));
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn double_start_is_an_error() -> anyhow::Result<()> {
    let manager = manager()?;
    manager.start()?;
    assert!(manager.start().is_err());
    manager.stop().await;
    Ok(())
}

#[tokio::test]
async fn stop_is_idempotent() -> anyhow::Result<()> {
    let manager = manager()?;
    manager.start()?;
    manager.stop().await;
    manager.stop().await;
    assert!(manager.start().is_err());
    Ok(())
}

#[test]
fn zero_config_normalizes_to_defaults() -> anyhow::Result<()> {
    let manager = WebhookManager::new(ManagerConfig {
        queue_size: 0,
        workers: 0,
        dead_letter_limit: 0,
        default_timeout: Duration::ZERO,
        drain_timeout: Duration::ZERO,
        retry_defaults: RetryPolicy::default(),
    })?;
    assert_eq!(manager.shared.config.queue_size, 1000);
    assert_eq!(manager.shared.config.workers, 10);
    assert_eq!(manager.shared.config.dead_letter_limit, 100);
    Ok(())
}

#[test]
fn dead_letter_queue_evicts_oldest() -> anyhow::Result<()> {
    let manager = WebhookManager::new(ManagerConfig {
        dead_letter_limit: 3,
        ..ManagerConfig::default()
    })?;
    let endpoint = std::sync::Arc::new(WebhookConfig::new("http://127.0.0.1:1/hook"));

    for i in 0..5 {
        let mut delivery =
            Delivery::new(Event::new(event_type::AGENT_ERROR, format!("m{i}")), endpoint.clone());
        delivery.id = format!("d{i}");
        manager.shared.fail_permanently(delivery, "boom".to_owned());
    }

    let letters = manager.dead_letters();
    assert_eq!(letters.len(), 3);
    assert_eq!(letters[0].delivery_id, "d2");
    assert_eq!(letters[2].delivery_id, "d4");

    assert_eq!(manager.clear_dead_letters(), 3);
    assert!(manager.dead_letters().is_empty());
    Ok(())
}

#[tokio::test]
async fn stats_reflect_registrations() -> anyhow::Result<()> {
    let manager = manager()?;
    manager.register(WebhookConfig::new("http://127.0.0.1:1/a"))?;
    manager.register(WebhookConfig::new("http://127.0.0.1:1/b"))?;

    let stats = manager.stats().await;
    assert_eq!(stats.webhooks, 2);
    assert_eq!(stats.queue_capacity, 1000);
    assert_eq!(stats.queue_len, 0);
    assert_eq!(stats.successes, 0);
    Ok(())
}

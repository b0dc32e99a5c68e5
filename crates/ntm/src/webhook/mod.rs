// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asynchronous webhook fan-out.
//!
//! Events enter through [`WebhookManager::dispatch`], which never blocks:
//! matching endpoints each get a delivery try-sent into a bounded queue,
//! and a full queue drops with a counter bump. A worker pool drains the
//! queue; failures route through the retry scheduler or the dead-letter
//! queue depending on their class. FIFO per endpoint is not guaranteed.

pub mod retry;
pub mod sign;
pub mod template;

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::event::Event;

/// Retry policy for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// One registered endpoint.
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    /// Auto-generated when left empty.
    pub id: String,
    /// Required.
    pub url: String,
    /// Defaults to POST.
    pub method: String,
    /// Payload template; empty means JSON-serialize the event.
    pub template: Option<String>,
    /// HMAC-SHA256 signing secret.
    pub secret: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Subscribed event types. Empty or `*` subscribes to everything.
    pub events: Vec<String>,
    /// Falls back to the manager default when unset.
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), retry: RetryPolicy::default(), ..Self::default() }
    }

    /// Does this endpoint subscribe to `event_type`?
    pub fn subscribes(&self, event_type: &str) -> bool {
        self.events.is_empty() || self.events.iter().any(|e| e == "*" || e == event_type)
    }
}

/// Manager-wide settings. Zero values normalize to the defaults.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub queue_size: usize,
    pub workers: usize,
    pub dead_letter_limit: usize,
    pub default_timeout: Duration,
    pub drain_timeout: Duration,
    pub retry_defaults: RetryPolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            queue_size: 1000,
            workers: 10,
            dead_letter_limit: 100,
            default_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(10),
            retry_defaults: RetryPolicy::default(),
        }
    }
}

impl ManagerConfig {
    fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.queue_size == 0 {
            self.queue_size = defaults.queue_size;
        }
        if self.workers == 0 {
            self.workers = defaults.workers;
        }
        if self.dead_letter_limit == 0 {
            self.dead_letter_limit = defaults.dead_letter_limit;
        }
        if self.default_timeout.is_zero() {
            self.default_timeout = defaults.default_timeout;
        }
        if self.drain_timeout.is_zero() {
            self.drain_timeout = defaults.drain_timeout;
        }
        self
    }
}

/// Record of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A queued or in-flight delivery of one event to one endpoint.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: String,
    pub event: Event,
    pub endpoint: Arc<WebhookConfig>,
    pub attempt: u32,
    pub next_retry: Option<Instant>,
    pub last_error: Option<String>,
    pub attempts: Vec<AttemptRecord>,
}

impl Delivery {
    fn new(event: Event, endpoint: Arc<WebhookConfig>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event,
            endpoint,
            attempt: 0,
            next_retry: None,
            last_error: None,
            attempts: vec![],
        }
    }
}

/// A delivery that exhausted its options, archived for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub delivery_id: String,
    pub webhook_id: String,
    pub event: Event,
    pub failed_at: DateTime<Utc>,
    pub last_error: String,
    pub attempts: Vec<AttemptRecord>,
}

/// Operator-facing counters and gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WebhookStats {
    pub queue_len: usize,
    pub queue_capacity: usize,
    pub retry_len: usize,
    pub dead_letters: usize,
    pub successes: u64,
    pub failures: u64,
    pub dropped_events: u64,
    pub webhooks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Fresh,
    Started,
    Stopped,
}

/// State shared with worker and retry tasks.
pub(crate) struct Shared {
    config: ManagerConfig,
    endpoints: RwLock<IndexMap<String, Arc<WebhookConfig>>>,
    retry: retry::RetryQueue,
    dead: Mutex<VecDeque<DeadLetter>>,
    successes: AtomicU64,
    failures: AtomicU64,
    dropped: AtomicU64,
    cancel: CancellationToken,
    client: reqwest::Client,
}

/// Lifecycle-managed webhook dispatcher.
pub struct WebhookManager {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
    queue_tx: Mutex<Option<mpsc::Sender<Delivery>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WebhookManager {
    /// Build a manager. Zero-valued settings normalize to defaults.
    pub fn new(config: ManagerConfig) -> anyhow::Result<Self> {
        // reqwest is built without a default TLS provider; install the
        // ring provider so https endpoints work. Repeat calls are no-ops.
        let _ = rustls::crypto::ring::default_provider().install_default();
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config: config.normalized(),
                endpoints: RwLock::new(IndexMap::new()),
                retry: retry::RetryQueue::default(),
                dead: Mutex::new(VecDeque::new()),
                successes: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                client,
            }),
            lifecycle: Mutex::new(Lifecycle::Fresh),
            queue_tx: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Register an endpoint, filling defaults. Returns the endpoint id.
    pub fn register(&self, mut config: WebhookConfig) -> anyhow::Result<String> {
        anyhow::ensure!(!config.url.trim().is_empty(), "webhook url is required");
        reqwest::Url::parse(&config.url)
            .map_err(|e| anyhow::anyhow!("invalid webhook url {:?}: {e}", config.url))?;

        if config.id.is_empty() {
            config.id = Uuid::new_v4().to_string();
        }
        if config.method.is_empty() {
            config.method = "POST".to_owned();
        }
        if config.timeout.is_none() {
            config.timeout = Some(self.shared.config.default_timeout);
        }
        if config.retry.enabled {
            let defaults = self.shared.config.retry_defaults;
            if config.retry.max_retries == 0 {
                config.retry.max_retries = defaults.max_retries;
            }
            if config.retry.base_delay.is_zero() {
                config.retry.base_delay = defaults.base_delay;
            }
            if config.retry.max_delay.is_zero() {
                config.retry.max_delay = defaults.max_delay;
            }
        }

        let id = config.id.clone();
        let previous = self
            .shared
            .endpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::new(config));
        if previous.is_some() {
            debug!(webhook = %id, "replaced existing webhook registration");
        }
        Ok(id)
    }

    /// Remove an endpoint. Errors when the id is unknown.
    pub fn unregister(&self, id: &str) -> anyhow::Result<()> {
        let removed = self
            .shared
            .endpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(id);
        anyhow::ensure!(removed.is_some(), "unknown webhook: {id}");
        Ok(())
    }

    /// Start the worker pool and retry scheduler.
    ///
    /// Must run inside a tokio runtime. Errors when already started or
    /// stopped.
    pub fn start(&self) -> anyhow::Result<()> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        match *lifecycle {
            Lifecycle::Started => anyhow::bail!("webhook manager already started"),
            Lifecycle::Stopped => anyhow::bail!("webhook manager already stopped"),
            Lifecycle::Fresh => {}
        }

        let (tx, rx) = mpsc::channel(self.shared.config.queue_size);
        *self.queue_tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);

        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..self.shared.config.workers {
            handles.push(tokio::spawn(worker_loop(Arc::clone(&self.shared), Arc::clone(&rx))));
        }
        handles.push(tokio::spawn(retry::retry_loop(Arc::clone(&self.shared))));

        *lifecycle = Lifecycle::Started;
        debug!(workers = self.shared.config.workers, "webhook manager started");
        Ok(())
    }

    /// Fan `event` out to every subscribed endpoint.
    ///
    /// Never blocks: deliveries are try-sent into the bounded queue and
    /// dropped (with a counter bump) when it is full. Errors only when
    /// the manager is not started.
    pub fn dispatch(&self, mut event: Event) -> anyhow::Result<()> {
        {
            let lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            anyhow::ensure!(*lifecycle == Lifecycle::Started, "webhook manager not started");
        }

        if event.id.is_empty() {
            event.id = Uuid::new_v4().to_string();
        }
        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now());
        }

        // Snapshot under the read lock, release before enqueueing.
        let targets: Vec<Arc<WebhookConfig>> = {
            let endpoints = self.shared.endpoints.read().unwrap_or_else(PoisonError::into_inner);
            endpoints
                .values()
                .filter(|c| c.subscribes(&event.event_type))
                .map(Arc::clone)
                .collect()
        };
        if targets.is_empty() {
            return Ok(());
        }

        let tx = {
            let guard = self.queue_tx.lock().unwrap_or_else(PoisonError::into_inner);
            guard.clone()
        };
        let Some(tx) = tx else {
            anyhow::bail!("webhook manager not started");
        };

        for endpoint in targets {
            let delivery = Delivery::new(event.clone(), endpoint);
            match tx.try_send(delivery) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(d)) => {
                    self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        webhook = %d.endpoint.id,
                        event = %d.event.event_type,
                        "delivery queue full, dropping event"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(d)) => {
                    warn!(webhook = %d.endpoint.id, "delivery queue closed, dropping event");
                }
            }
        }
        Ok(())
    }

    /// Defensive copy of the dead-letter queue.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.shared
            .dead
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Empty the dead-letter queue, returning how many were removed.
    pub fn clear_dead_letters(&self) -> usize {
        let mut dead = self.shared.dead.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = dead.len();
        dead.clear();
        removed
    }

    /// Snapshot of queue gauges and counters.
    pub async fn stats(&self) -> WebhookStats {
        let (queue_len, queue_capacity) = {
            let guard = self.queue_tx.lock().unwrap_or_else(PoisonError::into_inner);
            match guard.as_ref() {
                Some(tx) => (tx.max_capacity() - tx.capacity(), tx.max_capacity()),
                None => (0, self.shared.config.queue_size),
            }
        };
        let dead_letters =
            self.shared.dead.lock().unwrap_or_else(PoisonError::into_inner).len();
        let webhooks =
            self.shared.endpoints.read().unwrap_or_else(PoisonError::into_inner).len();

        WebhookStats {
            queue_len,
            queue_capacity,
            retry_len: self.shared.retry.len().await,
            dead_letters,
            successes: self.shared.successes.load(Ordering::Relaxed),
            failures: self.shared.failures.load(Ordering::Relaxed),
            dropped_events: self.shared.dropped.load(Ordering::Relaxed),
            webhooks,
        }
    }

    /// Stop accepting work, drain in-flight deliveries for up to the
    /// drain timeout, then abandon whatever remains. Idempotent.
    pub async fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            if *lifecycle == Lifecycle::Stopped {
                return;
            }
            *lifecycle = Lifecycle::Stopped;
        }

        // Closing the channel lets workers drain what is already queued;
        // the cancel token stops the retry scheduler promptly.
        let tx = self.queue_tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        drop(tx);
        self.shared.cancel.cancel();
        self.shared.retry.wake();

        let handles: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
        if handles.is_empty() {
            return;
        }
        let drained = futures_util::future::join_all(handles);
        if tokio::time::timeout(self.shared.config.drain_timeout, drained).await.is_err() {
            warn!("webhook shutdown drain timed out, abandoning in-flight deliveries");
        }
        debug!("webhook manager stopped");
    }
}

async fn worker_loop(
    shared: Arc<Shared>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Delivery>>>,
) {
    loop {
        let delivery = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };
        match delivery {
            Some(d) => shared.process_delivery(d).await,
            None => break,
        }
    }
}

impl Shared {
    /// Attempt one delivery and classify the outcome.
    pub(crate) async fn process_delivery(&self, mut delivery: Delivery) {
        delivery.attempt += 1;
        let attempt = delivery.attempt;

        let payload = match template::render_payload(
            delivery.endpoint.template.as_deref(),
            &delivery.event,
        ) {
            Ok(p) => p,
            Err(e) => {
                // Template failures can never succeed on retry.
                delivery.attempts.push(AttemptRecord {
                    attempt,
                    timestamp: Utc::now(),
                    status: None,
                    error: Some(format!("{e:#}")),
                    duration_ms: 0,
                });
                self.fail_permanently(delivery, format!("{e:#}"));
                return;
            }
        };

        let endpoint = Arc::clone(&delivery.endpoint);
        let timeout = endpoint.timeout.unwrap_or(self.config.default_timeout);
        let method = reqwest::Method::from_bytes(endpoint.method.as_bytes())
            .unwrap_or(reqwest::Method::POST);

        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(reqwest::header::USER_AGENT, HeaderValue::from_static("NTM-Webhook/1.0"));
        insert_header(&mut headers, "X-NTM-Delivery-ID", &delivery.id);
        insert_header(&mut headers, "X-NTM-Event-Type", &delivery.event.event_type);
        insert_header(&mut headers, "X-NTM-Attempt", &attempt.to_string());
        for (name, value) in &endpoint.headers {
            insert_header(&mut headers, name, value);
        }
        if let Some(secret) = &endpoint.secret {
            insert_header(
                &mut headers,
                "X-NTM-Signature",
                &sign::signature_header(secret, payload.as_bytes()),
            );
        }

        let started = Instant::now();
        let result = self
            .client
            .request(method, &endpoint.url)
            .timeout(timeout)
            .headers(headers)
            .body(payload)
            .send()
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let status = response.status();
                let body = read_capped(response, 4096).await;
                delivery.attempts.push(AttemptRecord {
                    attempt,
                    timestamp: Utc::now(),
                    status: Some(status.as_u16()),
                    error: (!status.is_success()).then(|| format!("HTTP {status}")),
                    duration_ms,
                });

                if status.is_success() {
                    self.successes.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        delivery = %delivery.id,
                        webhook = %endpoint.id,
                        attempt,
                        %status,
                        "delivered"
                    );
                } else if status.as_u16() == 429 || status.is_server_error() {
                    self.maybe_retry(delivery, format!("HTTP {status}: {body}")).await;
                } else {
                    // Remaining 4xx (and stray 3xx) are permanent.
                    self.fail_permanently(delivery, format!("HTTP {status}: {body}"));
                }
            }
            Err(e) => {
                delivery.attempts.push(AttemptRecord {
                    attempt,
                    timestamp: Utc::now(),
                    status: None,
                    error: Some(e.to_string()),
                    duration_ms,
                });
                self.maybe_retry(delivery, e.to_string()).await;
            }
        }
    }

    async fn maybe_retry(&self, mut delivery: Delivery, error: String) {
        let policy = delivery.endpoint.retry;
        if policy.enabled && delivery.attempt < policy.max_retries {
            let delay = retry::backoff_delay(delivery.attempt, policy.base_delay, policy.max_delay);
            delivery.next_retry = Some(Instant::now() + delay);
            delivery.last_error = Some(error);
            debug!(
                delivery = %delivery.id,
                attempt = delivery.attempt,
                delay_ms = delay.as_millis() as u64,
                "scheduling retry"
            );
            self.retry.push(delivery).await;
        } else {
            self.fail_permanently(delivery, error);
        }
    }

    fn fail_permanently(&self, delivery: Delivery, error: String) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        warn!(
            delivery = %delivery.id,
            webhook = %delivery.endpoint.id,
            attempts = delivery.attempt,
            error = %error,
            "delivery dead-lettered"
        );
        let mut dead = self.dead.lock().unwrap_or_else(PoisonError::into_inner);
        while dead.len() >= self.config.dead_letter_limit {
            dead.pop_front();
        }
        dead.push_back(DeadLetter {
            delivery_id: delivery.id,
            webhook_id: delivery.endpoint.id.clone(),
            event: delivery.event,
            failed_at: Utc::now(),
            last_error: error,
            attempts: delivery.attempts,
        });
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => warn!(header = name, "skipping invalid header"),
    }
}

/// Read at most `cap` bytes of the response body.
async fn read_capped(mut response: reqwest::Response, cap: usize) -> String {
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < cap {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = (cap - buf.len()).min(chunk.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

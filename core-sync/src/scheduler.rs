//! Background drain loop.
//!
//! The scheduler owns the only code path that moves submissions over the
//! network. It wakes on connectivity recovery, periodic ticks, an explicit
//! `force_sync` and post-submit `wake` calls, then drains eligible items in
//! FIFO order through a semaphore-bounded worker pool. Claiming happens in
//! the dispatch loop so admission order is preserved; only the delivery
//! itself runs concurrently.

use futures::future::join_all;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bridge_traits::{
    AttachmentPart, ConnectivityMonitor, ConnectivityStatus, HttpMethod, Transport,
    TransportFailure, TransportRequest,
};
use core_cache::CacheLayer;
use core_queue::{
    classify_status, FailureInfo, FailureKind, RetryPolicy, SubmissionItem, SubmissionQueue,
};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};

use crate::breaker::CircuitBreaker;

/// Tunables for the sync scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum concurrent delivery workers
    pub worker_concurrency: usize,
    /// Periodic drain interval (also runs the completed-retention sweep)
    pub tick_interval: Duration,
    /// Per-attempt transport timeout
    pub request_timeout: Duration,
    /// Endpoint submissions are POSTed to
    pub submission_path: String,
    /// Listing endpoint whose cached collections a delivery invalidates
    pub listing_endpoint: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: 3,
            tick_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(15),
            submission_path: "/v1/reports".to_string(),
            listing_endpoint: "/v1/reports".to_string(),
        }
    }
}

struct SchedulerInner {
    queue: Arc<SubmissionQueue>,
    transport: Arc<dyn Transport>,
    breaker: Arc<CircuitBreaker>,
    cache: Option<Arc<CacheLayer>>,
    connectivity: Option<Arc<dyn ConnectivityMonitor>>,
    events: EventBus,
    config: SchedulerConfig,
    retry_policy: RetryPolicy,
    wake: Notify,
    pending_trigger: Mutex<Option<&'static str>>,
}

/// Network-aware queue drainer.
///
/// Constructed via [`SyncScheduler::start`], which spawns the background
/// loop; [`shutdown`](SyncScheduler::shutdown) cancels it.
pub struct SyncScheduler {
    inner: Arc<SchedulerInner>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
    // Keeps the fallback watch channel open when no monitor is injected
    _always_online: Option<watch::Sender<ConnectivityStatus>>,
}

impl SyncScheduler {
    /// Spawns the scheduler loop.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        queue: Arc<SubmissionQueue>,
        transport: Arc<dyn Transport>,
        breaker: Arc<CircuitBreaker>,
        cache: Option<Arc<CacheLayer>>,
        connectivity: Option<Arc<dyn ConnectivityMonitor>>,
        events: EventBus,
        config: SchedulerConfig,
    ) -> Self {
        // Single connectivity subscription for the whole scheduler lifetime.
        // Without a monitor the loop listens to a channel that never changes.
        let (conn_rx, always_online) = match &connectivity {
            Some(monitor) => (monitor.subscribe(), None),
            None => {
                let (tx, rx) = watch::channel(ConnectivityStatus::Online);
                (rx, Some(tx))
            }
        };

        let inner = Arc::new(SchedulerInner {
            queue,
            transport,
            breaker,
            cache,
            connectivity,
            events,
            config,
            retry_policy: RetryPolicy::default(),
            wake: Notify::new(),
            pending_trigger: Mutex::new(None),
        });

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(inner.clone(), cancel.clone(), conn_rx));

        Self {
            inner,
            cancel,
            handle: Mutex::new(Some(handle)),
            _always_online: always_online,
        }
    }

    /// Requests an immediate drain pass.
    pub fn force_sync(&self) {
        self.trigger("force");
    }

    /// Nudges the scheduler after a successful submit.
    pub fn wake(&self) {
        self.trigger("submit");
    }

    fn trigger(&self, trigger: &'static str) {
        *self.inner.pending_trigger.lock().unwrap() = Some(trigger);
        self.inner.wake.notify_one();
    }

    /// Runs one drain pass inline, bypassing the background loop.
    ///
    /// Used by tests and by callers that need to await drain completion.
    pub async fn drain_now(&self) {
        drain(&self.inner, "force").await;
    }

    /// Cancels the background loop and waits for it to stop.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run(
    inner: Arc<SchedulerInner>,
    cancel: CancellationToken,
    mut conn_rx: watch::Receiver<ConnectivityStatus>,
) {
    let mut tick = tokio::time::interval(inner.config.tick_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut conn_alive = true;

    info!("Sync scheduler started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = inner.wake.notified() => {
                let trigger = inner
                    .pending_trigger
                    .lock()
                    .unwrap()
                    .take()
                    .unwrap_or("submit");
                drain(&inner, trigger).await;
            }

            _ = tick.tick() => {
                if let Err(e) = inner.queue.purge_expired_completed().await {
                    warn!(error = %e, "Completed-retention sweep failed");
                }
                drain(&inner, "tick").await;
            }

            changed = conn_rx.changed(), if conn_alive => {
                match changed {
                    Ok(()) => {
                        let online = conn_rx.borrow_and_update().is_online();
                        if online {
                            drain(&inner, "online").await;
                        } else {
                            debug!("Connectivity lost, drains suspended");
                        }
                    }
                    Err(_) => conn_alive = false,
                }
            }
        }
    }

    info!("Sync scheduler stopped");
}

async fn drain(inner: &Arc<SchedulerInner>, trigger: &str) {
    if let Some(connectivity) = &inner.connectivity {
        if !connectivity.is_online().await {
            debug!(trigger, "Offline, skipping drain");
            return;
        }
    }

    let _ = inner.events.emit(CoreEvent::Sync(SyncEvent::DrainStarted {
        trigger: trigger.to_string(),
    }));

    let semaphore = Arc::new(Semaphore::new(inner.config.worker_concurrency));
    let mut handles = Vec::new();

    loop {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };

        if let Err(open) = inner.breaker.try_acquire() {
            debug!(until_ms = open.until_ms, "Breaker open, drain halted");
            break;
        }

        match inner.queue.claim_next_eligible().await {
            Ok(Some(item)) => {
                let worker_inner = inner.clone();
                handles.push(tokio::spawn(async move {
                    let succeeded = deliver(&worker_inner, item).await;
                    drop(permit);
                    succeeded
                }));
            }
            Ok(None) => {
                inner.breaker.release();
                break;
            }
            Err(e) => {
                inner.breaker.release();
                warn!(error = %e, "Failed to claim next submission");
                break;
            }
        }
    }

    let outcomes = join_all(handles).await;
    let processed = outcomes.len() as u64;
    let succeeded = outcomes
        .iter()
        .filter(|r| matches!(r, Ok(true)))
        .count() as u64;
    let failed = processed - succeeded;

    if processed > 0 {
        info!(trigger, processed, succeeded, failed, "Drain pass finished");
    }
    let _ = inner.events.emit(CoreEvent::Sync(SyncEvent::DrainFinished {
        processed,
        succeeded,
        failed,
    }));
}

/// Runs one delivery attempt for a claimed item. Returns whether it succeeded.
async fn deliver(inner: &Arc<SchedulerInner>, item: SubmissionItem) -> bool {
    let request = TransportRequest::new(HttpMethod::Post, &inner.config.submission_path)
        .json(item.payload.clone())
        .attachments(item.attachments.iter().map(to_part).collect())
        .timeout(inner.config.request_timeout);

    // The outer timeout is authoritative even if the transport ignores the
    // per-request one.
    let outcome = tokio::time::timeout(
        inner.config.request_timeout,
        inner.transport.send(request),
    )
    .await;

    let (kind, reason) = match outcome {
        Ok(Ok(response)) if response.is_success() => {
            inner.breaker.record_success();
            if let Err(e) = inner.queue.mark_completed(item.id).await {
                // The remote accepted the report but the ledger write failed:
                // the item stays Uploading and the next open() reloads it as
                // Queued, so it is redelivered. At-least-once delivery; the
                // remote service deduplicates.
                warn!(submission_id = %item.id, error = %e, "Failed to record delivery");
                return false;
            }
            if let Some(cache) = &inner.cache {
                let endpoint = inner.config.listing_endpoint.clone();
                if let Err(e) = cache.invalidate(|key| key.endpoint == endpoint).await {
                    warn!(error = %e, "Cache invalidation after delivery failed");
                }
            }
            return true;
        }
        Ok(Ok(response)) => {
            let reason = response
                .error_reason()
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            (classify_status(response.status), reason)
        }
        Ok(Err(TransportFailure::Unreachable(message))) => (FailureKind::Network, message),
        Ok(Err(TransportFailure::TimedOut)) | Err(_) => {
            (FailureKind::Timeout, "request timed out".to_string())
        }
    };

    inner.breaker.record_failure();
    let decision = inner.retry_policy.next_decision(kind, item.attempt_count);
    if let Err(e) = inner
        .queue
        .mark_failed(item.id, FailureInfo::new(kind, reason), decision)
        .await
    {
        warn!(submission_id = %item.id, error = %e, "Failed to record delivery failure");
    }
    false
}

fn to_part(attachment: &core_queue::Attachment) -> AttachmentPart {
    AttachmentPart {
        uri: attachment.uri.clone(),
        mime_type: attachment.mime_type.clone(),
        name: attachment.name.clone(),
        size_bytes: attachment.size_bytes,
    }
}

//! The engine facade.
//!
//! [`ReportEngine`] wires the queue, breaker, cache, scheduler and collection
//! service into a single constructible instance. Hosts build one per storage
//! namespace; tests build as many isolated engines as they like over
//! [`bridge_traits::MemoryKeyValueStore`].

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use core_cache::{CacheConfig, CacheLayer, QueryKey};
use core_collections::{
    CollectionConfig, CollectionService, CollectionState, FetchOptions,
};
use core_queue::{
    Attachment, QueueConfig, QueueCounters, SubmissionId, SubmissionItem, SubmissionLedger,
    SubmissionQueue, SubmissionStatus,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream};
use core_sync::{BreakerConfig, CircuitBreaker, CircuitBreakerState, SchedulerConfig, SyncScheduler};

use crate::error::Result;

const EVENT_BUS_CAPACITY: usize = 256;

/// Fully composed engine configuration.
///
/// [`EngineConfig::from`] derives every component config from the shared
/// [`EngineTuning`](core_runtime::config::EngineTuning) knobs; individual
/// sections can then be adjusted before [`ReportEngine::init`].
#[derive(Clone)]
pub struct EngineConfig {
    pub core: CoreConfig,
    pub queue: QueueConfig,
    pub scheduler: SchedulerConfig,
    pub breaker: BreakerConfig,
    pub cache: CacheConfig,
    pub collections: CollectionConfig,
}

impl From<CoreConfig> for EngineConfig {
    fn from(core: CoreConfig) -> Self {
        let tuning = core.tuning;
        Self {
            queue: QueueConfig {
                completed_retention: tuning.completed_retention,
                ..QueueConfig::default()
            },
            scheduler: SchedulerConfig {
                worker_concurrency: tuning.worker_concurrency,
                tick_interval: tuning.drain_interval,
                request_timeout: tuning.request_timeout,
                ..SchedulerConfig::default()
            },
            breaker: BreakerConfig {
                failure_threshold: tuning.breaker_failure_threshold,
                cooldown: tuning.breaker_cooldown,
            },
            cache: CacheConfig {
                default_ttl: tuning.cache_ttl,
                capacity: tuning.cache_capacity,
            },
            collections: CollectionConfig {
                debounce: tuning.refresh_debounce,
                fetch_timeout: tuning.request_timeout,
            },
            core,
        }
    }
}

/// Resilient submission and synchronization engine.
///
/// All operations are non-blocking from the caller's perspective: `submit`
/// persists and returns, delivery happens on the background scheduler, and
/// progress is observable via [`subscribe`](Self::subscribe).
pub struct ReportEngine {
    queue: Arc<SubmissionQueue>,
    scheduler: SyncScheduler,
    breaker: Arc<CircuitBreaker>,
    cache: Arc<CacheLayer>,
    collections: CollectionService,
    events: EventBus,
}

impl ReportEngine {
    /// Builds the engine and spawns its background scheduler.
    ///
    /// Reloads any persisted submissions from the store; interrupted uploads
    /// come back as queued and are picked up by the startup drain pass.
    pub async fn init(config: EngineConfig) -> Result<Self> {
        let EngineConfig {
            core,
            queue: queue_config,
            scheduler: scheduler_config,
            breaker: breaker_config,
            cache: cache_config,
            collections: collection_config,
        } = config;
        core.validate()?;

        let events = EventBus::new(EVENT_BUS_CAPACITY);

        let ledger = SubmissionLedger::new(core.store.clone());
        let queue = Arc::new(
            SubmissionQueue::open(ledger, core.clock.clone(), events.clone(), queue_config)
                .await?,
        );

        let breaker = Arc::new(CircuitBreaker::new(
            breaker_config,
            core.clock.clone(),
            events.clone(),
        ));

        let cache = Arc::new(CacheLayer::new(
            core.store.clone(),
            core.clock.clone(),
            cache_config,
        ));

        let scheduler = SyncScheduler::start(
            queue.clone(),
            core.transport.clone(),
            breaker.clone(),
            Some(cache.clone()),
            core.connectivity.clone(),
            events.clone(),
            scheduler_config,
        );

        let collections = CollectionService::new(
            core.transport,
            breaker.clone(),
            cache.clone(),
            core.clock,
            events.clone(),
            collection_config,
        );

        info!("Report engine initialized");

        Ok(Self {
            queue,
            scheduler,
            breaker,
            cache,
            collections,
            events,
        })
    }

    /// Admits a submission and nudges the scheduler.
    pub async fn submit(
        &self,
        payload: serde_json::Value,
        attachments: Vec<Attachment>,
    ) -> Result<SubmissionId> {
        let id = self.queue.submit(payload, attachments).await?;
        self.scheduler.wake();
        Ok(id)
    }

    /// Re-admits a terminally failed submission.
    pub async fn retry(&self, id: SubmissionId) -> Result<()> {
        self.queue.retry(id).await?;
        self.scheduler.wake();
        Ok(())
    }

    /// Cancels a queued or failed submission.
    pub async fn cancel(&self, id: SubmissionId) -> Result<()> {
        self.queue.cancel(id).await?;
        Ok(())
    }

    /// Removes a completed submission from the visible history.
    pub async fn clear(&self, id: SubmissionId) -> Result<()> {
        self.queue.clear(id).await?;
        Ok(())
    }

    /// Lists submissions in a given status, FIFO order.
    pub async fn list_by_status(&self, status: SubmissionStatus) -> Vec<SubmissionItem> {
        self.queue.list_by_status(status).await
    }

    /// Looks up a single submission.
    pub async fn submission(&self, id: SubmissionId) -> Option<SubmissionItem> {
        self.queue.get(id).await
    }

    /// Per-status counts.
    pub async fn counters(&self) -> QueueCounters {
        self.queue.counters().await
    }

    /// Requests an immediate drain pass from the background scheduler.
    pub fn force_sync(&self) {
        self.scheduler.force_sync();
    }

    /// Runs one drain pass inline and waits for it to finish.
    pub async fn drain_now(&self) {
        self.scheduler.drain_now().await;
    }

    /// Fetches a collection through cache, debounce and breaker.
    pub async fn fetch(&self, key: &QueryKey, options: FetchOptions) -> Result<CollectionState> {
        Ok(self.collections.fetch(key, options).await?)
    }

    /// Current state of a collection, `Idle` if never fetched.
    pub async fn collection_state(&self, key: &QueryKey) -> CollectionState {
        self.collections.state(key).await
    }

    /// Drops every cached collection.
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await?;
        Ok(())
    }

    /// Forces the circuit breaker closed.
    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }

    /// Breaker internals, for host-side diagnostics.
    pub fn breaker_state(&self) -> CircuitBreakerState {
        self.breaker.state()
    }

    /// Subscribes to the engine's event stream.
    ///
    /// The channel is bounded; a slow subscriber observes a lag error and
    /// keeps receiving from the oldest retained event.
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Subscribes to the subset of events matching `predicate`.
    ///
    /// Convenience over [`subscribe`](Self::subscribe) for hosts that only
    /// care about one event family, e.g. queue progress for a badge counter:
    ///
    /// ```ignore
    /// let mut queue_events =
    ///     engine.subscribe_filtered(|e| matches!(e, CoreEvent::Queue(_)));
    /// ```
    pub fn subscribe_filtered<F>(&self, predicate: F) -> EventStream
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        EventStream::new(self.events.subscribe()).filter(predicate)
    }

    /// Stops the background scheduler. The queue remains persisted.
    pub async fn dispose(&self) {
        self.scheduler.shutdown().await;
        info!("Report engine disposed");
    }
}

//! # Core Configuration Module
//!
//! Provides configuration management for the submission engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all capability implementations and tuning knobs for the
//! engine. It enforces fail-fast validation so a missing capability surfaces
//! at startup rather than on first use.
//!
//! ## Required Capabilities
//!
//! - `Transport` - Required for delivering submissions and fetching lists
//! - `KeyValueStore` - Required for the durable queue ledger and cache
//!
//! ## Optional Capabilities
//!
//! - `ConnectivityMonitor` - Connectivity detection; without it the engine
//!   assumes it is always online
//! - `Clock` - Time source (defaults to the system clock)
//! - `LoggerSink` - Host log forwarding (defaults to tracing only)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .transport(Arc::new(MyTransport))
//!     .store(Arc::new(MyStore))
//!     .connectivity(Arc::new(MyMonitor))
//!     .worker_concurrency(3)
//!     .build()?;
//! # Ok::<(), core_runtime::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! The builder validates all required capabilities and returns
//! [`Error::CapabilityMissing`] with an actionable message when one is absent.

use crate::error::{Error, Result};
use bridge_traits::{Clock, ConnectivityMonitor, KeyValueStore, LoggerSink, SystemClock, Transport};
use std::sync::Arc;
use std::time::Duration;

/// Core configuration for the submission engine.
///
/// This struct holds all capabilities and tuning parameters required to
/// initialize the engine. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Transport for remote calls (required)
    pub transport: Arc<dyn Transport>,

    /// Durable key-value storage for the queue ledger and cache (required)
    pub store: Arc<dyn KeyValueStore>,

    /// Connectivity monitor (optional; engine assumes online without it)
    pub connectivity: Option<Arc<dyn ConnectivityMonitor>>,

    /// Time source (defaults to [`SystemClock`])
    pub clock: Arc<dyn Clock>,

    /// Host logging sink (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Engine tuning parameters
    pub tuning: EngineTuning,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("transport", &"Transport { ... }")
            .field("store", &"KeyValueStore { ... }")
            .field(
                "connectivity",
                &self.connectivity.as_ref().map(|_| "ConnectivityMonitor { ... }"),
            )
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("tuning", &self.tuning)
            .finish()
    }
}

/// Tuning knobs for the queue, scheduler, breaker and cache.
///
/// The defaults match mobile-friendly behavior: a small worker pool, a
/// conservative per-request timeout and a short breaker cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTuning {
    /// Maximum concurrent upload workers during a drain pass
    pub worker_concurrency: usize,

    /// Per-request transport timeout
    pub request_timeout: Duration,

    /// Circuit breaker: consecutive failures before the breaker opens
    pub breaker_failure_threshold: u32,

    /// Circuit breaker: cooldown before a half-open probe is allowed
    pub breaker_cooldown: Duration,

    /// Periodic drain interval while the queue is non-empty
    pub drain_interval: Duration,

    /// Cache entry time-to-live
    pub cache_ttl: Duration,

    /// In-memory cache capacity (entries)
    pub cache_capacity: usize,

    /// Debounce window for collection refreshes
    pub refresh_debounce: Duration,

    /// How long completed queue entries are retained before pruning
    pub completed_retention: Duration,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            worker_concurrency: 3,
            request_timeout: Duration::from_secs(15),
            breaker_failure_threshold: 3,
            breaker_cooldown: Duration::from_secs(30),
            drain_interval: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 64,
            refresh_debounce: Duration::from_secs(1),
            completed_retention: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Worker concurrency is within a sane range (1..=16)
    /// - Timeouts and windows are non-zero
    /// - Breaker threshold is non-zero
    pub fn validate(&self) -> Result<()> {
        let t = &self.tuning;

        if t.worker_concurrency == 0 {
            return Err(Error::Tuning(
                "Worker concurrency must be at least 1".to_string(),
            ));
        }

        if t.worker_concurrency > 16 {
            return Err(Error::Tuning(
                "Worker concurrency exceeds maximum of 16".to_string(),
            ));
        }

        if t.request_timeout.is_zero() {
            return Err(Error::Tuning(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if t.breaker_failure_threshold == 0 {
            return Err(Error::Tuning(
                "Breaker failure threshold must be at least 1".to_string(),
            ));
        }

        if t.breaker_cooldown.is_zero() {
            return Err(Error::Tuning(
                "Breaker cooldown must be greater than zero".to_string(),
            ));
        }

        if t.cache_capacity == 0 {
            return Err(Error::Tuning(
                "Cache capacity must be at least 1 entry".to_string(),
            ));
        }

        Ok(())
    }
}

fn transport_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "Transport".to_string(),
        message: "A Transport implementation is required for delivering submissions. \
                 Desktop: inject bridge_desktop::ReqwestTransport. \
                 Mobile: inject the platform HTTP stack behind the Transport trait."
            .to_string(),
    }
}

fn store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "KeyValueStore".to_string(),
        message: "A KeyValueStore implementation is required for the durable queue ledger. \
                 Desktop: inject bridge_desktop::SqliteKeyValueStore. \
                 Tests: use bridge_traits::MemoryKeyValueStore."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set capabilities and tuning options,
/// then call [`build()`](CoreConfigBuilder::build) to create the final
/// config. The builder validates required capabilities and provides
/// actionable error messages.
#[derive(Default)]
pub struct CoreConfigBuilder {
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn KeyValueStore>>,
    connectivity: Option<Arc<dyn ConnectivityMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    tuning: EngineTuning,
}

impl CoreConfigBuilder {
    /// Sets the transport implementation (required).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the key-value store implementation (required).
    ///
    /// The store backs the durable submission ledger and the cache layer, so
    /// it must survive process restarts on real deployments.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the connectivity monitor (optional).
    ///
    /// Without a monitor the scheduler assumes the device is always online
    /// and relies on transport failures plus the breaker to throttle itself.
    pub fn connectivity(mut self, monitor: Arc<dyn ConnectivityMonitor>) -> Self {
        self.connectivity = Some(monitor);
        self
    }

    /// Sets the time source (optional, defaults to the system clock).
    ///
    /// Tests inject [`bridge_traits::ManualClock`] here to drive backoff and
    /// TTL computations deterministically.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the host logging sink (optional).
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Sets the maximum number of concurrent upload workers.
    ///
    /// Default: 3
    pub fn worker_concurrency(mut self, workers: usize) -> Self {
        self.tuning.worker_concurrency = workers;
        self
    }

    /// Sets the per-request transport timeout.
    ///
    /// Default: 15 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.tuning.request_timeout = timeout;
        self
    }

    /// Sets the circuit breaker failure threshold and cooldown.
    ///
    /// Defaults: 3 consecutive failures, 30 second cooldown
    pub fn breaker(mut self, failure_threshold: u32, cooldown: Duration) -> Self {
        self.tuning.breaker_failure_threshold = failure_threshold;
        self.tuning.breaker_cooldown = cooldown;
        self
    }

    /// Sets the cache time-to-live.
    ///
    /// Default: 5 minutes
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.tuning.cache_ttl = ttl;
        self
    }

    /// Sets the debounce window for collection refreshes.
    ///
    /// Default: 1 second
    pub fn refresh_debounce(mut self, window: Duration) -> Self {
        self.tuning.refresh_debounce = window;
        self
    }

    /// Sets all tuning parameters at once.
    pub fn tuning(mut self, tuning: EngineTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - Required capabilities are missing (Transport, KeyValueStore)
    /// - Tuning values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let transport = self.transport.ok_or_else(transport_missing_error)?;
        let store = self.store.ok_or_else(store_missing_error)?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let config = CoreConfig {
            transport,
            store,
            connectivity: self.connectivity,
            clock,
            logger_sink: self.logger_sink,
            tuning: self.tuning,
        };

        config.validate()?;

        Ok(config)
    }
}

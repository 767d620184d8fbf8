//! Circuit breaker shared by submission delivery and collection fetches.
//!
//! Closed until `failure_threshold` consecutive failures, then open for
//! `cooldown`. After the cooldown exactly one probe call is admitted; its
//! outcome decides between fully closing and re-opening. Failures are
//! counted across call sites so a flapping backend trips the breaker for
//! everyone at once.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use bridge_traits::Clock;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};

/// Tunables for the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,
    /// How long the breaker stays open before admitting a probe
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Returned by [`CircuitBreaker::try_acquire`] while calls are suppressed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Circuit open until {until_ms}")]
pub struct CircuitOpenError {
    /// Unix timestamp (milliseconds) when the cooldown expires
    pub until_ms: i64,
}

/// Snapshot of the breaker internals, for introspection and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerState {
    pub failure_count: u32,
    pub open_until_ms: Option<i64>,
    pub probe_in_flight: bool,
}

struct Inner {
    failure_count: u32,
    open_until_ms: Option<i64>,
    probe_in_flight: bool,
}

/// Consecutive-failure circuit breaker with a single half-open probe.
pub struct CircuitBreaker {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    events: EventBus,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        Self {
            config,
            clock,
            events,
            inner: Mutex::new(Inner {
                failure_count: 0,
                open_until_ms: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Asks permission to make a remote call.
    ///
    /// Passes while the breaker is closed. While open, only a single probe
    /// call passes once the cooldown has expired; everything else gets
    /// [`CircuitOpenError`] without touching the network.
    ///
    /// A caller that acquired a probe slot but ends up not making a call
    /// must hand the slot back with [`release`](Self::release).
    pub fn try_acquire(&self) -> Result<(), CircuitOpenError> {
        let mut inner = self.inner.lock().unwrap();

        let Some(until_ms) = inner.open_until_ms else {
            return Ok(());
        };

        let now_ms = self.clock.unix_timestamp_millis();
        if now_ms >= until_ms && !inner.probe_in_flight {
            debug!("Circuit half-open, admitting probe");
            inner.probe_in_flight = true;
            return Ok(());
        }

        Err(CircuitOpenError { until_ms })
    }

    /// Returns an unused probe slot (acquired, but no call was made).
    pub fn release(&self) {
        self.inner.lock().unwrap().probe_in_flight = false;
    }

    /// Records a successful call. One success fully closes the breaker.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        let was_open = inner.open_until_ms.is_some();
        inner.failure_count = 0;
        inner.open_until_ms = None;
        inner.probe_in_flight = false;
        drop(inner);

        if was_open {
            info!("Circuit breaker closed");
            let _ = self.events.emit(CoreEvent::Sync(SyncEvent::BreakerClosed));
        }
    }

    /// Records a failed call.
    ///
    /// Opens the breaker when the consecutive failure threshold is reached;
    /// a failed probe re-opens it for a full cooldown.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.probe_in_flight = false;

        if inner.failure_count < self.config.failure_threshold {
            return;
        }

        let until_ms =
            self.clock.unix_timestamp_millis() + self.config.cooldown.as_millis() as i64;
        let was_open = inner.open_until_ms.is_some();
        inner.open_until_ms = Some(until_ms);
        let failures = inner.failure_count;
        drop(inner);

        if was_open {
            warn!(until_ms, "Circuit breaker re-opened after failed probe");
        } else {
            warn!(failures, until_ms, "Circuit breaker opened");
        }
        let _ = self
            .events
            .emit(CoreEvent::Sync(SyncEvent::BreakerOpened { until_ms }));
    }

    /// Forces the breaker closed, e.g. on explicit user action.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        let was_open = inner.open_until_ms.is_some();
        inner.failure_count = 0;
        inner.open_until_ms = None;
        inner.probe_in_flight = false;
        drop(inner);

        if was_open {
            info!("Circuit breaker reset");
            let _ = self.events.emit(CoreEvent::Sync(SyncEvent::BreakerClosed));
        }
    }

    /// Whether calls are currently suppressed (open and not yet probeable).
    pub fn is_open(&self) -> bool {
        self.try_is_open()
    }

    fn try_is_open(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.open_until_ms {
            None => false,
            Some(until_ms) => {
                let now_ms = self.clock.unix_timestamp_millis();
                now_ms < until_ms || inner.probe_in_flight
            }
        }
    }

    /// Current internal state snapshot.
    pub fn state(&self) -> CircuitBreakerState {
        let inner = self.inner.lock().unwrap();
        CircuitBreakerState {
            failure_count: inner.failure_count,
            open_until_ms: inner.open_until_ms,
            probe_in_flight: inner.probe_in_flight,
        }
    }
}

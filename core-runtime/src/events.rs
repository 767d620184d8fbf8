//! # Event Bus System
//!
//! Provides an event-driven architecture for the submission engine using
//! `tokio::sync::broadcast`. This module enables decoupled communication
//! between core modules and the UI layer through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! Delivery order matches mutation order: publishers emit immediately after
//! the mutation they describe has been persisted, and the broadcast channel
//! preserves send order per subscriber. A subscriber that unsubscribes
//! mid-notification simply stops receiving; there is no delivery guarantee
//! past that point.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, QueueEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! let event = CoreEvent::Queue(QueueEvent::Enqueued {
//!     submission_id: "sub-1".to_string(),
//! });
//! event_bus.emit(event).ok();
//!
//! let received = subscriber.recv().await.unwrap();
//! # let _ = received;
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types
//! of errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n`
//!   events. This is non-fatal; the subscriber can continue receiving.
//! - **`RecvError::Closed`**: All senders have been dropped (shutdown).

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Submission queue lifecycle events
    Queue(QueueEvent),
    /// Scheduler and circuit breaker events
    Sync(SyncEvent),
    /// Per-collection state events
    Collection(CollectionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Collection(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Queue(QueueEvent::FailedPermanently { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::BreakerOpened { .. }) => EventSeverity::Warning,
            CoreEvent::Queue(QueueEvent::RetryScheduled { .. }) => EventSeverity::Warning,
            CoreEvent::Queue(QueueEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Queue(QueueEvent::Enqueued { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::BreakerClosed) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Queue Events
// ============================================================================

/// Events describing the lifecycle of queued submissions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// A submission was validated, persisted and admitted to the queue.
    Enqueued {
        /// The submission ID.
        submission_id: String,
    },
    /// A worker claimed the submission and started a delivery attempt.
    UploadStarted {
        /// The submission ID.
        submission_id: String,
        /// The attempt number for this delivery (1-based).
        attempt: u32,
    },
    /// The submission reached the remote service.
    Completed {
        /// The submission ID.
        submission_id: String,
    },
    /// A delivery attempt failed; another attempt is scheduled.
    RetryScheduled {
        /// The submission ID.
        submission_id: String,
        /// The attempt that just failed.
        attempt: u32,
        /// Unix timestamp (milliseconds) gating the next attempt.
        next_attempt_at_ms: i64,
        /// Failure description, server-supplied when available.
        reason: String,
    },
    /// The submission failed terminally; only a manual retry re-admits it.
    FailedPermanently {
        /// The submission ID.
        submission_id: String,
        /// Failure description, server-supplied when available.
        reason: String,
    },
    /// The submission was cancelled before delivery.
    Cancelled {
        /// The submission ID.
        submission_id: String,
    },
    /// Aggregate queue counters after a mutation.
    CountersChanged {
        queued: u64,
        uploading: u64,
        completed: u64,
        failed: u64,
    },
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::Enqueued { .. } => "Submission enqueued",
            QueueEvent::UploadStarted { .. } => "Upload attempt started",
            QueueEvent::Completed { .. } => "Submission delivered",
            QueueEvent::RetryScheduled { .. } => "Delivery failed, retry scheduled",
            QueueEvent::FailedPermanently { .. } => "Submission failed permanently",
            QueueEvent::Cancelled { .. } => "Submission cancelled",
            QueueEvent::CountersChanged { .. } => "Queue counters changed",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events from the sync scheduler and the shared circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A drain pass started.
    DrainStarted {
        /// What woke the scheduler ("online", "tick", "force", "submit").
        trigger: String,
    },
    /// A drain pass finished.
    DrainFinished {
        /// Items attempted in this pass.
        processed: u64,
        /// Items delivered.
        succeeded: u64,
        /// Items that failed (retry scheduled or terminal).
        failed: u64,
    },
    /// The circuit breaker opened; remote calls are suppressed locally.
    BreakerOpened {
        /// Unix timestamp (milliseconds) when the cooldown expires.
        until_ms: i64,
    },
    /// The circuit breaker closed; remote calls flow again.
    BreakerClosed,
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::DrainStarted { .. } => "Queue drain started",
            SyncEvent::DrainFinished { .. } => "Queue drain finished",
            SyncEvent::BreakerOpened { .. } => "Circuit breaker opened",
            SyncEvent::BreakerClosed => "Circuit breaker closed",
        }
    }
}

// ============================================================================
// Collection Events
// ============================================================================

/// UI-facing phase of a fetched collection.
///
/// Mirrors `core_collections::CollectionState` without carrying snapshots, so
/// events stay lightweight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionPhase {
    Idle,
    Loading,
    Loaded,
    Empty,
    Error,
    Refreshing,
}

impl fmt::Display for CollectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CollectionPhase::Idle => "idle",
            CollectionPhase::Loading => "loading",
            CollectionPhase::Loaded => "loaded",
            CollectionPhase::Empty => "empty",
            CollectionPhase::Error => "error",
            CollectionPhase::Refreshing => "refreshing",
        };
        write!(f, "{}", s)
    }
}

/// Events describing per-collection state transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CollectionEvent {
    /// A logical list moved to a new phase.
    StateChanged {
        /// Query signature identifying the list.
        key: String,
        /// The phase after the transition.
        phase: CollectionPhase,
        /// Item count when the phase carries a snapshot.
        item_count: Option<u64>,
    },
}

impl CollectionEvent {
    fn description(&self) -> &str {
        match self {
            CollectionEvent::StateChanged { .. } => "Collection state changed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none. Publishers treat the no-subscriber case as benign.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future
    /// events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering
/// capabilities.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Queue(_)));
/// # let _ = stream;
/// # }
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events. Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        let event = CoreEvent::Queue(QueueEvent::Enqueued {
            submission_id: "sub-1".to_string(),
        });

        // Should error when no subscribers
        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_event_emission_with_subscribers() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        let event = CoreEvent::Queue(QueueEvent::Completed {
            submission_id: "sub-1".to_string(),
        });

        let result = bus.emit(event.clone());
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 1);

        let received = sub.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Sync(SyncEvent::DrainStarted {
            trigger: "online".to_string(),
        });

        bus.emit(event.clone()).ok();

        let received1 = sub1.recv().await.unwrap();
        let received2 = sub2.recv().await.unwrap();

        assert_eq!(received1, event);
        assert_eq!(received2, event);
    }

    #[tokio::test]
    async fn test_delivery_order_matches_emit_order() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        for attempt in 1..=3u32 {
            bus.emit(CoreEvent::Queue(QueueEvent::UploadStarted {
                submission_id: "sub-1".to_string(),
                attempt,
            }))
            .ok();
        }

        for attempt in 1..=3u32 {
            let received = sub.recv().await.unwrap();
            assert_eq!(
                received,
                CoreEvent::Queue(QueueEvent::UploadStarted {
                    submission_id: "sub-1".to_string(),
                    attempt,
                })
            );
        }
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Sync(_)));

        // Emit queue event (should be filtered out)
        bus.emit(CoreEvent::Queue(QueueEvent::Enqueued {
            submission_id: "sub-1".to_string(),
        }))
        .ok();

        // Emit sync event (should pass through)
        let sync_event = CoreEvent::Sync(SyncEvent::BreakerClosed);
        bus.emit(sync_event.clone()).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received, sync_event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2); // Very small buffer
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(CoreEvent::Queue(QueueEvent::Enqueued {
                submission_id: format!("sub-{}", i),
            }))
            .ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_event_severity() {
        let error_event = CoreEvent::Queue(QueueEvent::FailedPermanently {
            submission_id: "sub-1".to_string(),
            reason: "invalid category".to_string(),
        });
        assert_eq!(error_event.severity(), EventSeverity::Error);

        let warn_event = CoreEvent::Sync(SyncEvent::BreakerOpened { until_ms: 30_000 });
        assert_eq!(warn_event.severity(), EventSeverity::Warning);

        let debug_event = CoreEvent::Collection(CollectionEvent::StateChanged {
            key: "/v1/reports#1".to_string(),
            phase: CollectionPhase::Loading,
            item_count: None,
        });
        assert_eq!(debug_event.severity(), EventSeverity::Debug);
    }

    #[tokio::test]
    async fn test_event_serialization() {
        let event = CoreEvent::Queue(QueueEvent::RetryScheduled {
            submission_id: "sub-123".to_string(),
            attempt: 2,
            next_attempt_at_ms: 2_000,
            reason: "HTTP 503".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("sub-123"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());

        assert!(stream.try_recv().is_none());
    }
}

//! Pure collection state machine.
//!
//! [`transition`] is a total function over state and signal with no I/O and
//! no clock: the service layer decides *when* to fire signals, this module
//! decides *what* they mean. Invalid combinations are identity, never a
//! panic.

use core_runtime::events::CollectionPhase;
use serde::{Deserialize, Serialize};

use core_cache::CollectionSnapshot;

/// Why a fetch failed, kept distinct so "circuit open" is never confused
/// with a real network failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchFailure {
    /// The shared breaker suppressed the call locally
    CircuitOpen,
    /// Transport could not reach the service
    Network(String),
    /// The request timed out
    TimedOut,
    /// Non-success response
    Server { status: u16, reason: String },
}

/// Lifecycle of one fetched collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionState {
    /// Never fetched
    Idle,
    /// First fetch in flight, nothing to show
    Loading,
    /// A non-empty snapshot is on display
    Loaded(CollectionSnapshot),
    /// A successful fetch returned zero items
    Empty,
    /// A refresh is in flight; the previous snapshot stays on display
    Refreshing(Option<CollectionSnapshot>),
    /// The last fetch failed; a previous snapshot may still be shown
    Error {
        snapshot: Option<CollectionSnapshot>,
        failure: FetchFailure,
    },
}

impl CollectionState {
    /// The UI-facing phase, without snapshot payloads.
    pub fn phase(&self) -> CollectionPhase {
        match self {
            CollectionState::Idle => CollectionPhase::Idle,
            CollectionState::Loading => CollectionPhase::Loading,
            CollectionState::Loaded(_) => CollectionPhase::Loaded,
            CollectionState::Empty => CollectionPhase::Empty,
            CollectionState::Refreshing(_) => CollectionPhase::Refreshing,
            CollectionState::Error { .. } => CollectionPhase::Error,
        }
    }

    /// The snapshot currently on display, if any.
    pub fn snapshot(&self) -> Option<&CollectionSnapshot> {
        match self {
            CollectionState::Loaded(snapshot) => Some(snapshot),
            CollectionState::Refreshing(snapshot) => snapshot.as_ref(),
            CollectionState::Error { snapshot, .. } => snapshot.as_ref(),
            _ => None,
        }
    }

    pub fn item_count(&self) -> Option<u64> {
        self.snapshot().map(|s| s.item_count())
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionSignal {
    /// A network fetch is starting
    FetchStarted,
    /// The fetch returned a snapshot
    FetchSucceeded(CollectionSnapshot),
    /// The fetch failed
    FetchFailed(FetchFailure),
}

/// Applies one signal to a state.
pub fn transition(state: CollectionState, signal: CollectionSignal) -> CollectionState {
    use CollectionSignal::*;
    use CollectionState::*;

    match (state, signal) {
        (Idle, FetchStarted) => Loading,
        // An empty result is still a result: refetching it is a refresh,
        // and the zero-item snapshot stays on display
        (Empty, FetchStarted) => Refreshing(Some(CollectionSnapshot::new(Vec::new()))),
        (Loaded(snapshot), FetchStarted) => Refreshing(Some(snapshot)),
        (
            Error {
                snapshot: Some(snapshot),
                ..
            },
            FetchStarted,
        ) => Refreshing(Some(snapshot)),
        (Error { snapshot: None, .. }, FetchStarted) => Loading,

        (Loading, FetchSucceeded(snapshot)) | (Refreshing(_), FetchSucceeded(snapshot)) => {
            if snapshot.is_empty() {
                Empty
            } else {
                Loaded(snapshot)
            }
        }

        (Loading, FetchFailed(failure)) => Error {
            snapshot: None,
            failure,
        },
        (Refreshing(snapshot), FetchFailed(failure)) => Error { snapshot, failure },

        // Everything else is identity: a stray signal never corrupts state
        (state, _) => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(n: usize) -> CollectionSnapshot {
        CollectionSnapshot::new((0..n).map(|i| json!({"id": i})).collect())
    }

    fn network_failure() -> FetchFailure {
        FetchFailure::Network("unreachable".to_string())
    }

    #[test]
    fn test_first_fetch_path() {
        let state = transition(CollectionState::Idle, CollectionSignal::FetchStarted);
        assert_eq!(state, CollectionState::Loading);

        let state = transition(state, CollectionSignal::FetchSucceeded(snapshot(2)));
        assert_eq!(state, CollectionState::Loaded(snapshot(2)));
    }

    #[test]
    fn test_zero_item_fetch_lands_in_empty() {
        let state = transition(
            CollectionState::Loading,
            CollectionSignal::FetchSucceeded(snapshot(0)),
        );
        assert_eq!(state, CollectionState::Empty);
    }

    #[test]
    fn test_refresh_keeps_previous_snapshot() {
        let state = transition(
            CollectionState::Loaded(snapshot(3)),
            CollectionSignal::FetchStarted,
        );
        assert_eq!(state, CollectionState::Refreshing(Some(snapshot(3))));
        assert_eq!(state.item_count(), Some(3));
    }

    #[test]
    fn test_failed_refresh_retains_snapshot() {
        let state = transition(
            CollectionState::Refreshing(Some(snapshot(3))),
            CollectionSignal::FetchFailed(network_failure()),
        );
        assert_eq!(
            state,
            CollectionState::Error {
                snapshot: Some(snapshot(3)),
                failure: network_failure(),
            }
        );
    }

    #[test]
    fn test_failed_first_fetch_has_no_snapshot() {
        let state = transition(
            CollectionState::Loading,
            CollectionSignal::FetchFailed(FetchFailure::TimedOut),
        );
        assert_eq!(
            state,
            CollectionState::Error {
                snapshot: None,
                failure: FetchFailure::TimedOut,
            }
        );
    }

    #[test]
    fn test_retry_from_error_with_snapshot_refreshes() {
        let error = CollectionState::Error {
            snapshot: Some(snapshot(2)),
            failure: network_failure(),
        };
        let state = transition(error, CollectionSignal::FetchStarted);
        assert_eq!(state, CollectionState::Refreshing(Some(snapshot(2))));
    }

    #[test]
    fn test_retry_from_error_without_snapshot_loads() {
        let error = CollectionState::Error {
            snapshot: None,
            failure: FetchFailure::CircuitOpen,
        };
        let state = transition(error, CollectionSignal::FetchStarted);
        assert_eq!(state, CollectionState::Loading);
    }

    #[test]
    fn test_empty_refetch_is_a_refresh() {
        let state = transition(CollectionState::Empty, CollectionSignal::FetchStarted);
        assert_eq!(state, CollectionState::Refreshing(Some(snapshot(0))));
        // The zero-item rendering survives while the refresh runs
        assert_eq!(state.item_count(), Some(0));

        // A failed refresh keeps it too
        let state = transition(state, CollectionSignal::FetchFailed(network_failure()));
        assert_eq!(
            state,
            CollectionState::Error {
                snapshot: Some(snapshot(0)),
                failure: network_failure(),
            }
        );
    }

    #[test]
    fn test_invalid_combinations_are_identity() {
        // Success without a fetch in flight
        let state = transition(
            CollectionState::Idle,
            CollectionSignal::FetchSucceeded(snapshot(1)),
        );
        assert_eq!(state, CollectionState::Idle);

        // Failure without a fetch in flight
        let state = transition(
            CollectionState::Loaded(snapshot(1)),
            CollectionSignal::FetchFailed(network_failure()),
        );
        assert_eq!(state, CollectionState::Loaded(snapshot(1)));

        // Starting while already loading coalesces
        let state = transition(CollectionState::Loading, CollectionSignal::FetchStarted);
        assert_eq!(state, CollectionState::Loading);
    }

    #[test]
    fn test_phase_mapping() {
        use core_runtime::events::CollectionPhase;

        assert_eq!(CollectionState::Idle.phase(), CollectionPhase::Idle);
        assert_eq!(
            CollectionState::Loaded(snapshot(1)).phase(),
            CollectionPhase::Loaded
        );
        assert_eq!(
            CollectionState::Error {
                snapshot: None,
                failure: FetchFailure::TimedOut,
            }
            .phase(),
            CollectionPhase::Error
        );
    }
}

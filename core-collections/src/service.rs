//! Fetch orchestration.
//!
//! The service owns per-list state keyed by query signature and drives the
//! pure state machine: cache first, then the shared breaker, then the
//! transport. Concurrent fetches for the same key coalesce on the in-flight
//! flag; a second caller simply observes the current state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use bridge_traits::{Clock, HttpMethod, Transport, TransportFailure, TransportRequest};
use core_cache::{CacheHit, CacheLayer, CollectionSnapshot, QueryKey};
use core_runtime::events::{CollectionEvent, CoreEvent, EventBus};
use core_sync::CircuitBreaker;

use crate::error::Result;
use crate::state::{transition, CollectionSignal, CollectionState, FetchFailure};

/// Tunables for collection fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Window in which repeat fetches for a key are served from cache
    pub debounce: Duration,
    /// Per-fetch transport timeout
    pub fetch_timeout: Duration,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(15),
        }
    }
}

/// Per-call fetch options.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Bypass debounce and cache freshness, always hit the network
    pub force_refresh: bool,
    /// On failure, backfill the error state with a stale cached snapshot
    pub allow_stale: bool,
    /// Cache TTL override for this fetch's result
    pub ttl: Option<Duration>,
}

#[derive(Default)]
struct ListState {
    state: Option<CollectionState>,
    /// Completion time of the last successful network fetch, arming debounce
    last_success_ms: Option<i64>,
    in_flight: bool,
}

impl ListState {
    fn current(&self) -> CollectionState {
        self.state.clone().unwrap_or(CollectionState::Idle)
    }
}

enum FetchOutcome {
    Success(CollectionSnapshot),
    Failure(FetchFailure),
}

/// Cache-first, breaker-gated collection fetcher.
pub struct CollectionService {
    transport: Arc<dyn Transport>,
    breaker: Arc<CircuitBreaker>,
    cache: Arc<CacheLayer>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    config: CollectionConfig,
    lists: Mutex<HashMap<String, ListState>>,
}

impl CollectionService {
    pub fn new(
        transport: Arc<dyn Transport>,
        breaker: Arc<CircuitBreaker>,
        cache: Arc<CacheLayer>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        config: CollectionConfig,
    ) -> Self {
        Self {
            transport,
            breaker,
            cache,
            clock,
            events,
            config,
            lists: Mutex::new(HashMap::new()),
        }
    }

    /// Current state of a list, `Idle` if never fetched.
    pub async fn state(&self, key: &QueryKey) -> CollectionState {
        self.lists
            .lock()
            .await
            .get(&key.signature())
            .map(|l| l.current())
            .unwrap_or(CollectionState::Idle)
    }

    /// Fetches a collection, consulting cache, debounce and breaker.
    ///
    /// Returns the resulting state; expected failures (network, server,
    /// circuit open) land in `CollectionState::Error`, never in `Err`.
    pub async fn fetch(&self, key: &QueryKey, options: FetchOptions) -> Result<CollectionState> {
        let signature = key.signature();
        let now_ms = self.clock.unix_timestamp_millis();

        let mut lists = self.lists.lock().await;
        let list = lists.entry(signature.clone()).or_default();

        // Coalesce: a fetch for this key is already in flight
        if list.in_flight {
            return Ok(list.current());
        }

        let hit = self.cache.get(key).await?;

        if !options.force_refresh {
            let debounced = list.last_success_ms.map_or(false, |last| {
                now_ms - last < self.config.debounce.as_millis() as i64
            });

            // Debounced repeats and fresh hits are served from cache with no
            // network call and no Loading flicker.
            if debounced || hit.as_ref().map_or(false, |h| h.fresh) {
                if let Some(hit) = &hit {
                    let state = snapshot_state(hit.value.clone());
                    self.apply(list, &signature, state.clone());
                    return Ok(state);
                }
                if debounced {
                    return Ok(list.current());
                }
            }
        }

        let started = transition(list.current(), CollectionSignal::FetchStarted);
        self.apply(list, &signature, started);
        list.in_flight = true;
        drop(lists);

        let outcome = self.fetch_remote(key, &options).await;

        let mut lists = self.lists.lock().await;
        let list = lists.entry(signature.clone()).or_default();
        list.in_flight = false;

        let state = match outcome {
            FetchOutcome::Success(snapshot) => {
                list.last_success_ms = Some(self.clock.unix_timestamp_millis());
                transition(list.current(), CollectionSignal::FetchSucceeded(snapshot))
            }
            FetchOutcome::Failure(failure) => {
                let mut state =
                    transition(list.current(), CollectionSignal::FetchFailed(failure));
                // A stale entry is better than a blank error screen
                if options.allow_stale {
                    if let CollectionState::Error {
                        snapshot: snapshot @ None,
                        ..
                    } = &mut state
                    {
                        if let Some(CacheHit { value, .. }) = hit {
                            *snapshot = Some(value);
                        }
                    }
                }
                state
            }
        };

        self.apply(list, &signature, state.clone());
        Ok(state)
    }

    /// One network round trip with breaker gating and caching.
    async fn fetch_remote(&self, key: &QueryKey, options: &FetchOptions) -> FetchOutcome {
        if let Err(open) = self.breaker.try_acquire() {
            debug!(key = %key, until_ms = open.until_ms, "Fetch suppressed, circuit open");
            return FetchOutcome::Failure(FetchFailure::CircuitOpen);
        }

        let request = TransportRequest::new(HttpMethod::Get, key.request_path())
            .timeout(self.config.fetch_timeout);

        let outcome = tokio::time::timeout(self.config.fetch_timeout, self.transport.send(request))
            .await;

        let failure = match outcome {
            Ok(Ok(response)) if response.is_success() => {
                match parse_items(&response.body) {
                    Ok(items) => {
                        self.breaker.record_success();
                        let snapshot = CollectionSnapshot::new(items);
                        if let Err(e) = self.cache.put(key, snapshot.clone(), options.ttl).await {
                            warn!(key = %key, error = %e, "Failed to cache fetched collection");
                        }
                        return FetchOutcome::Success(snapshot);
                    }
                    Err(reason) => {
                        self.breaker.record_failure();
                        FetchFailure::Server {
                            status: response.status,
                            reason,
                        }
                    }
                }
            }
            Ok(Ok(response)) => {
                self.breaker.record_failure();
                FetchFailure::Server {
                    status: response.status,
                    reason: response
                        .error_reason()
                        .unwrap_or_else(|| format!("HTTP {}", response.status)),
                }
            }
            Ok(Err(TransportFailure::Unreachable(message))) => {
                self.breaker.record_failure();
                FetchFailure::Network(message)
            }
            Ok(Err(TransportFailure::TimedOut)) | Err(_) => {
                self.breaker.record_failure();
                FetchFailure::TimedOut
            }
        };

        FetchOutcome::Failure(failure)
    }

    fn apply(&self, list: &mut ListState, signature: &str, state: CollectionState) {
        if list.state.as_ref() == Some(&state) {
            return;
        }
        let _ = self
            .events
            .emit(CoreEvent::Collection(CollectionEvent::StateChanged {
                key: signature.to_string(),
                phase: state.phase(),
                item_count: state.item_count(),
            }));
        list.state = Some(state);
    }
}

fn snapshot_state(snapshot: CollectionSnapshot) -> CollectionState {
    if snapshot.is_empty() {
        CollectionState::Empty
    } else {
        CollectionState::Loaded(snapshot)
    }
}

/// Accepts either a bare JSON array or an object with an `items` array.
fn parse_items(body: &[u8]) -> std::result::Result<Vec<serde_json::Value>, String> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| format!("malformed response body: {}", e))?;

    match value {
        serde_json::Value::Array(items) => Ok(items),
        serde_json::Value::Object(mut object) => match object.remove("items") {
            Some(serde_json::Value::Array(items)) => Ok(items),
            _ => Err("response object has no items array".to_string()),
        },
        _ => Err("response body is neither array nor object".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        ManualClock, MemoryKeyValueStore, TransportResponse,
    };
    use core_cache::CacheConfig;
    use core_sync::BreakerConfig;
    use mockall::mock;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    mock! {
        pub Net {}

        #[async_trait]
        impl Transport for Net {
            async fn send(
                &self,
                request: TransportRequest,
            ) -> std::result::Result<TransportResponse, TransportFailure>;
        }
    }

    /// Scripted transport for sequencing scenarios.
    #[derive(Default)]
    struct ScriptedTransport {
        outcomes: StdMutex<VecDeque<std::result::Result<TransportResponse, TransportFailure>>>,
    }

    impl ScriptedTransport {
        fn script(
            outcomes: Vec<std::result::Result<TransportResponse, TransportFailure>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                outcomes: StdMutex::new(outcomes.into()),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            _request: TransportRequest,
        ) -> std::result::Result<TransportResponse, TransportFailure> {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(TransportResponse::new(200, "[]")))
        }
    }

    struct Harness {
        clock: Arc<ManualClock>,
        breaker: Arc<CircuitBreaker>,
        cache: Arc<CacheLayer>,
        events: EventBus,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::at_epoch());
            let store = Arc::new(MemoryKeyValueStore::new());
            let events = EventBus::new(64);
            let breaker = Arc::new(CircuitBreaker::new(
                BreakerConfig::default(),
                clock.clone(),
                events.clone(),
            ));
            let cache = Arc::new(CacheLayer::new(store, clock.clone(), CacheConfig::default()));
            Self {
                clock,
                breaker,
                cache,
                events,
            }
        }

        fn service(&self, transport: Arc<dyn Transport>) -> CollectionService {
            CollectionService::new(
                transport,
                self.breaker.clone(),
                self.cache.clone(),
                self.clock.clone(),
                self.events.clone(),
                CollectionConfig::default(),
            )
        }
    }

    fn two_reports() -> std::result::Result<TransportResponse, TransportFailure> {
        Ok(TransportResponse::new(
            200,
            r#"{"items": [{"id": 1}, {"id": 2}]}"#,
        ))
    }

    #[tokio::test]
    async fn test_first_fetch_loads_and_caches() {
        let h = Harness::new();
        let service = h.service(ScriptedTransport::script(vec![two_reports()]));
        let key = QueryKey::new("/v1/reports");

        let state = service.fetch(&key, FetchOptions::default()).await.unwrap();
        assert!(matches!(state, CollectionState::Loaded(ref s) if s.item_count() == 2));

        let hit = h.cache.get(&key).await.unwrap().unwrap();
        assert!(hit.fresh);
        assert_eq!(hit.value.item_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_fetch_lands_in_empty() {
        let h = Harness::new();
        let service =
            h.service(ScriptedTransport::script(vec![Ok(TransportResponse::new(200, "[]"))]));
        let key = QueryKey::new("/v1/reports");

        let state = service.fetch(&key, FetchOptions::default()).await.unwrap();
        assert_eq!(state, CollectionState::Empty);
    }

    #[tokio::test]
    async fn test_debounce_makes_at_most_one_network_call() {
        let h = Harness::new();
        let mut net = MockNet::new();
        net.expect_send().times(1).returning(|_| {
            Ok(TransportResponse::new(200, r#"[{"id": 1}]"#))
        });
        let service = h.service(Arc::new(net));
        let key = QueryKey::new("/v1/reports");

        service.fetch(&key, FetchOptions::default()).await.unwrap();
        // Immediately repeated fetch is served from cache, not the network
        let state = service.fetch(&key, FetchOptions::default()).await.unwrap();
        assert!(matches!(state, CollectionState::Loaded(_)));
    }

    #[tokio::test]
    async fn test_fresh_cache_hit_skips_network() {
        let h = Harness::new();
        let mut net = MockNet::new();
        net.expect_send().times(1).returning(|_| {
            Ok(TransportResponse::new(200, r#"[{"id": 1}]"#))
        });
        let service = h.service(Arc::new(net));
        let key = QueryKey::new("/v1/reports");

        service.fetch(&key, FetchOptions::default()).await.unwrap();

        // Past the debounce window but still within the TTL
        h.clock.advance(Duration::from_secs(60));
        let state = service.fetch(&key, FetchOptions::default()).await.unwrap();
        assert!(matches!(state, CollectionState::Loaded(_)));
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_fresh_cache() {
        let h = Harness::new();
        let mut net = MockNet::new();
        net.expect_send().times(2).returning(|_| {
            Ok(TransportResponse::new(200, r#"[{"id": 1}]"#))
        });
        let service = h.service(Arc::new(net));
        let key = QueryKey::new("/v1/reports");

        service.fetch(&key, FetchOptions::default()).await.unwrap();
        service
            .fetch(
                &key,
                FetchOptions {
                    force_refresh: true,
                    ..FetchOptions::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stale_cache_triggers_refresh() {
        let h = Harness::new();
        let service = h.service(ScriptedTransport::script(vec![
            two_reports(),
            Ok(TransportResponse::new(200, r#"[{"id": 3}]"#)),
        ]));
        let key = QueryKey::new("/v1/reports");

        service.fetch(&key, FetchOptions::default()).await.unwrap();

        // TTL expired: the next fetch revalidates over the network
        h.clock.advance(Duration::from_secs(301));
        let state = service.fetch(&key, FetchOptions::default()).await.unwrap();
        assert!(matches!(state, CollectionState::Loaded(ref s) if s.item_count() == 1));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let h = Harness::new();
        let service = h.service(ScriptedTransport::script(vec![
            two_reports(),
            Ok(TransportResponse::new(503, r#"{"reason": "overloaded"}"#)),
        ]));
        let key = QueryKey::new("/v1/reports");

        service.fetch(&key, FetchOptions::default()).await.unwrap();
        h.clock.advance(Duration::from_secs(301));

        let state = service.fetch(&key, FetchOptions::default()).await.unwrap();
        match state {
            CollectionState::Error { snapshot, failure } => {
                assert_eq!(snapshot.unwrap().item_count(), 2);
                assert_eq!(
                    failure,
                    FetchFailure::Server {
                        status: 503,
                        reason: "overloaded".to_string(),
                    }
                );
            }
            other => panic!("expected error state, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_circuit_open_fails_without_network() {
        let h = Harness::new();
        let mut net = MockNet::new();
        net.expect_send().never();
        let service = h.service(Arc::new(net));
        let key = QueryKey::new("/v1/reports");

        for _ in 0..3 {
            h.breaker.record_failure();
        }

        let state = service.fetch(&key, FetchOptions::default()).await.unwrap();
        assert_eq!(
            state,
            CollectionState::Error {
                snapshot: None,
                failure: FetchFailure::CircuitOpen,
            }
        );
    }

    #[tokio::test]
    async fn test_allow_stale_backfills_error_snapshot() {
        let h = Harness::new();
        let service = h.service(ScriptedTransport::script(vec![
            two_reports(),
            Err(TransportFailure::Unreachable("no route".to_string())),
        ]));
        let key = QueryKey::new("/v1/reports");

        service.fetch(&key, FetchOptions::default()).await.unwrap();

        // Simulate a fresh process: list state gone, stale cache remains
        let service = h.service(ScriptedTransport::script(vec![Err(
            TransportFailure::Unreachable("no route".to_string()),
        )]));
        h.clock.advance(Duration::from_secs(301));

        let state = service
            .fetch(
                &key,
                FetchOptions {
                    allow_stale: true,
                    ..FetchOptions::default()
                },
            )
            .await
            .unwrap();

        match state {
            CollectionState::Error { snapshot, failure } => {
                assert_eq!(snapshot.unwrap().item_count(), 2);
                assert!(matches!(failure, FetchFailure::Network(_)));
            }
            other => panic!("expected error state, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_manual_fetch_retries_from_error() {
        let h = Harness::new();
        let service = h.service(ScriptedTransport::script(vec![
            Err(TransportFailure::TimedOut),
            two_reports(),
        ]));
        let key = QueryKey::new("/v1/reports");

        let state = service.fetch(&key, FetchOptions::default()).await.unwrap();
        assert!(matches!(state, CollectionState::Error { .. }));

        let state = service.fetch(&key, FetchOptions::default()).await.unwrap();
        assert!(matches!(state, CollectionState::Loaded(_)));
    }

    #[tokio::test]
    async fn test_state_changes_are_broadcast() {
        use core_runtime::events::CollectionPhase;

        let h = Harness::new();
        let mut sub = h.events.subscribe();
        let service = h.service(ScriptedTransport::script(vec![two_reports()]));
        let key = QueryKey::new("/v1/reports");

        service.fetch(&key, FetchOptions::default()).await.unwrap();

        let first = sub.recv().await.unwrap();
        assert_eq!(
            first,
            CoreEvent::Collection(CollectionEvent::StateChanged {
                key: key.signature(),
                phase: CollectionPhase::Loading,
                item_count: None,
            })
        );
        let second = sub.recv().await.unwrap();
        assert_eq!(
            second,
            CoreEvent::Collection(CollectionEvent::StateChanged {
                key: key.signature(),
                phase: CollectionPhase::Loaded,
                item_count: Some(2),
            })
        );
    }
}

//! # Collection Fetching
//!
//! Per-list lifecycle for remote collections.
//!
//! - [`state`] - The pure state machine: [`CollectionState`] and
//!   [`transition`](state::transition), unit-testable without any runtime
//! - [`service`] - [`CollectionService`]: cache-first fetch orchestration
//!   with debouncing, breaker gating and stale fallback

pub mod error;
pub mod service;
pub mod state;

pub use error::{CollectionError, Result};
pub use service::{CollectionConfig, CollectionService, FetchOptions};
pub use state::{transition, CollectionSignal, CollectionState, FetchFailure};

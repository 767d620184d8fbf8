//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the submission engine and
//! platform-specific implementations. Each trait represents a capability that
//! the core requires but that must be provided differently per platform
//! (desktop, iOS, Android):
//!
//! - [`Transport`](transport::Transport) - HTTP-like delivery of submissions
//!   and collection fetches
//! - [`KeyValueStore`](store::KeyValueStore) - Durable key-value storage for
//!   the submission ledger and collection cache
//! - [`ConnectivityMonitor`](connectivity::ConnectivityMonitor) - Online/offline
//!   signal plus change notifications
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing; see `core_runtime::config::CoreConfig` for the validation point.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks. Implementations must ensure thread safety.
//!
//! ## Test Implementations
//!
//! In-crate implementations exist for tests and development:
//! [`MemoryKeyValueStore`](store::MemoryKeyValueStore),
//! [`ManualConnectivity`](connectivity::ManualConnectivity),
//! [`SystemClock`](time::SystemClock), [`ManualClock`](time::ManualClock) and
//! [`ConsoleLogger`](time::ConsoleLogger).

pub mod connectivity;
pub mod error;
pub mod store;
pub mod time;
pub mod transport;

pub use error::BridgeError;

// Re-export commonly used types
pub use connectivity::{ConnectivityMonitor, ConnectivityStatus, ManualConnectivity};
pub use store::{KeyValueStore, MemoryKeyValueStore};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
pub use transport::{
    AttachmentPart, HttpMethod, Transport, TransportFailure, TransportRequest, TransportResponse,
};

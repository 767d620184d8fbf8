//! # Collection Cache
//!
//! TTL-based cache for fetched collections with explicit invalidation.
//!
//! A bounded `lru` front keeps hot entries in memory; every write goes
//! through to the host [`KeyValueStore`] under the `cache:{signature}`
//! namespace, so cached collections survive process restarts and an LRU
//! eviction only costs a ledger read.
//!
//! [`KeyValueStore`]: bridge_traits::KeyValueStore

pub mod error;
pub mod key;
pub mod layer;

pub use error::{CacheError, Result};
pub use key::QueryKey;
pub use layer::{CacheConfig, CacheHit, CacheLayer, CollectionSnapshot};

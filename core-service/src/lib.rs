//! # Engine facade
//!
//! This crate wires the submission queue, circuit breaker, cache, sync
//! scheduler and collection service into [`ReportEngine`], the single entry
//! point host applications hold. Desktop apps typically enable the
//! `desktop-shims` feature and inject the adapters from `bridge-desktop`;
//! mobile hosts implement the `bridge-traits` capabilities over their
//! platform stacks.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::{EngineConfig, ReportEngine};
//!
//! let core = CoreConfig::builder()
//!     .transport(transport)
//!     .store(store)
//!     .connectivity(monitor)
//!     .build()?;
//! let engine = ReportEngine::init(EngineConfig::from(core)).await?;
//!
//! let id = engine.submit(payload, attachments).await?;
//! let mut events = engine.subscribe();
//! ```

pub mod engine;
pub mod error;

pub use engine::{EngineConfig, ReportEngine};
pub use error::{EngineError, Result};

// Re-export the surface hosts interact with, so most apps only depend on
// this crate.
pub use core_cache::QueryKey;
pub use core_collections::{CollectionState, FetchFailure, FetchOptions};
pub use core_queue::{
    Attachment, QueueCounters, SubmissionId, SubmissionItem, SubmissionStatus,
};
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder, EngineTuning};
pub use core_runtime::events::{CollectionEvent, CoreEvent, EventStream, QueueEvent, SyncEvent};

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use bridge_desktop::{ReqwestTransport, SqliteKeyValueStore};

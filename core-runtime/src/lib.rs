//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the submission engine:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast capability validation
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other engine crates depend
//! on. It establishes the logging conventions and the event broadcasting
//! mechanism used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CollectionEvent, CollectionPhase, CoreEvent, EventBus, QueueEvent, SyncEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};

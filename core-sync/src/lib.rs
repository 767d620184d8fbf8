//! # Sync Engine
//!
//! Network-aware draining of the submission queue.
//!
//! - [`breaker`] - Shared circuit breaker guarding all remote calls
//! - [`scheduler`] - Background drain loop: wakes on connectivity recovery,
//!   periodic ticks and explicit triggers, claims eligible submissions FIFO
//!   and delivers them through a bounded worker pool

pub mod breaker;
pub mod scheduler;

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitBreakerState, CircuitOpenError};
pub use scheduler::{SchedulerConfig, SyncScheduler};

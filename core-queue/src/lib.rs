//! # Submission Queue
//!
//! Durable, retrying submission queue for field reports.
//!
//! ## Overview
//!
//! - [`item`] - The submission data model: [`SubmissionItem`], [`Attachment`],
//!   [`SubmissionStatus`] with boundary validation
//! - [`retry`] - Pure retry policy: failure classification and backoff
//!   scheduling
//! - [`ledger`] - Persistence of queue items over a [`KeyValueStore`]
//!   (`queue:{id}` namespace)
//! - [`queue`] - The [`SubmissionQueue`] itself: admission, cancellation,
//!   manual retry, scheduler claim/complete/fail operations
//!
//! Every mutation is persisted through the ledger before the corresponding
//! event is broadcast, so a crash never loses an accepted submission.
//!
//! [`KeyValueStore`]: bridge_traits::KeyValueStore

pub mod error;
pub mod item;
pub mod ledger;
pub mod queue;
pub mod retry;

pub use error::{QueueError, Result};
pub use item::{
    Attachment, FailureInfo, SubmissionId, SubmissionItem, SubmissionStatus,
};
pub use ledger::SubmissionLedger;
pub use queue::{QueueConfig, QueueCounters, SubmissionQueue};
pub use retry::{classify_status, FailureKind, RetryDecision, RetryPolicy};

//! Pure retry policy.
//!
//! Classification and backoff scheduling are free of I/O and clock access so
//! they can be tested exhaustively. The caller supplies the attempt count
//! that just failed; the policy answers with a delay or a terminal verdict.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Classified delivery failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport could not reach the service
    Network,
    /// The request timed out locally
    Timeout,
    /// 5xx response
    Server { status: u16 },
    /// 429 response
    RateLimited,
    /// 4xx response other than 429 — the request itself is bad
    Rejected { status: u16 },
    /// 413 response — attachments exceed the server limit
    PayloadTooLarge,
}

impl FailureKind {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::Network
                | FailureKind::Timeout
                | FailureKind::Server { .. }
                | FailureKind::RateLimited
        )
    }
}

/// Classifies a non-success HTTP status code.
pub fn classify_status(status: u16) -> FailureKind {
    match status {
        429 => FailureKind::RateLimited,
        413 => FailureKind::PayloadTooLarge,
        400..=499 => FailureKind::Rejected { status },
        _ => FailureKind::Server { status },
    }
}

/// Verdict for a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule another attempt after the given delay
    Delay(Duration),
    /// Give up; the item becomes terminally failed
    Terminal,
}

/// Fixed backoff schedule applied to retryable failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    schedule: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            schedule: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(30),
            ],
        }
    }
}

impl RetryPolicy {
    pub fn new(schedule: Vec<Duration>) -> Self {
        Self { schedule }
    }

    /// Maximum number of attempts before a retryable failure turns terminal.
    pub fn max_attempts(&self) -> u32 {
        self.schedule.len() as u32 + 1
    }

    /// Decides what happens after attempt `attempt_count` failed with `kind`.
    ///
    /// Non-retryable kinds are terminal on first occurrence. Retryable kinds
    /// follow the backoff schedule; once the schedule is exhausted the item
    /// is terminal.
    pub fn next_decision(&self, kind: FailureKind, attempt_count: u32) -> RetryDecision {
        if !kind.is_retryable() {
            return RetryDecision::Terminal;
        }

        match self.schedule.get(attempt_count.saturating_sub(1) as usize) {
            Some(delay) => RetryDecision::Delay(*delay),
            None => RetryDecision::Terminal,
        }
    }
}

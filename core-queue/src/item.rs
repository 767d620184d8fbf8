//! Submission data model.
//!
//! A [`SubmissionItem`] is the unit of work the queue persists and the
//! scheduler delivers. Payloads are opaque JSON; attachments are references
//! to host-managed files and are validated once, at the admission boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{QueueError, Result};
use crate::retry::FailureKind;

/// Unique identifier for a queued submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference to a host-managed file attached to a submission.
///
/// Attachments are immutable once the submission is enqueued. The shape is
/// validated at the admission boundary; after that the queue treats the uri
/// as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Host file reference (platform uri or path)
    pub uri: String,
    /// MIME type, e.g. "image/jpeg"
    pub mime_type: String,
    /// Display name of the file
    pub name: String,
    /// File size in bytes
    pub size_bytes: u64,
}

impl Attachment {
    /// Validates the attachment shape.
    ///
    /// Rejects empty uri or name, a MIME type without a `/` separator, and a
    /// zero byte size.
    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(QueueError::Validation(
                "Attachment uri cannot be empty".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(QueueError::Validation(
                "Attachment name cannot be empty".to_string(),
            ));
        }
        if !self.mime_type.contains('/') {
            return Err(QueueError::Validation(format!(
                "Attachment mime type '{}' is malformed",
                self.mime_type
            )));
        }
        if self.size_bytes == 0 {
            return Err(QueueError::Validation(format!(
                "Attachment '{}' has zero size",
                self.name
            )));
        }
        Ok(())
    }
}

/// Lifecycle status of a queued submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Waiting for its first (or manually re-requested) delivery attempt
    Queued,
    /// Claimed by a worker; a delivery attempt is in flight
    Uploading,
    /// Delivered to the remote service
    Completed,
    /// Delivery failed. With a retry deadline the scheduler picks the item
    /// up again once it passes; without one the failure is terminal and
    /// only a manual retry re-admits it.
    Failed,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmissionStatus::Queued => "queued",
            SubmissionStatus::Uploading => "uploading",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Description of the most recent delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Classified failure kind
    pub kind: FailureKind,
    /// Human-readable reason, server-supplied when available
    pub reason: String,
}

impl FailureInfo {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// A persisted submission with its delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionItem {
    /// Unique id, assigned at admission
    pub id: SubmissionId,
    /// Monotonic enqueue sequence; FIFO tie-break when `created_at_ms` collides
    pub seq: u64,
    /// Opaque report payload
    pub payload: serde_json::Value,
    /// Attached file references, immutable after admission
    pub attachments: Vec<Attachment>,
    /// Current lifecycle status
    pub status: SubmissionStatus,
    /// Delivery attempts made so far (monotonic)
    pub attempt_count: u32,
    /// Most recent failure, if any
    pub last_error: Option<FailureInfo>,
    /// Admission time (unix millis)
    pub created_at_ms: i64,
    /// Last mutation time (unix millis)
    pub updated_at_ms: i64,
    /// Earliest time the next attempt may start (unix millis)
    pub next_attempt_at_ms: Option<i64>,
    /// Delivery time (unix millis), set when `Completed`
    pub completed_at_ms: Option<i64>,
}

impl SubmissionItem {
    pub fn new(
        seq: u64,
        payload: serde_json::Value,
        attachments: Vec<Attachment>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: SubmissionId::new(),
            seq,
            payload,
            attachments,
            status: SubmissionStatus::Queued,
            attempt_count: 0,
            last_error: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            next_attempt_at_ms: None,
            completed_at_ms: None,
        }
    }

    /// Total bytes across all attachments.
    pub fn attachment_bytes(&self) -> u64 {
        self.attachments.iter().map(|a| a.size_bytes).sum()
    }

    /// Whether the scheduler may claim this item right now.
    ///
    /// `Queued` items are eligible outright; `Failed` items become eligible
    /// once their retry deadline passes. A `Failed` item without a deadline
    /// is terminal and never claimed.
    pub fn is_eligible(&self, now_ms: i64) -> bool {
        match self.status {
            SubmissionStatus::Queued => true,
            SubmissionStatus::Failed => {
                self.next_attempt_at_ms.map_or(false, |due| due <= now_ms)
            }
            _ => false,
        }
    }

    /// Whether the item has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            SubmissionStatus::Completed => true,
            SubmissionStatus::Failed => self.next_attempt_at_ms.is_none(),
            _ => false,
        }
    }

    /// FIFO ordering key: admission time, then enqueue sequence.
    pub fn fifo_key(&self) -> (i64, u64) {
        (self.created_at_ms, self.seq)
    }
}

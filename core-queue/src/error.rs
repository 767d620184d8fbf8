use thiserror::Error;

use crate::item::{SubmissionId, SubmissionStatus};

#[derive(Error, Debug)]
pub enum QueueError {
    /// Payload or attachment rejected at the submission boundary.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An attachment budget would be exceeded by admitting the submission.
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// No submission with the given id exists.
    #[error("Submission not found: {0}")]
    NotFound(SubmissionId),

    /// The submission is not in a state that allows the operation.
    #[error("Submission {id} is {status}, cannot {operation}")]
    InvalidState {
        id: SubmissionId,
        status: SubmissionStatus,
        operation: &'static str,
    },

    /// The durable ledger could not be read or written.
    #[error("Ledger error: {0}")]
    Ledger(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;

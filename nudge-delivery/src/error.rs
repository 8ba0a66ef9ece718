//! Error taxonomy for the delivery layer.
//!
//! Backend failures are recovered by falling through the dispatch chain and
//! are never surfaced to callers; queue persistence failures drop a single
//! instruction; only invalid input fails a scheduling call outright.

use thiserror::Error;

use nudge_core::SequenceError;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The vendor answered but did not acknowledge the notification.
    #[error("{backend} rejected the notification: {reason}")]
    Rejected { backend: &'static str, reason: String },

    #[error("{backend} request failed: {source}")]
    Http {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("offline queue write failed: {0}")]
    Persistence(#[source] anyhow::Error),

    #[error("offline queue entry not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid task: {0}")]
    InvalidTask(#[from] SequenceError),
}

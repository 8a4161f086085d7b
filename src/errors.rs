use crate::types::Phase;

#[derive(thiserror::Error, Debug)]
pub enum NetrandError {
    #[error("Trial count must be greater than zero")]
    InvalidTrialCount,

    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("Invalid target URL '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },

    #[error("Invalid batch range {min}..={max}: bounds must be positive and min <= max")]
    InvalidBatchRange { min: usize, max: usize },

    #[error("Repeat count must be greater than zero")]
    InvalidRepeatCount,

    #[error("{phase} request #{index} failed: {source}")]
    Transport {
        phase: Phase,
        index: usize,
        source: crate::fetch::FetchError,
    },

    #[error("Request task did not complete: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("Completion channel closed before all reports were sent")]
    CompletionChannelClosed,

    #[error("Expected {expected} completion reports, received {received}")]
    MissingReports { expected: usize, received: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Stored run {run_id} is corrupt: {detail}")]
    CorruptRun { run_id: i64, detail: String },
}

impl NetrandError {
    /// True for request failures, the only errors a sweep may skip past.
    pub fn is_transport(&self) -> bool {
        matches!(self, NetrandError::Transport { .. })
    }
}

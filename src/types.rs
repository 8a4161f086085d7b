use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row id assigned to a run by the recorder.
pub type RunId = i64;

/// Which timer produced a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Sequential,
    Concurrent,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Sequential => f.write_str("sequential"),
            Phase::Concurrent => f.write_str("concurrent"),
        }
    }
}

/// Outcome of one engine invocation for a single batch size.
///
/// `concurrent_durations_ms` is in completion order, `sequential_durations_ms`
/// in issuance order. Both hold exactly one entry per trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingResult {
    pub batch_size: usize,
    pub concurrent_durations_ms: Vec<i64>,
    pub concurrent_total_ms: i64,
    pub sequential_durations_ms: Vec<i64>,
    pub sequential_total_ms: i64,
}

impl TimingResult {
    pub fn trials(&self) -> usize {
        self.sequential_durations_ms.len()
    }

    /// Concurrent total over sequential total, `None` when the sequential
    /// phase took under a millisecond.
    pub fn ratio(&self) -> Option<f64> {
        concurrent_sequential_ratio(self.concurrent_total_ms, self.sequential_total_ms)
    }
}

pub fn concurrent_sequential_ratio(concurrent_total_ms: i64, sequential_total_ms: i64) -> Option<f64> {
    if sequential_total_ms == 0 {
        return None;
    }
    Some(concurrent_total_ms as f64 / sequential_total_ms as f64)
}

/// Stored projection of a run, without the raw series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub recorded_at: DateTime<Utc>,
    pub batch_size: usize,
    pub sequential_total_ms: i64,
    pub concurrent_total_ms: i64,
    pub ratio: Option<f64>,
}

/// A result that has been written to storage.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub run_id: Option<RunId>,
    pub result: TimingResult,
}

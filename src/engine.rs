//! Sequential and batch-concurrent GET timers.
//!
//! The concurrent timer uses a pulsed barrier: after launching request `i` it
//! joins every outstanding task whenever `i % batch_size == 0`. Index 0 always
//! hits the barrier, so the first request runs alone.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::errors::NetrandError;
use crate::fetch::{FetchError, Fetcher};
use crate::types::{Phase, TimingResult};

/// Per-request durations of one phase plus the phase's wall-clock span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTimings {
    pub durations_ms: Vec<i64>,
    pub total_ms: i64,
}

pub struct TimingEngine {
    fetcher: Arc<dyn Fetcher>,
}

impl TimingEngine {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Runs the concurrent phase, then the sequential phase, against `url`.
    ///
    /// Input is validated before any request is issued. The first transport
    /// error aborts the run and is returned; nothing partial is kept.
    pub async fn run(
        &self,
        url: &str,
        trials: usize,
        batch_size: usize,
    ) -> Result<TimingResult, NetrandError> {
        validate_url(url)?;
        validate_counts(trials, batch_size)?;

        info!(url, trials, batch_size, "Starting timing run");
        let concurrent = self.concurrent(url, trials, batch_size).await?;
        let sequential = self.sequential(url, trials).await?;
        info!(
            batch_size,
            concurrent_total_ms = concurrent.total_ms,
            sequential_total_ms = sequential.total_ms,
            "Finished timing run"
        );

        Ok(TimingResult {
            batch_size,
            concurrent_durations_ms: concurrent.durations_ms,
            concurrent_total_ms: concurrent.total_ms,
            sequential_durations_ms: sequential.durations_ms,
            sequential_total_ms: sequential.total_ms,
        })
    }

    /// Issues `trials` GETs one after another. Durations are in issuance order.
    pub async fn sequential(&self, url: &str, trials: usize) -> Result<PhaseTimings, NetrandError> {
        validate_counts(trials, 1)?;

        let start = Instant::now();
        let mut durations_ms = Vec::with_capacity(trials);
        for index in 0..trials {
            let duration = timed_get(self.fetcher.as_ref(), url)
                .await
                .map_err(|source| NetrandError::Transport {
                    phase: Phase::Sequential,
                    index,
                    source,
                })?;
            durations_ms.push(duration);
        }

        Ok(PhaseTimings {
            durations_ms,
            total_ms: millis(start.elapsed()),
        })
    }

    /// Issues `trials` GETs as spawned tasks behind the pulsed barrier.
    /// Durations are in completion order.
    pub async fn concurrent(
        &self,
        url: &str,
        trials: usize,
        batch_size: usize,
    ) -> Result<PhaseTimings, NetrandError> {
        validate_counts(trials, batch_size)?;

        // Capacity equals the number of producers, so a send never waits.
        let (reports, mut completions) = mpsc::channel::<i64>(trials);
        let mut tasks = JoinSet::new();
        let url: Arc<str> = Arc::from(url);

        let start = Instant::now();
        for index in 0..trials {
            let fetcher = Arc::clone(&self.fetcher);
            let url = Arc::clone(&url);
            let reports = reports.clone();
            tasks.spawn(async move {
                let duration = timed_get(fetcher.as_ref(), &url).await.map_err(|source| {
                    NetrandError::Transport {
                        phase: Phase::Concurrent,
                        index,
                        source,
                    }
                })?;
                reports
                    .send(duration)
                    .await
                    .map_err(|_| NetrandError::CompletionChannelClosed)
            });

            if index % batch_size == 0 {
                debug!(index, outstanding = tasks.len(), "Waiting on batch barrier");
                join_all(&mut tasks).await?;
            }
        }
        join_all(&mut tasks).await?;
        drop(reports);

        let mut durations_ms = Vec::with_capacity(trials);
        while let Some(duration) = completions.recv().await {
            durations_ms.push(duration);
        }
        let total_ms = millis(start.elapsed());

        if durations_ms.len() != trials {
            return Err(NetrandError::MissingReports {
                expected: trials,
                received: durations_ms.len(),
            });
        }

        Ok(PhaseTimings {
            durations_ms,
            total_ms,
        })
    }
}

/// Joins every task in the set. Returning early drops the set's remaining
/// tasks along with the caller's `JoinSet`, which aborts them.
async fn join_all(tasks: &mut JoinSet<Result<(), NetrandError>>) -> Result<(), NetrandError> {
    while let Some(joined) = tasks.join_next().await {
        joined??;
    }
    Ok(())
}

async fn timed_get(fetcher: &dyn Fetcher, url: &str) -> Result<i64, FetchError> {
    let start = Instant::now();
    fetcher.get(url).await?;
    Ok(millis(start.elapsed()))
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn validate_counts(trials: usize, batch_size: usize) -> Result<(), NetrandError> {
    if trials == 0 {
        return Err(NetrandError::InvalidTrialCount);
    }
    if batch_size == 0 {
        return Err(NetrandError::InvalidBatchSize);
    }
    Ok(())
}

pub fn validate_url(url: &str) -> Result<(), NetrandError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| NetrandError::InvalidUrl {
        url: url.to_string(),
        detail: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(NetrandError::InvalidUrl {
            url: url.to_string(),
            detail: format!("unsupported scheme '{}'", other),
        }),
    }
}

use std::ops::RangeInclusive;

use tracing::{info, warn};

use crate::config::{OnError, SweepConfig};
use crate::engine::TimingEngine;
use crate::errors::NetrandError;
use crate::recorder::RunRecorder;
use crate::types::RecordedRun;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    pub min_batch: usize,
    pub max_batch: usize,
    pub repeats: usize,
    pub on_error: OnError,
}

impl SweepPlan {
    pub fn validate(&self) -> Result<(), NetrandError> {
        if self.min_batch == 0 || self.min_batch > self.max_batch {
            return Err(NetrandError::InvalidBatchRange {
                min: self.min_batch,
                max: self.max_batch,
            });
        }
        if self.repeats == 0 {
            return Err(NetrandError::InvalidRepeatCount);
        }
        Ok(())
    }

    pub fn batch_sizes(&self) -> RangeInclusive<usize> {
        self.min_batch..=self.max_batch
    }

    /// Number of engine invocations the plan asks for.
    pub fn points(&self) -> usize {
        self.batch_sizes().count() * self.repeats
    }
}

impl From<&SweepConfig> for SweepPlan {
    fn from(config: &SweepConfig) -> Self {
        Self {
            min_batch: config.min_batch,
            max_batch: config.max_batch,
            repeats: config.repeats,
            on_error: config.on_error,
        }
    }
}

#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub runs: Vec<RecordedRun>,
    pub skipped: usize,
}

/// Time one batch size and, when a recorder is given, persist the result.
pub async fn run_once(
    engine: &TimingEngine,
    recorder: Option<&RunRecorder>,
    url: &str,
    trials: usize,
    batch_size: usize,
) -> Result<RecordedRun, NetrandError> {
    let result = engine.run(url, trials, batch_size).await?;
    let run_id = match recorder {
        Some(recorder) => Some(recorder.record(&result).await?),
        None => None,
    };
    Ok(RecordedRun { run_id, result })
}

/// Walk every batch size in the plan, `repeats` times each, in ascending order.
///
/// Transport failures follow `plan.on_error`; every other error ends the
/// sweep. Runs recorded before a failure stay recorded.
pub async fn run_sweep(
    engine: &TimingEngine,
    recorder: Option<&RunRecorder>,
    url: &str,
    trials: usize,
    plan: &SweepPlan,
) -> Result<SweepOutcome, NetrandError> {
    plan.validate()?;
    crate::engine::validate_url(url)?;
    if trials == 0 {
        return Err(NetrandError::InvalidTrialCount);
    }

    info!(
        min_batch = plan.min_batch,
        max_batch = plan.max_batch,
        repeats = plan.repeats,
        points = plan.points(),
        "Starting sweep"
    );

    let mut outcome = SweepOutcome::default();
    for batch_size in plan.batch_sizes() {
        for repeat in 0..plan.repeats {
            match run_once(engine, recorder, url, trials, batch_size).await {
                Ok(run) => outcome.runs.push(run),
                Err(err) if err.is_transport() && plan.on_error == OnError::Skip => {
                    warn!(batch_size, repeat, error = %err, "Skipping failed data point");
                    outcome.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    info!(
        recorded = outcome.runs.len(),
        skipped = outcome.skipped,
        "Finished sweep"
    );
    Ok(outcome)
}

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::errors::NetrandError;
use crate::types::{RunId, RunSummary, TimingResult, concurrent_sequential_ratio};

//      __________________________runs____________________
//     |                                                  |
// concurrent_timings(fk: run)                sequential_timings(fk: run)
const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS runs (
        run_id INTEGER NOT NULL PRIMARY KEY,
        recorded_at TEXT NOT NULL,
        batch_size INTEGER NOT NULL,
        concurrent_total_ms INTEGER NOT NULL,
        sequential_total_ms INTEGER NOT NULL,
        concurrent_sequential_ratio REAL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS sequential_timings (
        run INTEGER NOT NULL REFERENCES runs(run_id),
        call_number INTEGER NOT NULL,
        timing_ms INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS concurrent_timings (
        run INTEGER NOT NULL REFERENCES runs(run_id),
        channel_position INTEGER NOT NULL,
        timing_ms INTEGER NOT NULL
    )
    ",
];

/// Persists timing results to SQLite.
pub struct RunRecorder {
    pool: SqlitePool,
}

impl RunRecorder {
    /// Open (creating if missing) the database file at `path` and ensure the schema.
    pub async fn open(path: &Path) -> Result<Self, NetrandError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .foreign_keys(true)
                    .journal_mode(SqliteJournalMode::Wal),
            )
            .await?;

        let recorder = Self { pool };
        recorder.ensure_schema().await?;
        info!(path = %path.display(), "Opened run database");
        Ok(recorder)
    }

    /// Private in-memory database; gone when the recorder is dropped.
    pub async fn in_memory() -> Result<Self, NetrandError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // One connection only: each in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let recorder = Self { pool };
        recorder.ensure_schema().await?;
        Ok(recorder)
    }

    async fn ensure_schema(&self) -> Result<(), NetrandError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Store a result and both of its series in one transaction.
    pub async fn record(&self, result: &TimingResult) -> Result<RunId, NetrandError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r"
            INSERT INTO runs (
                recorded_at,
                batch_size,
                sequential_total_ms,
                concurrent_total_ms,
                concurrent_sequential_ratio)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(result.batch_size as i64)
        .bind(result.sequential_total_ms)
        .bind(result.concurrent_total_ms)
        .bind(result.ratio())
        .execute(&mut *tx)
        .await?;
        let run_id = inserted.last_insert_rowid();

        for (call_number, timing_ms) in result.sequential_durations_ms.iter().copied().enumerate() {
            sqlx::query(
                "INSERT INTO sequential_timings (run, call_number, timing_ms) VALUES (?, ?, ?)",
            )
            .bind(run_id)
            .bind(call_number as i64)
            .bind(timing_ms)
            .execute(&mut *tx)
            .await?;
        }

        for (channel_position, timing_ms) in result.concurrent_durations_ms.iter().copied().enumerate() {
            sqlx::query(
                "INSERT INTO concurrent_timings (run, channel_position, timing_ms) VALUES (?, ?, ?)",
            )
            .bind(run_id)
            .bind(channel_position as i64)
            .bind(timing_ms)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(run_id, batch_size = result.batch_size, "Recorded run");
        Ok(run_id)
    }

    /// Most recent runs first.
    pub async fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>, NetrandError> {
        let rows = sqlx::query(
            r"
            SELECT run_id, recorded_at, batch_size, sequential_total_ms, concurrent_total_ms
            FROM runs
            ORDER BY run_id DESC
            LIMIT ?
            ",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    /// Rebuild a stored result, with each series in its recorded position order.
    pub async fn load_run(&self, run_id: RunId) -> Result<Option<TimingResult>, NetrandError> {
        let Some(row) = sqlx::query(
            "SELECT batch_size, sequential_total_ms, concurrent_total_ms FROM runs WHERE run_id = ?",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let sequential_durations_ms: Vec<i64> = sqlx::query_scalar(
            "SELECT timing_ms FROM sequential_timings WHERE run = ? ORDER BY call_number",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        let concurrent_durations_ms: Vec<i64> = sqlx::query_scalar(
            "SELECT timing_ms FROM concurrent_timings WHERE run = ? ORDER BY channel_position",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        let batch_size: i64 = row.try_get("batch_size")?;
        Ok(Some(TimingResult {
            batch_size: usize::try_from(batch_size).map_err(|_| NetrandError::CorruptRun {
                run_id,
                detail: format!("negative batch size {}", batch_size),
            })?,
            concurrent_durations_ms,
            concurrent_total_ms: row.try_get("concurrent_total_ms")?,
            sequential_durations_ms,
            sequential_total_ms: row.try_get("sequential_total_ms")?,
        }))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn summary_from_row(row: &SqliteRow) -> Result<RunSummary, NetrandError> {
    let run_id: i64 = row.try_get("run_id")?;
    let recorded_at: String = row.try_get("recorded_at")?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| NetrandError::CorruptRun {
            run_id,
            detail: format!("invalid recorded_at '{}': {}", recorded_at, e),
        })?;
    let batch_size: i64 = row.try_get("batch_size")?;
    let sequential_total_ms: i64 = row.try_get("sequential_total_ms")?;
    let concurrent_total_ms: i64 = row.try_get("concurrent_total_ms")?;

    Ok(RunSummary {
        run_id,
        recorded_at,
        batch_size: usize::try_from(batch_size).map_err(|_| NetrandError::CorruptRun {
            run_id,
            detail: format!("negative batch size {}", batch_size),
        })?,
        sequential_total_ms,
        concurrent_total_ms,
        ratio: concurrent_sequential_ratio(concurrent_total_ms, sequential_total_ms),
    })
}

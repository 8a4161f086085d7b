use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use netrand::config::{Config, OnError};
use netrand::engine::TimingEngine;
use netrand::fetch::HttpFetcher;
use netrand::recorder::RunRecorder;
use netrand::report;
use netrand::sweep::{self, SweepPlan};

#[derive(Parser)]
#[command(
    name = "netrand",
    version,
    about = "Compare sequential and batch-concurrent HTTP GET latency"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// TOML config file (defaults to <config dir>/netrand/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target URL for every GET
    #[arg(long, global = true)]
    url: Option<String>,

    /// Requests per phase
    #[arg(long, global = true)]
    trials: Option<usize>,

    /// Per-request timeout in milliseconds (no timeout when omitted)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[arg(long, global = true)]
    json: bool,

    /// Measure and print without writing to the database
    #[arg(long, global = true)]
    no_record: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Time every batch size in a range, several times each (the default)
    Sweep {
        #[arg(long)]
        min_batch: Option<usize>,

        #[arg(long)]
        max_batch: Option<usize>,

        #[arg(long)]
        repeats: Option<usize>,

        /// Skip data points whose requests fail instead of stopping
        #[arg(long)]
        skip_failures: bool,
    },
    /// Time a single batch size once
    Run {
        #[arg(short, long)]
        batch: usize,
    },
    /// Show recorded runs, newest first
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(url) = &cli.url {
        config.target.url = url.clone();
    }
    if let Some(trials) = cli.trials {
        config.target.trials = trials;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.target.request_timeout_ms = Some(timeout_ms);
    }
    if let Some(db) = &cli.db {
        config.storage.database = Some(db.clone());
    }
    if let Some(Command::Sweep {
        min_batch,
        max_batch,
        repeats,
        skip_failures,
    }) = &cli.command
    {
        if let Some(min_batch) = min_batch {
            config.sweep.min_batch = *min_batch;
        }
        if let Some(max_batch) = max_batch {
            config.sweep.max_batch = *max_batch;
        }
        if let Some(repeats) = repeats {
            config.sweep.repeats = *repeats;
        }
        if *skip_failures {
            config.sweep.on_error = OnError::Skip;
        }
    }
}

fn build_engine(config: &Config) -> Result<TimingEngine> {
    let fetcher = HttpFetcher::new(config.target.request_timeout())?;
    Ok(TimingEngine::new(Arc::new(fetcher)))
}

async fn open_recorder(cli: &Cli, config: &Config) -> Result<Option<RunRecorder>> {
    if cli.no_record {
        return Ok(None);
    }
    Ok(Some(RunRecorder::open(&config.database_path()).await?))
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    apply_overrides(&cli, &mut config);

    match &cli.command {
        None | Some(Command::Sweep { .. }) => {
            config.validate()?;
            let engine = build_engine(&config)?;
            let recorder = open_recorder(&cli, &config).await?;

            let outcome = sweep::run_sweep(
                &engine,
                recorder.as_ref(),
                &config.target.url,
                config.target.trials,
                &SweepPlan::from(&config.sweep),
            )
            .await?;

            if cli.json {
                println!("{}", report::format_results_json(&outcome.runs));
            } else {
                print!("{}", report::format_results(&outcome.runs));
                if outcome.skipped > 0 {
                    println!("\n{} data point(s) skipped after request failures", outcome.skipped);
                }
            }
        }
        Some(Command::Run { batch }) => {
            config.validate_target()?;
            if *batch == 0 {
                return Err(netrand::errors::NetrandError::InvalidBatchSize.into());
            }
            let engine = build_engine(&config)?;
            let recorder = open_recorder(&cli, &config).await?;

            let run = sweep::run_once(
                &engine,
                recorder.as_ref(),
                &config.target.url,
                config.target.trials,
                *batch,
            )
            .await?;

            let runs = [run];
            if cli.json {
                println!("{}", report::format_results_json(&runs));
            } else {
                print!("{}", report::format_results(&runs));
            }
        }
        Some(Command::History { limit }) => {
            let recorder = RunRecorder::open(&config.database_path()).await?;
            let runs = recorder.list_runs(*limit).await?;
            if cli.json {
                println!("{}", report::format_history_json(&runs));
            } else {
                print!("{}", report::format_history(&runs, Utc::now()));
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    Registry::default()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("INFO")))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{}", err);
        process::exit(1);
    }
}

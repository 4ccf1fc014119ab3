//! pg-migration-runner CLI
//!
//! Entry point for the migration step binary.
//!
//! Exit codes:
//! - 0: All pending migrations applied (or nothing to do)
//! - 1: Migration run failed (failure already reported to the orchestrator)
//! - 2: Tool error (config error, bad event, I/O error, etc.)

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

use pg_migration_runner::credentials::{EnvSecretSource, FileSecretSource, SecretSource};
use pg_migration_runner::engine::{ExecutorKind, Ledger};
use pg_migration_runner::report::LogReporter;
use pg_migration_runner::runner::BackendExecutorFactory;
use pg_migration_runner::store::FsObjectStore;
use pg_migration_runner::{Config, JobEvent, Runner};

/// Default config file name used when --config is not explicitly provided.
const DEFAULT_CONFIG_FILE: &str = "pg-migration-runner.toml";

#[derive(Parser, Debug)]
#[command(name = "pg-migration-runner")]
#[command(about = "Pipeline-invoked migration runner for PostgreSQL", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the JSON job event (reads stdin when omitted)
    #[arg(long)]
    event: Option<PathBuf>,

    /// Secret identifier for the database credentials
    #[arg(long, env = "DB_CREDENTIALS_SECRET_ARN")]
    secret_id: String,

    /// Where the secret id resolves: "file" (path) or "env" (variable name)
    #[arg(long, default_value = "file")]
    secret_source: String,

    /// Override the configured execution backend (direct, flyway)
    #[arg(long)]
    backend: Option<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(run_failed) => {
            if run_failed {
                std::process::exit(1);
            }
            // exit 0 is implicit
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(2);
        }
    }
}

/// Run one migration step.
///
/// Returns `Ok(true)` if the migration run failed (the failure has already
/// been reported to the orchestrator), `Ok(false)` on success, or `Err` on
/// tool errors that prevented a run from starting.
fn run(args: Args) -> Result<bool> {
    let config = load_config(&args.config)?;

    let event = read_event(&args)?;

    let backend: ExecutorKind = args
        .backend
        .as_deref()
        .unwrap_or(&config.runner.backend)
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid backend, valid values: direct, flyway"))?;

    let ledger =
        Ledger::new(&config.runner.ledger_table).context("Invalid ledger table name")?;

    let secrets: Box<dyn SecretSource> = match args.secret_source.as_str() {
        "file" => Box::new(FileSecretSource),
        "env" => Box::new(EnvSecretSource),
        other => anyhow::bail!("invalid secret source '{}'. Valid values: file, env", other),
    };

    let runner = Runner::new(
        Box::new(FsObjectStore::new(config.store.root.clone())),
        secrets,
        Box::new(LogReporter),
        Box::new(BackendExecutorFactory::new(
            backend,
            ledger,
            config.flyway.binary_path.clone(),
        )),
        args.secret_id.clone(),
    );

    match runner.run(&event) {
        Ok(outcome) => {
            eprintln!(
                "pg-migration-runner: {} applied, {} skipped",
                outcome.applied, outcome.skipped
            );
            Ok(false)
        }
        Err(err) => {
            // Failure was already reported to the orchestrator; the non-zero
            // exit marks the invocation itself as failed.
            eprintln!("Migration run failed: {:#}", anyhow::Error::new(err));
            Ok(true)
        }
    }
}

/// Read the job event from the --event file, or from stdin when omitted.
fn read_event(args: &Args) -> Result<JobEvent> {
    let json = match &args.event {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read event from stdin")?;
            buffer
        }
    };

    JobEvent::from_json(&json).context("Failed to parse job event")
}

/// Load configuration from file.
///
/// If `config_path` is `Some`, the user explicitly passed `--config` and the
/// file must exist (error if not found). If `None`, the default config path
/// is used; a missing default config file is not an error (falls back to
/// defaults with a warning).
fn load_config(config_path: &Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => {
            // User explicitly provided --config; file must exist.
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::from_file(path).context("Failed to load configuration")
        }
        None => {
            // Using default config path; missing file is OK.
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                Config::from_file(&default_path).context("Failed to load configuration")
            } else {
                log::warn!(
                    "Config file {} not found, using defaults",
                    default_path.display()
                );
                Ok(Config::default())
            }
        }
    }
}

//! Run orchestration
//!
//! Wires one invocation end to end: fetch the bundle, stage and load the
//! scripts, obtain credentials, build an executor, apply, and report the
//! outcome. Every collaborator is injected, so the whole flow runs against
//! fakes in tests.

use std::path::PathBuf;

use thiserror::Error;

use crate::credentials::{CredentialError, Credentials, SecretSource};
use crate::engine::backend::BackendError;
use crate::engine::flyway::FlywayExecutor;
use crate::engine::{DirectExecutor, EngineError, Executor, ExecutorKind, Ledger, PgBackend, RunOutcome};
use crate::event::JobEvent;
use crate::input::LoadError;
use crate::input::archive::BundleStage;
use crate::input::sql::ScriptLoader;
use crate::report::OutcomeReporter;
use crate::store::ObjectStore;

/// Fatal failure of one run. `ReportError` is deliberately absent: a failed
/// notification is logged and swallowed, never escalated.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("migration bundle unavailable: {0}")]
    Bundle(#[from] LoadError),

    #[error("database credentials unavailable: {0}")]
    Credentials(#[from] CredentialError),

    #[error("database connection failed: {0}")]
    Connection(#[source] BackendError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Builds the executor for a run once credentials are known. Injected so
/// tests can substitute an executor that needs no database.
pub trait ExecutorFactory {
    fn create(&self, creds: &Credentials) -> Result<Box<dyn Executor>, RunError>;
}

/// Factory for the two real execution strategies.
pub struct BackendExecutorFactory {
    kind: ExecutorKind,
    ledger: Ledger,
    flyway_binary: PathBuf,
}

impl BackendExecutorFactory {
    pub fn new(kind: ExecutorKind, ledger: Ledger, flyway_binary: PathBuf) -> Self {
        Self {
            kind,
            ledger,
            flyway_binary,
        }
    }
}

impl ExecutorFactory for BackendExecutorFactory {
    fn create(&self, creds: &Credentials) -> Result<Box<dyn Executor>, RunError> {
        match self.kind {
            ExecutorKind::Direct => {
                let backend = PgBackend::connect(creds, self.ledger.clone())
                    .map_err(RunError::Connection)?;
                Ok(Box::new(DirectExecutor::new(backend)))
            }
            ExecutorKind::Flyway => {
                let executor = FlywayExecutor::new(&self.flyway_binary, creds.clone())?;
                Ok(Box::new(executor))
            }
        }
    }
}

/// One invocation's orchestrator.
///
/// Concurrent invocations against the same database are not coordinated
/// here (no advisory lock); the pipeline is expected to run one migration
/// step at a time.
pub struct Runner {
    store: Box<dyn ObjectStore>,
    secrets: Box<dyn SecretSource>,
    reporter: Box<dyn OutcomeReporter>,
    executors: Box<dyn ExecutorFactory>,
    secret_id: String,
}

impl Runner {
    pub fn new(
        store: Box<dyn ObjectStore>,
        secrets: Box<dyn SecretSource>,
        reporter: Box<dyn OutcomeReporter>,
        executors: Box<dyn ExecutorFactory>,
        secret_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            secrets,
            reporter,
            executors,
            secret_id: secret_id.into(),
        }
    }

    /// Execute the run and report its outcome to the orchestrator.
    ///
    /// The outcome is decided before reporting; a reporting failure is
    /// logged and the decided outcome returned unchanged. The caller is
    /// expected to propagate an `Err` as a non-zero exit so the hosting
    /// runtime records the invocation as failed too.
    pub fn run(&self, event: &JobEvent) -> Result<RunOutcome, RunError> {
        log::info!(
            "starting migration run for job {} (bundle {}/{})",
            event.job_id,
            event.bucket,
            event.key
        );

        let result = self.execute(event);

        let reported = match &result {
            Ok(outcome) => {
                log::info!(
                    "job {}: {} applied, {} skipped",
                    event.job_id,
                    outcome.applied,
                    outcome.skipped
                );
                self.reporter.report_success(&event.job_id)
            }
            Err(e) => self.reporter.report_failure(&event.job_id, &e.to_string()),
        };

        if let Err(e) = reported {
            log::warn!("outcome notification for job {} failed: {e}", event.job_id);
        }

        result
    }

    fn execute(&self, event: &JobEvent) -> Result<RunOutcome, RunError> {
        let bytes = self
            .store
            .fetch(&event.bucket, &event.key)
            .map_err(LoadError::Fetch)?;

        let stage = BundleStage::unpack(&bytes)?;
        let bundle = ScriptLoader::new().load_dir(stage.path())?;
        log::info!("bundle staged: {} migration script(s)", bundle.len());

        let secret = self.secrets.fetch(&self.secret_id)?;
        let creds = Credentials::from_secret_string(&secret)?;

        // The connection (for the direct backend) lives exactly as long as
        // the executor: acquired here, dropped when this scope ends, on both
        // paths.
        let mut executor = self.executors.create(&creds)?;
        let outcome = executor.apply(&bundle.scripts)?;
        Ok(outcome)
    }
}

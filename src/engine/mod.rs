//! Migration engine
//!
//! Applies exactly the scripts not yet recorded in the ledger, in
//! caller-supplied order, inside one transaction. Either every pending
//! script commits together with its ledger rows, or the whole run rolls
//! back and the database is untouched.
//!
//! Execution strategy is polymorphic behind [`Executor`]: the direct
//! executor drives a [`SqlBackend`] statement by statement, the flyway
//! executor delegates to the external Flyway CLI.

use std::time::Instant;

use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::input::MigrationScript;

pub mod backend;
pub mod flyway;
pub mod ledger;

pub use backend::{BackendError, PgBackend, SqlBackend};
pub use ledger::Ledger;

/// Which execution strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ExecutorKind {
    /// Execute scripts over a direct database connection.
    Direct,
    /// Shell out to the Flyway CLI.
    Flyway,
}

/// Definitive result of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOutcome {
    /// Scripts executed and recorded by this run.
    pub applied: usize,
    /// Scripts already present in the ledger and not re-executed.
    pub skipped: usize,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The ledger table could not be created or queried. No migrations were
    /// attempted.
    #[error("migration ledger unavailable: {0}")]
    LedgerUnavailable(#[source] BackendError),

    /// One script failed; the whole run was rolled back.
    #[error("migration {filename} failed: {source}")]
    ScriptFailed {
        filename: String,
        #[source]
        source: BackendError,
    },

    /// Connectivity failed mid-run (or the commit itself failed). Rollback
    /// was attempted but may not have reached the server; the run is failed
    /// either way and nothing from it is recorded.
    #[error("connection lost during migration run: {0}")]
    ConnectionLost(#[source] BackendError),

    /// The external migration tool reported failure.
    #[error("external migration tool failed: {0}")]
    ExternalTool(String),
}

/// One execution strategy for a run. Both variants honor the same contract:
/// apply the not-yet-applied scripts in the given order, at most once each,
/// atomically.
pub trait Executor {
    fn apply(&mut self, scripts: &[MigrationScript]) -> Result<RunOutcome, EngineError>;
}

/// Executes scripts over a [`SqlBackend`], owning the ledger bookkeeping and
/// the transaction boundary.
pub struct DirectExecutor<B: SqlBackend> {
    backend: B,
}

impl<B: SqlBackend> DirectExecutor<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Roll back after a failure; a rollback that itself fails only gets a
    /// warning, the run is already lost.
    fn rollback_best_effort(&mut self, cause: &str) {
        if let Err(e) = self.backend.rollback() {
            log::warn!("rollback after {cause} failed: {e}");
        }
    }
}

impl<B: SqlBackend> Executor for DirectExecutor<B> {
    fn apply(&mut self, scripts: &[MigrationScript]) -> Result<RunOutcome, EngineError> {
        self.backend
            .ensure_ledger()
            .map_err(EngineError::LedgerUnavailable)?;

        self.backend.begin().map_err(EngineError::ConnectionLost)?;

        let applied_set = match self.backend.list_applied() {
            Ok(set) => set,
            Err(e) => {
                self.rollback_best_effort("ledger query");
                return Err(EngineError::LedgerUnavailable(e));
            }
        };

        let mut outcome = RunOutcome::default();

        // Caller order is the apply order; never re-sort here.
        for script in scripts {
            if let Some(recorded) = applied_set.get(&script.filename) {
                if recorded != &script.checksum {
                    // Changed content for an applied migration is observed
                    // but not rejected; the checksum is audit metadata.
                    log::debug!(
                        "{} changed since it was applied (recorded {}, bundle {})",
                        script.filename,
                        recorded,
                        script.checksum
                    );
                }
                log::debug!("skipping already-applied migration {}", script.filename);
                outcome.skipped += 1;
                continue;
            }

            let started = Instant::now();
            if let Err(e) = self.backend.execute_script(&script.content) {
                self.rollback_best_effort(&script.filename);
                return Err(if e.is_connection_lost() {
                    EngineError::ConnectionLost(e)
                } else {
                    EngineError::ScriptFailed {
                        filename: script.filename.clone(),
                        source: e,
                    }
                });
            }
            let elapsed_ms = started.elapsed().as_millis() as i64;

            if let Err(e) =
                self.backend
                    .record(&script.filename, &script.checksum, Some(elapsed_ms))
            {
                self.rollback_best_effort(&script.filename);
                return Err(if e.is_connection_lost() {
                    EngineError::ConnectionLost(e)
                } else {
                    EngineError::ScriptFailed {
                        filename: script.filename.clone(),
                        source: e,
                    }
                });
            }

            log::info!("applied {} in {}ms", script.filename, elapsed_ms);
            outcome.applied += 1;
        }

        if let Err(e) = self.backend.commit() {
            // A failed commit ends the run like a lost connection: nothing
            // from it persists.
            self.rollback_best_effort("commit");
            return Err(EngineError::ConnectionLost(e));
        }

        log::info!(
            "migration run complete: {} applied, {} skipped",
            outcome.applied,
            outcome.skipped
        );
        Ok(outcome)
    }
}

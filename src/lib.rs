//! pg-migration-runner: Pipeline-invoked migration runner for PostgreSQL
//!
//! This library implements one deployment-pipeline step: fetch a zip bundle
//! of SQL migration files from object storage, obtain database credentials
//! from a secret store, apply the not-yet-applied migrations in order inside
//! a single transaction, record them in an in-database ledger, and notify
//! the orchestrator of the outcome.
//!
//! Execution is single-threaded and blocking: one connection, one
//! transaction, sequential scripts. Concurrent invocations against the same
//! database are not coordinated (no advisory lock); run one migration step
//! at a time.

pub mod config;
pub mod credentials;
pub mod engine;
pub mod event;
pub mod input;
pub mod report;
pub mod runner;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use credentials::Credentials;
pub use engine::{DirectExecutor, EngineError, Executor, ExecutorKind, Ledger, RunOutcome};
pub use event::JobEvent;
pub use input::{MigrationBundle, MigrationScript};
pub use runner::{RunError, Runner};

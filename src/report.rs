//! Outcome reporting
//!
//! Fire-and-forget notification of the orchestrator once a run's outcome is
//! decided. A reporter failure never changes the outcome; the runner logs it
//! and moves on. The pipeline adapter (CodePipeline's job result API or
//! compatible) implements [`OutcomeReporter`] outside this crate.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to report job outcome: {message}")]
pub struct ReportError {
    pub message: String,
}

/// Notify the orchestrator of a job's outcome.
pub trait OutcomeReporter {
    fn report_success(&self, job_id: &str) -> Result<(), ReportError>;

    fn report_failure(&self, job_id: &str, message: &str) -> Result<(), ReportError>;
}

/// Reporter that writes the outcome to the log. Used when no pipeline
/// adapter is wired in (local runs).
#[derive(Debug, Default)]
pub struct LogReporter;

impl OutcomeReporter for LogReporter {
    fn report_success(&self, job_id: &str) -> Result<(), ReportError> {
        log::info!("job {job_id}: success");
        Ok(())
    }

    fn report_failure(&self, job_id: &str, message: &str) -> Result<(), ReportError> {
        log::error!("job {job_id}: failure: {message}");
        Ok(())
    }
}

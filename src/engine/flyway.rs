//! Flyway execution backend
//!
//! Alternate [`Executor`] that delegates the whole apply to the Flyway CLI:
//! stages the scripts into a filesystem location, renders a `flyway.conf`
//! from the credentials, and runs `flyway migrate`. Flyway keeps its own
//! history table, so the crate's ledger is not consulted on this path.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::credentials::Credentials;
use crate::engine::{EngineError, Executor, RunOutcome};
use crate::input::MigrationScript;

/// Executor that shells out to the Flyway command-line tool.
pub struct FlywayExecutor {
    binary: PathBuf,
    creds: Credentials,
    workspace: TempDir,
}

impl FlywayExecutor {
    /// `binary` is the path to (or name of) the flyway executable. The
    /// executor stages its config and scripts in a temporary workspace that
    /// is removed on drop.
    pub fn new(binary: impl Into<PathBuf>, creds: Credentials) -> Result<Self, EngineError> {
        let workspace = TempDir::new().map_err(|e| {
            EngineError::ExternalTool(format!("failed to create flyway workspace: {e}"))
        })?;
        Ok(Self {
            binary: binary.into(),
            creds,
            workspace,
        })
    }
}

impl Executor for FlywayExecutor {
    fn apply(&mut self, scripts: &[MigrationScript]) -> Result<RunOutcome, EngineError> {
        let sql_dir = self.workspace.path().join("sql");
        std::fs::create_dir_all(&sql_dir).map_err(|e| {
            EngineError::ExternalTool(format!("failed to stage migration scripts: {e}"))
        })?;

        for script in scripts {
            std::fs::write(sql_dir.join(&script.filename), &script.content).map_err(|e| {
                EngineError::ExternalTool(format!("failed to stage {}: {e}", script.filename))
            })?;
        }

        let conf_path = self.workspace.path().join("flyway.conf");
        std::fs::write(&conf_path, render_conf(&self.creds, &sql_dir)).map_err(|e| {
            EngineError::ExternalTool(format!("failed to write flyway.conf: {e}"))
        })?;

        log::info!("starting flyway migration for {} script(s)", scripts.len());
        let output = Command::new(&self.binary)
            .arg("migrate")
            .arg(format!("-configFiles={}", conf_path.display()))
            .output()
            .map_err(|e| {
                EngineError::ExternalTool(format!(
                    "failed to execute {}: {e}",
                    self.binary.display()
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::info!("flyway stdout: {}", stdout.trim_end());
        if !stderr.is_empty() {
            log::warn!("flyway stderr: {}", stderr.trim_end());
        }

        if !output.status.success() {
            return Err(EngineError::ExternalTool(format!(
                "flyway migrate exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        // Flyway owns its own bookkeeping; the applied count is scraped from
        // its summary line when present.
        let applied = parse_applied_count(&stdout).unwrap_or(0);
        Ok(RunOutcome {
            applied,
            skipped: scripts.len().saturating_sub(applied),
        })
    }
}

/// Render a flyway.conf matching the pipeline's settings: retry the initial
/// connection, validate recorded checksums, baseline pre-existing databases.
fn render_conf(creds: &Credentials, sql_dir: &Path) -> String {
    format!(
        "flyway.url=jdbc:postgresql://{}:{}/{}\n\
         flyway.user={}\n\
         flyway.password={}\n\
         flyway.connectRetries=3\n\
         flyway.validateOnMigrate=true\n\
         flyway.baselineOnMigrate=true\n\
         flyway.locations=filesystem:{}\n",
        creds.host,
        creds.port,
        creds.dbname,
        creds.username,
        creds.password,
        sql_dir.display()
    )
}

/// Extract N from Flyway's "Successfully applied N migration(s) ..." line.
fn parse_applied_count(stdout: &str) -> Option<usize> {
    for line in stdout.lines() {
        if let Some(rest) = line.trim().strip_prefix("Successfully applied ") {
            let count = rest.split_whitespace().next()?;
            return count.parse().ok();
        }
    }
    None
}

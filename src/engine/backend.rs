//! SQL backend seam
//!
//! [`SqlBackend`] is the narrow surface the direct executor drives: ledger
//! bookkeeping plus transaction control. `PgBackend` implements it over a
//! live `postgres::Client`; engine tests implement it in memory.

use std::collections::HashMap;

use thiserror::Error;

use crate::credentials::Credentials;
use crate::engine::ledger::Ledger;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Db(postgres::Error),

    #[error("connection lost: {message}")]
    ConnectionLost {
        message: String,
        #[source]
        source: Option<postgres::Error>,
    },

    #[error("{0}")]
    Failed(String),
}

impl From<postgres::Error> for BackendError {
    fn from(e: postgres::Error) -> Self {
        if e.is_closed() {
            let message = e.to_string();
            Self::ConnectionLost {
                message,
                source: Some(e),
            }
        } else {
            Self::Db(e)
        }
    }
}

impl BackendError {
    /// Mid-run connectivity loss gets its own engine error variant; rollback
    /// may not be possible for it.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. })
    }
}

/// Database operations the direct executor needs, in the order the apply
/// loop issues them. One transaction at a time; `begin` before
/// `execute_script`/`record`, then exactly one of `commit` or `rollback`.
pub trait SqlBackend {
    /// Create the ledger table if absent. Runs outside the transaction and
    /// must be idempotent.
    fn ensure_ledger(&mut self) -> Result<(), BackendError>;

    fn begin(&mut self) -> Result<(), BackendError>;

    /// All recorded filenames with their checksums.
    fn list_applied(&mut self) -> Result<HashMap<String, String>, BackendError>;

    /// Execute one script's raw content, one or more statements.
    fn execute_script(&mut self, sql: &str) -> Result<(), BackendError>;

    /// Insert one ledger row. Fails on a duplicate filename.
    fn record(
        &mut self,
        filename: &str,
        checksum: &str,
        execution_ms: Option<i64>,
    ) -> Result<(), BackendError>;

    fn commit(&mut self) -> Result<(), BackendError>;

    fn rollback(&mut self) -> Result<(), BackendError>;
}

/// Backend over a live PostgreSQL connection.
///
/// Transaction control uses explicit `BEGIN`/`COMMIT`/`ROLLBACK` statements
/// so that one `&mut Client` serves the whole run.
pub struct PgBackend {
    client: postgres::Client,
    ledger: Ledger,
}

impl PgBackend {
    /// Connect to the database described by the credentials.
    pub fn connect(creds: &Credentials, ledger: Ledger) -> Result<Self, BackendError> {
        log::info!(
            "connecting to {}:{}/{} as {}",
            creds.host,
            creds.port,
            creds.dbname,
            creds.username
        );
        let client = postgres::Config::new()
            .host(&creds.host)
            .port(creds.port)
            .dbname(&creds.dbname)
            .user(&creds.username)
            .password(&creds.password)
            .connect(postgres::NoTls)?;
        Ok(Self { client, ledger })
    }

    /// Wrap an already-open client (tests, pooled connections).
    pub fn new(client: postgres::Client, ledger: Ledger) -> Self {
        Self { client, ledger }
    }
}

impl SqlBackend for PgBackend {
    fn ensure_ledger(&mut self) -> Result<(), BackendError> {
        self.client
            .batch_execute(&self.ledger.create_table_sql())?;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        self.client.batch_execute("BEGIN")?;
        Ok(())
    }

    fn list_applied(&mut self) -> Result<HashMap<String, String>, BackendError> {
        let sql = self.ledger.list_applied_sql();
        let rows = self.client.query(sql.as_str(), &[])?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get(0), row.get(1)))
            .collect())
    }

    fn execute_script(&mut self, sql: &str) -> Result<(), BackendError> {
        self.client.batch_execute(sql)?;
        Ok(())
    }

    fn record(
        &mut self,
        filename: &str,
        checksum: &str,
        execution_ms: Option<i64>,
    ) -> Result<(), BackendError> {
        let sql = self.ledger.record_sql();
        self.client
            .execute(sql.as_str(), &[&filename, &checksum, &execution_ms])?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.client.batch_execute("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.client.batch_execute("ROLLBACK")?;
        Ok(())
    }
}

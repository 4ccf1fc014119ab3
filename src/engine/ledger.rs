//! Migration ledger SQL
//!
//! The ledger is the in-database record of applied migrations. It lives in
//! the target database itself so ledger state and schema state commit or
//! roll back together. Rows are inserted exactly once per filename and never
//! updated or deleted.

use thiserror::Error;

/// Default ledger table name.
pub const DEFAULT_TABLE: &str = "schema_migrations";

#[derive(Debug, Error)]
#[error("invalid ledger table name '{0}': must be a bare SQL identifier")]
pub struct InvalidTableName(pub String);

/// SQL builder for a ledger table with a validated name.
///
/// The table name is interpolated into DDL and queries, so construction
/// rejects anything that is not a bare identifier.
#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
}

impl Ledger {
    pub fn new(table: &str) -> Result<Self, InvalidTableName> {
        if !is_valid_identifier(table) {
            return Err(InvalidTableName(table.to_string()));
        }
        Ok(Self {
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Idempotent DDL: safe to run on every invocation, never alters an
    /// existing table.
    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} ( \
             filename text PRIMARY KEY, \
             applied_at timestamptz NOT NULL DEFAULT now(), \
             checksum text NOT NULL, \
             execution_time bigint )",
            self.table
        )
    }

    pub fn list_applied_sql(&self) -> String {
        format!("SELECT filename, checksum FROM {}", self.table)
    }

    /// Parameterized insert: $1 filename, $2 checksum, $3 execution time in
    /// milliseconds (nullable). A duplicate filename violates the primary
    /// key; the engine's skip logic makes that unreachable, and the
    /// constraint is the backstop.
    pub fn record_sql(&self) -> String {
        format!(
            "INSERT INTO {} (filename, checksum, execution_time) VALUES ($1, $2, $3)",
            self.table
        )
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

/// A bare SQL identifier: leading letter or underscore, then letters,
/// digits, underscores. No quoting, no schema qualification.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

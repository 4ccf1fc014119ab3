//! Database credential retrieval
//!
//! Credentials arrive as a JSON secret (`host`, `port`, `dbname`, `username`,
//! `password`). The [`SecretSource`] trait keeps the secret store injectable;
//! the bundled implementations read a file or an environment variable, and a
//! vault adapter (Secrets Manager or compatible) implements the same trait
//! outside this crate.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read secret {secret_id}: {message}")]
    Fetch { secret_id: String, message: String },

    #[error("secret is not valid credential JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Connection parameters for the target database.
///
/// The password is deliberately excluded from `Debug` output.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub host: String,
    #[serde(deserialize_with = "port_from_string_or_number")]
    pub port: u16,
    pub dbname: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Parse a secret string as credential JSON.
    pub fn from_secret_string(secret: &str) -> Result<Self, CredentialError> {
        Ok(serde_json::from_str(secret)?)
    }
}

/// Secret stores commonly hold the port as a string; accept both forms.
fn port_from_string_or_number<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => Ok(n),
        PortValue::Text(s) => s.parse::<u16>().map_err(serde::de::Error::custom),
    }
}

/// Fetch a raw secret string by identifier.
pub trait SecretSource {
    fn fetch(&self, secret_id: &str) -> Result<String, CredentialError>;
}

/// Reads the secret from a file; the secret id is the path.
#[derive(Debug, Default)]
pub struct FileSecretSource;

impl SecretSource for FileSecretSource {
    fn fetch(&self, secret_id: &str) -> Result<String, CredentialError> {
        std::fs::read_to_string(secret_id).map_err(|e| CredentialError::Fetch {
            secret_id: secret_id.to_string(),
            message: e.to_string(),
        })
    }
}

/// Reads the secret from an environment variable; the secret id is the
/// variable name.
#[derive(Debug, Default)]
pub struct EnvSecretSource;

impl SecretSource for EnvSecretSource {
    fn fetch(&self, secret_id: &str) -> Result<String, CredentialError> {
        std::env::var(secret_id).map_err(|e| CredentialError::Fetch {
            secret_id: secret_id.to_string(),
            message: e.to_string(),
        })
    }
}

//! Migration bundle loading
//!
//! Turns a fetched pipeline artifact into an ordered, deduplicated sequence
//! of SQL scripts ready for the engine.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

pub mod archive;
pub mod sql;

/// One unit of schema change: a named SQL file from the bundle.
///
/// The content is opaque to the engine; the checksum is change-detection
/// metadata recorded in the ledger, not an integrity guarantee.
#[derive(Debug, Clone)]
pub struct MigrationScript {
    /// Unique identifier within a run. Version-prefixed by convention
    /// (e.g. `V001__create_users.sql`).
    pub filename: String,

    /// Raw SQL text, executed verbatim.
    pub content: String,

    /// SHA-256 of the content, lowercase hex.
    pub checksum: String,
}

impl MigrationScript {
    /// Create a script, computing its checksum from the content.
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let checksum = checksum(&content);
        Self {
            filename: filename.into(),
            content,
            checksum,
        }
    }
}

/// The ordered script sequence for one run.
///
/// Order is established here, at load time; the engine applies scripts in
/// exactly this order and never re-sorts.
#[derive(Debug, Default)]
pub struct MigrationBundle {
    pub scripts: Vec<MigrationScript>,
}

impl MigrationBundle {
    /// Build a bundle from raw scripts: deduplicate by filename (first
    /// occurrence wins, later duplicates are dropped with a warning), then
    /// sort lexicographically by filename.
    ///
    /// Duplicates are possible when an archive stages the same filename from
    /// more than one nested path. They are a skip, never an error.
    pub fn from_scripts(scripts: Vec<MigrationScript>) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut scripts: Vec<MigrationScript> = scripts
            .into_iter()
            .filter(|s| {
                let keep = seen.insert(s.filename.clone());
                if !keep {
                    log::warn!(
                        "duplicate migration filename {}, keeping first occurrence",
                        s.filename
                    );
                }
                keep
            })
            .collect();

        scripts.sort_by(|a, b| a.filename.cmp(&b.filename));
        Self { scripts }
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// SHA-256 digest of script content as lowercase hex.
pub fn checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Fetch failed: {0}")]
    Fetch(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_checksum_is_hex_sha256() {
        let sum = checksum("CREATE TABLE t (id int);");
        assert_eq!(sum.len(), 64);
        assert!(sum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_checksum_differs_for_different_content() {
        assert_ne!(checksum("SELECT 1;"), checksum("SELECT 2;"));
    }

    #[test]
    fn test_script_new_computes_checksum() {
        let script = MigrationScript::new("V001__init.sql", "CREATE TABLE a (id int);");
        assert_eq!(script.checksum, checksum("CREATE TABLE a (id int);"));
    }

    #[test]
    fn test_from_scripts_sorts_by_filename() {
        let bundle = MigrationBundle::from_scripts(vec![
            MigrationScript::new("V002__b.sql", "b"),
            MigrationScript::new("V001__a.sql", "a"),
            MigrationScript::new("V003__c.sql", "c"),
        ]);
        let names: Vec<&str> = bundle.scripts.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["V001__a.sql", "V002__b.sql", "V003__c.sql"]);
    }

    #[test]
    fn test_from_scripts_dedup_first_occurrence_wins() {
        let bundle = MigrationBundle::from_scripts(vec![
            MigrationScript::new("V001__a.sql", "first"),
            MigrationScript::new("V001__a.sql", "second"),
        ]);
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.scripts[0].content, "first");
    }

    #[test]
    fn test_from_scripts_empty() {
        let bundle = MigrationBundle::from_scripts(vec![]);
        assert!(bundle.is_empty());
    }

    proptest! {
        #[test]
        fn prop_checksum_deterministic(content in ".*") {
            prop_assert_eq!(checksum(&content), checksum(&content));
        }

        #[test]
        fn prop_from_scripts_unique_and_sorted(
            names in proptest::collection::vec("[a-z]{1,4}\\.sql", 0..12)
        ) {
            let scripts: Vec<MigrationScript> = names
                .iter()
                .enumerate()
                .map(|(i, n)| MigrationScript::new(n.clone(), format!("-- {i}")))
                .collect();
            let bundle = MigrationBundle::from_scripts(scripts);

            let filenames: Vec<&String> =
                bundle.scripts.iter().map(|s| &s.filename).collect();
            let unique: std::collections::HashSet<&String> =
                filenames.iter().copied().collect();
            prop_assert_eq!(unique.len(), filenames.len());

            let mut sorted = filenames.clone();
            sorted.sort();
            prop_assert_eq!(sorted, filenames);

            // First occurrence wins: each surviving script carries the
            // content of the earliest input with that filename.
            for script in &bundle.scripts {
                let first_idx = names.iter().position(|n| n == &script.filename).unwrap();
                prop_assert_eq!(&script.content, &format!("-- {first_idx}"));
            }
        }
    }
}

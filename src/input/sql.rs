//! SQL file loading
//!
//! Reads `.sql` migration files from a staging directory, computes their
//! checksums, and returns a `MigrationBundle` in the order the engine will
//! apply them.

use crate::input::{LoadError, MigrationBundle, MigrationScript};
use std::path::{Path, PathBuf};

/// Loader for plain SQL migration files.
///
/// Collects `.sql` files from a staging directory. Ordering and
/// deduplication are handled by [`MigrationBundle::from_scripts`].
#[derive(Debug, Default)]
pub struct ScriptLoader;

impl ScriptLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load scripts from a directory.
    ///
    /// All `.sql` files directly within the directory are read and ordered
    /// lexicographically by filename via [`MigrationBundle::from_scripts`].
    /// Non-SQL files are ignored. A missing directory is an error; an empty
    /// one is not.
    pub fn load_dir(&self, dir: &Path) -> Result<MigrationBundle, LoadError> {
        let sql_files = collect_sql_files(dir)?;

        let mut scripts = Vec::new();
        for file in &sql_files {
            let filename = file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| file.to_string_lossy().to_string());

            let content = std::fs::read_to_string(file).map_err(|e| LoadError::Io {
                path: file.clone(),
                source: e,
            })?;

            scripts.push(MigrationScript::new(filename, content));
        }

        Ok(MigrationBundle::from_scripts(scripts))
    }
}

/// Collect all `.sql` files from a directory (non-recursive; the archive
/// stage flattens nested paths before we get here).
fn collect_sql_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LoadError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files: Vec<PathBuf> = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| LoadError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        if path.is_file() && is_sql_file(&path) {
            files.push(path);
        }
    }

    Ok(files)
}

/// Check if a path has a `.sql` extension.
pub(crate) fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("sql"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_sql_file() {
        assert!(is_sql_file(Path::new("V001__create_table.sql")));
        assert!(is_sql_file(Path::new("V001__create_table.SQL")));
        assert!(is_sql_file(Path::new("/path/to/migration.sql")));
        assert!(!is_sql_file(Path::new("manifest.json")));
        assert!(!is_sql_file(Path::new("readme.md")));
        assert!(!is_sql_file(Path::new("noext")));
    }

    #[test]
    fn test_load_dir_sorted_lexicographically() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        // Create files in non-alphabetical order
        fs::write(
            dir.path().join("V002__add_index.sql"),
            "CREATE INDEX idx ON users (name);",
        )
        .expect("write");
        fs::write(
            dir.path().join("V001__create_table.sql"),
            "CREATE TABLE users (id int, name text);",
        )
        .expect("write");
        fs::write(
            dir.path().join("V003__alter.sql"),
            "ALTER TABLE users ADD COLUMN email text;",
        )
        .expect("write");

        let bundle = ScriptLoader::new()
            .load_dir(dir.path())
            .expect("Failed to load scripts");

        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.scripts[0].filename, "V001__create_table.sql");
        assert_eq!(bundle.scripts[1].filename, "V002__add_index.sql");
        assert_eq!(bundle.scripts[2].filename, "V003__alter.sql");
    }

    #[test]
    fn test_load_dir_ignores_non_sql() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("V001__init.sql"), "SELECT 1;").expect("write");
        fs::write(dir.path().join("manifest.json"), "{}").expect("write");
        fs::write(dir.path().join("README.md"), "# Migrations").expect("write");

        let bundle = ScriptLoader::new()
            .load_dir(dir.path())
            .expect("Failed to load scripts");

        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.scripts[0].filename, "V001__init.sql");
    }

    #[test]
    fn test_load_dir_empty_is_ok() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bundle = ScriptLoader::new()
            .load_dir(dir.path())
            .expect("Empty directory should load");
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_load_dir_nonexistent_is_error() {
        let result = ScriptLoader::new().load_dir(Path::new("/nonexistent/migrations"));
        assert!(result.is_err());
        match result {
            Err(LoadError::Io { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/migrations"));
            }
            other => panic!("Expected LoadError::Io, got: {:?}", other),
        }
    }

    #[test]
    fn test_load_dir_computes_checksums() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("V001__init.sql"), "CREATE TABLE a (id int);").expect("write");

        let bundle = ScriptLoader::new()
            .load_dir(dir.path())
            .expect("Failed to load scripts");

        assert_eq!(
            bundle.scripts[0].checksum,
            crate::input::checksum("CREATE TABLE a (id int);")
        );
    }

    #[test]
    fn test_case_insensitive_extension_loads() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("V001__init.SQL"), "SELECT 1;").expect("write");

        let bundle = ScriptLoader::new()
            .load_dir(dir.path())
            .expect("Failed to load scripts");
        assert_eq!(bundle.len(), 1);
    }
}

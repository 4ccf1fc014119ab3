//! Bundle archive staging
//!
//! Unpacks the fetched zip artifact into a scoped temporary directory from
//! which the script loader reads the run's migrations. Nested archive paths
//! are flattened to bare filenames, matching how the pipeline packages
//! migration directories.

use std::io::{Cursor, Read};
use std::path::Path;

use tempfile::TempDir;
use zip::ZipArchive;

use crate::input::sql::is_sql_file;
use crate::input::{LoadError, MigrationBundle, MigrationScript};

/// A staged migration bundle: the archive's SQL scripts written into a
/// temporary directory. The directory is removed when the stage is dropped,
/// on every exit path.
#[derive(Debug)]
pub struct BundleStage {
    dir: TempDir,
}

impl BundleStage {
    /// Unpack a zip archive from memory.
    ///
    /// Every `.sql` entry is extracted, keyed by its bare filename regardless
    /// of nesting; everything else is silently ignored. Duplicate filenames
    /// keep the first occurrence (archive entry order). A bundle with no SQL
    /// entries stages an empty directory, which is not an error.
    pub fn unpack(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| LoadError::Archive {
            message: format!("not a readable zip archive: {e}"),
        })?;

        let mut scripts = Vec::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| LoadError::Archive {
                message: format!("failed to read archive entry {i}: {e}"),
            })?;

            if entry.is_dir() {
                continue;
            }

            let Some(name) = entry.enclosed_name() else {
                log::warn!("skipping archive entry with unsafe path: {}", entry.name());
                continue;
            };

            if !is_sql_file(&name) {
                continue;
            }

            let Some(filename) = name.file_name().map(|f| f.to_string_lossy().to_string())
            else {
                continue;
            };

            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| LoadError::Archive {
                    message: format!("failed to extract {filename}: {e}"),
                })?;

            log::info!("found migration in bundle: {filename}");
            scripts.push(MigrationScript::new(filename, content));
        }

        // Dedup before writing: a later duplicate must not overwrite the
        // first occurrence on disk.
        let bundle = MigrationBundle::from_scripts(scripts);

        let dir = TempDir::new().map_err(|e| LoadError::Archive {
            message: format!("failed to create staging directory: {e}"),
        })?;

        for script in &bundle.scripts {
            let path = dir.path().join(&script.filename);
            std::fs::write(&path, &script.content).map_err(|e| LoadError::Io {
                path,
                source: e,
            })?;
        }

        Ok(Self { dir })
    }

    /// Filesystem location of the staged scripts.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

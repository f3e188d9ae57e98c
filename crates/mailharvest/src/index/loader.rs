//! Rebuilds the processed-id set from record files on disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::error::StorageError;

use super::ProcessedRecord;

/// Scans every `*.json` file directly inside a storage directory.
pub struct RecordLoader {
    directory: PathBuf,
}

impl RecordLoader {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Lists record files. A missing directory yields an empty list.
    pub fn record_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        if !self.directory.exists() {
            warn!(
                "Storage directory does not exist yet: {}",
                self.directory.display()
            );
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(StorageError::ReadDirectory {
                        path: self.directory.clone(),
                        source: e.into(),
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", self.directory.display(), e);
                    continue;
                }
            };

            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().and_then(|e| e.to_str()) == Some("json")
            {
                files.push(path.to_path_buf());
            }
        }

        debug!(
            "Found {} record files in {}",
            files.len(),
            self.directory.display()
        );
        Ok(files)
    }

    /// Collects every id found in every record file.
    ///
    /// Unreadable files and malformed lines are logged and skipped.
    pub fn load_ids(&self) -> Result<HashSet<String>, StorageError> {
        let files = self.record_files()?;
        let mut all_ids = HashSet::new();

        for file in &files {
            match std::fs::read(file) {
                Ok(content) => {
                    let name = file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    all_ids.extend(ids_from_lines(content.split(|b| *b == b'\n'), &name));
                }
                Err(e) => {
                    error!("Failed to read record file {}: {}", file.display(), e);
                }
            }
        }

        info!(
            "Extracted {} processed ids from {} files",
            all_ids.len(),
            files.len()
        );
        Ok(all_ids)
    }
}

/// Parses one JSON object per line and keeps the `id` of each.
///
/// Lines are raw bytes so a torn or non-UTF-8 line only costs itself.
pub fn ids_from_lines<'a, I>(lines: I, source_name: &str) -> HashSet<String>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut ids = HashSet::new();

    for (number, line) in lines.into_iter().enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<ProcessedRecord>(line) {
            Ok(record) => {
                ids.insert(record.id);
            }
            Err(e) => {
                warn!(
                    "Skipping malformed line {} in {}: {}",
                    number + 1,
                    source_name,
                    e
                );
            }
        }
    }

    debug!("Extracted {} ids from {}", ids.len(), source_name);
    ids
}

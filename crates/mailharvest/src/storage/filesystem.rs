use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::error::StorageError;

use super::naming::{Clock, RecordFileNaming, SystemClock};

/// Creates `path` and its parents if missing.
pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!("Created directory: {}", path.display());
    }
    Ok(())
}

/// Appends `line` plus a newline to `path`, creating the file if needed.
///
/// Callers serialize access; this does no locking of its own.
pub fn append_line(path: &Path, line: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let write_err = |e| StorageError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;

    file.write_all(format!("{}\n", line).as_bytes())
        .map_err(write_err)?;
    file.flush().map_err(write_err)?;
    Ok(())
}

/// Destination for converted message records.
pub trait RecordSink: Send + Sync {
    /// Durably appends one record and returns where it was written.
    fn append(&self, record: &str) -> Result<PathBuf, StorageError>;
}

/// Appends records to one JSON-lines file per day.
pub struct RotatingRecordStore {
    directory: PathBuf,
    naming: RecordFileNaming,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl RotatingRecordStore {
    pub fn new<P: AsRef<Path>>(directory: P, naming: RecordFileNaming) -> Self {
        Self::with_clock(directory, naming, Arc::new(SystemClock))
    }

    pub fn with_clock<P: AsRef<Path>>(
        directory: P,
        naming: RecordFileNaming,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            naming,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file records go to today.
    pub fn current_path(&self) -> PathBuf {
        self.directory
            .join(self.naming.file_name_for(self.clock.today()))
    }
}

impl RecordSink for RotatingRecordStore {
    fn append(&self, record: &str) -> Result<PathBuf, StorageError> {
        if record.trim().is_empty() {
            return Err(StorageError::EmptyRecord);
        }

        let path = self.current_path();
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| {
            log::warn!("Record store write lock was poisoned, recovering");
            poisoned.into_inner()
        });

        let existed = path.exists();
        append_line(&path, record)?;

        debug!(
            "Record {} in {} ({} bytes)",
            if existed { "appended" } else { "created" },
            path.display(),
            record.len()
        );
        Ok(path)
    }
}

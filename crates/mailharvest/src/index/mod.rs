//! Persistent deduplication index of processed message ids.
//!
//! The in-memory [`ProcessedIdSet`] is seeded lazily from every record file in
//! the storage directory and appended to for the lifetime of the process.
//! New ids are also appended to `processed_ids.json` so the next start sees
//! them.

pub mod loader;
pub mod set;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::StorageError;
use crate::storage::append_line;

pub use loader::{ids_from_lines, RecordLoader};
pub use set::{LoadState, ProcessedIdSet};

/// File that receives one line per newly processed id.
pub const PROCESSED_RECORD_FILE: &str = "processed_ids.json";

/// Durable marker that a message completed the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub id: String,
}

/// Serialized appender for [`ProcessedRecord`] lines.
pub struct ProcessedRecordWriter {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProcessedRecordWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, id: &str) -> Result<(), StorageError> {
        let line = serde_json::to_string(&ProcessedRecord { id: id.to_string() })?;

        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| {
            log::warn!("Processed record write lock was poisoned, recovering");
            poisoned.into_inner()
        });
        append_line(&self.path, &line)?;

        debug!("Processed id persisted to {}: {}", self.path.display(), id);
        Ok(())
    }
}

/// Dedup authority consulted by the pipeline.
pub trait ProcessedStore: Send + Sync {
    fn contains(&self, id: &str) -> Result<bool, StorageError>;

    /// Returns true only for the first successful insert of `id`.
    fn mark_processed(&self, id: &str) -> Result<bool, StorageError>;
}

/// Snapshot of index state. Does not trigger a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub loaded: bool,
    pub size: usize,
    pub record_file: PathBuf,
}

/// Lazily loaded, durably appended set of processed ids.
pub struct ProcessedIndex {
    set: ProcessedIdSet,
    loader: RecordLoader,
    writer: ProcessedRecordWriter,
    // Held across check, append and insert so an id is never visible
    // before its record is durable.
    mark_lock: Mutex<()>,
}

impl ProcessedIndex {
    /// Creates an index over `storage_directory`. Nothing is read until first use.
    pub fn new<P: AsRef<Path>>(storage_directory: P) -> Self {
        let dir = storage_directory.as_ref();
        Self {
            set: ProcessedIdSet::new(),
            loader: RecordLoader::new(dir),
            writer: ProcessedRecordWriter::new(dir.join(PROCESSED_RECORD_FILE)),
            mark_lock: Mutex::new(()),
        }
    }

    /// Loads from disk if not already loaded. Safe to call from many threads.
    pub fn ensure_loaded(&self) -> Result<(), StorageError> {
        self.set.ensure_loaded(|| self.loader.load_ids())?;
        Ok(())
    }

    /// Seeds the index directly, bypassing the disk scan. One-shot.
    pub fn load<I>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        self.set.load(ids)
    }

    pub fn contains(&self, id: &str) -> Result<bool, StorageError> {
        self.ensure_loaded()?;
        Ok(self.set.contains(id))
    }

    /// Records `id` as processed.
    ///
    /// Returns `Ok(true)` only for the call that recorded it. The id joins
    /// the in-memory set only after its durable record is appended, so a
    /// failed append leaves it absent for every caller.
    pub fn mark_processed(&self, id: &str) -> Result<bool, StorageError> {
        self.ensure_loaded()?;

        let _guard = self.mark_lock.lock().unwrap_or_else(|poisoned| {
            log::warn!("Processed mark lock was poisoned, recovering");
            poisoned.into_inner()
        });

        if self.set.contains(id) {
            return Ok(false);
        }

        if let Err(e) = self.writer.append(id) {
            error!("Failed to persist processed id {}: {}", id, e);
            return Err(e);
        }

        Ok(self.set.insert(id))
    }

    /// Number of distinct processed ids, loading from disk first if needed.
    pub fn size(&self) -> Result<usize, StorageError> {
        self.ensure_loaded()?;
        Ok(self.set.len())
    }

    pub fn is_loaded(&self) -> bool {
        self.set.is_loaded()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            loaded: self.is_loaded(),
            size: self.set.len(),
            record_file: self.writer.path().to_path_buf(),
        }
    }
}

impl ProcessedStore for ProcessedIndex {
    fn contains(&self, id: &str) -> Result<bool, StorageError> {
        ProcessedIndex::contains(self, id)
    }

    fn mark_processed(&self, id: &str) -> Result<bool, StorageError> {
        ProcessedIndex::mark_processed(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_lazy_load_on_first_contains() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("old.json"), "{\"id\":\"seen\"}\n").unwrap();

        let index = ProcessedIndex::new(temp.path());
        assert!(!index.is_loaded());

        assert!(index.contains("seen").unwrap());
        assert!(index.is_loaded());
        assert!(!index.contains("unseen").unwrap());
    }

    #[test]
    fn test_two_sources_seed() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("first.json"), "{\"id\":\"a\"}\n").unwrap();
        std::fs::write(
            temp.path().join("second.json"),
            "{\"id\":\"a\"}\n{\"id\":\"b\"}\n",
        )
        .unwrap();

        let index = ProcessedIndex::new(temp.path());
        index.ensure_loaded().unwrap();

        assert_eq!(index.size().unwrap(), 2);
        assert!(index.contains("a").unwrap());
        assert!(index.contains("b").unwrap());
        assert!(!index.contains("c").unwrap());
    }

    #[test]
    fn test_repeated_mark_writes_one_record() {
        let temp = TempDir::new().unwrap();
        let index = ProcessedIndex::new(temp.path());

        assert!(index.mark_processed("m1").unwrap());
        assert!(!index.mark_processed("m1").unwrap());
        assert!(!index.mark_processed("m1").unwrap());

        assert!(index.contains("m1").unwrap());
        assert_eq!(index.size().unwrap(), 1);
        assert_eq!(
            record_lines(&temp.path().join(PROCESSED_RECORD_FILE)),
            vec![r#"{"id":"m1"}"#.to_string()]
        );
    }

    #[test]
    fn test_duplicate_records_rebuild_to_single_entry() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(PROCESSED_RECORD_FILE),
            "{\"id\":\"dup\"}\n{\"id\":\"dup\"}\n{\"id\":\"dup\"}\n",
        )
        .unwrap();

        let index = ProcessedIndex::new(temp.path());
        assert!(index.contains("dup").unwrap());
        assert_eq!(index.size().unwrap(), 1);
    }

    #[test]
    fn test_marks_survive_restart() {
        let temp = TempDir::new().unwrap();
        {
            let index = ProcessedIndex::new(temp.path());
            index.mark_processed("x").unwrap();
            index.mark_processed("y").unwrap();
        }

        let reopened = ProcessedIndex::new(temp.path());
        assert!(reopened.contains("x").unwrap());
        assert!(reopened.contains("y").unwrap());
        assert_eq!(reopened.size().unwrap(), 2);
    }

    #[test]
    fn test_explicit_seed_skips_disk_scan() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("old.json"), "{\"id\":\"on-disk\"}\n").unwrap();

        let index = ProcessedIndex::new(temp.path());
        assert!(index.load(vec!["seeded".to_string()]));
        assert!(!index.load(vec!["again".to_string()]));

        assert!(index.contains("seeded").unwrap());
        assert!(!index.contains("on-disk").unwrap());
    }

    #[test]
    fn test_failed_append_leaves_id_unrecorded() {
        let temp = TempDir::new().unwrap();
        let index = ProcessedIndex::new(temp.path());
        index.ensure_loaded().unwrap();

        // A directory where the record file should be makes the append fail.
        std::fs::create_dir(temp.path().join(PROCESSED_RECORD_FILE)).unwrap();

        assert!(index.mark_processed("m1").is_err());
        assert!(!index.contains("m1").unwrap());
        assert_eq!(index.size().unwrap(), 0);
    }

    #[test]
    fn test_size_loads_existing_records() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(PROCESSED_RECORD_FILE),
            "{\"id\":\"a\"}\n{\"id\":\"b\"}\n",
        )
        .unwrap();

        let index = ProcessedIndex::new(temp.path());
        assert_eq!(index.size().unwrap(), 2);
        assert!(index.is_loaded());
    }

    #[test]
    fn test_failed_append_is_never_seen_as_processed() {
        let temp = TempDir::new().unwrap();
        let index = std::sync::Arc::new(ProcessedIndex::new(temp.path()));
        index.ensure_loaded().unwrap();
        std::fs::create_dir(temp.path().join(PROCESSED_RECORD_FILE)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = std::sync::Arc::clone(&index);
                std::thread::spawn(move || index.mark_processed("m1"))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_err());
        }
        assert!(!index.contains("m1").unwrap());
    }

    #[test]
    fn test_stats() {
        let temp = TempDir::new().unwrap();
        let index = ProcessedIndex::new(temp.path());
        index.mark_processed("a").unwrap();

        let stats = index.stats();
        assert!(stats.loaded);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.record_file, temp.path().join(PROCESSED_RECORD_FILE));
    }
}

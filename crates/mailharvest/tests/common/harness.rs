//! Test harness for isolated ingestion runs.
//!
//! Each `TestHarness` owns a temporary storage directory and an in-memory
//! mailbox, and can build a fully wired `HarvestService` over both.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use mailharvest::config::Config;
use mailharvest::index::PROCESSED_RECORD_FILE;
use mailharvest::provider::{InMemoryMailbox, Message};
use mailharvest::trigger::AckHandle;
use mailharvest::HarvestService;

use super::builders::ConfigBuilder;

pub struct TestHarness {
    temp_dir: TempDir,
    pub storage_dir: PathBuf,
    pub mailbox: Arc<InMemoryMailbox>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_page_size(100)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage_dir = temp_dir.path().join("storage");
        Self {
            temp_dir,
            storage_dir,
            mailbox: Arc::new(InMemoryMailbox::with_page_size(page_size)),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn deliver(&self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.mailbox.deliver(message);
        }
    }

    pub fn config(&self) -> Config {
        ConfigBuilder::new(&self.storage_dir).build()
    }

    pub fn service(&self) -> HarvestService {
        self.service_with(self.config())
    }

    pub fn service_with(&self, config: Config) -> HarvestService {
        HarvestService::new(config, self.mailbox.clone()).expect("Failed to build service")
    }

    /// Lines of the processed-id record file.
    pub fn processed_lines(&self) -> Vec<String> {
        read_lines(&self.storage_dir.join(PROCESSED_RECORD_FILE))
    }

    /// Every converted record across the daily files, parsed as JSON.
    pub fn converted_records(&self) -> Vec<serde_json::Value> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.storage_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok().map(|e| e.path()))
                    .filter(|p| {
                        p.file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.starts_with("emails-"))
                    })
                    .collect()
            })
            .unwrap_or_default();
        files.sort();

        files
            .iter()
            .flat_map(|f| read_lines(f))
            .map(|line| serde_json::from_str(&line).expect("record is valid JSON"))
            .collect()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Ack handle that counts calls.
#[derive(Clone, Default)]
pub struct AckCounter {
    acks: Arc<AtomicUsize>,
    nacks: Arc<AtomicUsize>,
}

impl AckCounter {
    pub fn handle(&self) -> Box<dyn AckHandle> {
        Box::new(self.clone())
    }

    pub fn acks(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }

    pub fn nacks(&self) -> usize {
        self.nacks.load(Ordering::SeqCst)
    }
}

impl AckHandle for AckCounter {
    fn ack(self: Box<Self>) {
        self.acks.fetch_add(1, Ordering::SeqCst);
    }

    fn nack(self: Box<Self>) {
        self.nacks.fetch_add(1, Ordering::SeqCst);
    }
}

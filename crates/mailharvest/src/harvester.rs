//! Cursor-driven enumeration of candidate messages.
//!
//! [`Harvester::stream`] walks every page the provider returns and fetches
//! each listed message lazily. Per-message fetch failures are logged and
//! skipped; a failed page listing ends the stream with one error item.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{HarvestError, Result};
use crate::provider::{MailProvider, Message, SearchCriteria};

/// Counters for one harvest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    pub pages: usize,
    pub listed: usize,
    pub fetched: usize,
    pub excluded: usize,
    pub failed: usize,
}

/// Enumerates messages from a [`MailProvider`].
#[derive(Clone)]
pub struct Harvester {
    provider: Arc<dyn MailProvider>,
    progress_log_interval: usize,
}

impl Harvester {
    pub fn new(provider: Arc<dyn MailProvider>, progress_log_interval: usize) -> Self {
        Self {
            provider,
            progress_log_interval,
        }
    }

    pub fn provider(&self) -> &Arc<dyn MailProvider> {
        &self.provider
    }

    /// Cheap round-trip check against the provider.
    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    /// Returns a lazy stream over every message matching `criteria`.
    ///
    /// Nothing is requested from the provider until the first `next()`.
    pub fn stream(&self, criteria: SearchCriteria) -> MessageStream {
        MessageStream {
            provider: Arc::clone(&self.provider),
            criteria,
            progress_log_interval: self.progress_log_interval,
            pending: VecDeque::new(),
            next_cursor: None,
            started: false,
            finished: false,
            stats: HarvestStats::default(),
        }
    }

    /// Eagerly harvests everything. Any page listing failure is returned as
    /// an error, discarding what was fetched so far.
    pub fn collect(&self, criteria: SearchCriteria) -> Result<Vec<Message>> {
        self.stream(criteria).collect()
    }
}

/// Lazy, fused iterator of harvested messages.
pub struct MessageStream {
    provider: Arc<dyn MailProvider>,
    criteria: SearchCriteria,
    progress_log_interval: usize,
    pending: VecDeque<String>,
    next_cursor: Option<String>,
    started: bool,
    finished: bool,
    stats: HarvestStats,
}

impl MessageStream {
    pub fn stats(&self) -> HarvestStats {
        self.stats
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        info!(
            provider = self.provider.name(),
            "Harvest finished: {} pages, {} listed, {} fetched, {} excluded, {} failed",
            self.stats.pages,
            self.stats.listed,
            self.stats.fetched,
            self.stats.excluded,
            self.stats.failed
        );
    }

    fn fetch(&mut self, id: &str) -> Option<Message> {
        match self.provider.fetch_full(&self.criteria.user_id, id) {
            Ok(message) => {
                self.stats.fetched += 1;
                if self.progress_log_interval > 0
                    && self.stats.fetched % self.progress_log_interval == 0
                {
                    debug!("Fetched {} messages so far", self.stats.fetched);
                }
                Some(message)
            }
            Err(e) => {
                warn!("Failed to fetch message {}: {}", id, e);
                self.stats.failed += 1;
                None
            }
        }
    }
}

impl Iterator for MessageStream {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(id) = self.pending.pop_front() {
                if self.criteria.is_excluded(&id) {
                    self.stats.excluded += 1;
                    continue;
                }
                match self.fetch(&id) {
                    Some(message) => return Some(Ok(message)),
                    None => continue,
                }
            }

            // Current page drained; the last page carries no continuation.
            if self.started && self.next_cursor.is_none() {
                self.finish();
                return None;
            }

            match self
                .provider
                .list_page(&self.criteria, self.next_cursor.as_deref())
            {
                Ok(page) => {
                    self.started = true;
                    self.stats.pages += 1;
                    self.stats.listed += page.ids.len();
                    debug!(
                        "Listed page {} with {} ids",
                        self.stats.pages,
                        page.ids.len()
                    );
                    self.pending.extend(page.ids);
                    self.next_cursor = page.next_cursor;
                }
                Err(e) => {
                    warn!(
                        "Listing page {} failed: {}",
                        self.stats.pages + 1,
                        e
                    );
                    self.finish();
                    return Some(Err(HarvestError::ListPage(e)));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for MessageStream {}

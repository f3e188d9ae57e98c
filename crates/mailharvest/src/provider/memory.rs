//! In-process mailbox implementing [`MailProvider`].
//!
//! Messages are listed in insertion order. Page cursors are stringified
//! offsets. Failure injection hooks let callers exercise the partial-failure
//! paths of the harvester and reconciler.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::ProviderError;

use super::{
    ChangeCursor, ChangeRecord, MailProvider, Message, MessagePage, ProviderResult,
    SearchCriteria, WatchRegistration, UNREAD_LABEL,
};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Default)]
struct MailboxState {
    messages: Vec<Message>,
    changes: Vec<ChangeRecord>,
    failing_fetches: HashSet<String>,
    fail_list_at_page: Option<usize>,
    resolve_failure: Option<ProviderError>,
    watch_failure: Option<ProviderError>,
    mark_read_failures: HashSet<String>,
    fetch_counts: HashMap<String, usize>,
    marked_read: Vec<String>,
    watches: Vec<String>,
    history_head: u64,
}

/// Thread-safe in-memory mailbox.
pub struct InMemoryMailbox {
    state: Mutex<MailboxState>,
    page_size: usize,
    available: AtomicBool,
    list_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
}

impl Default for InMemoryMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMailbox {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates a mailbox that returns at most `page_size` ids per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(MailboxState::default()),
            page_size: page_size.max(1),
            available: AtomicBool::new(true),
            list_calls: AtomicUsize::new(0),
            resolve_calls: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers a message and records a history entry for it.
    pub fn deliver(&self, message: Message) -> ChangeCursor {
        let mut state = self.state();
        state.history_head += 1;
        let cursor = ChangeCursor(state.history_head);
        state.changes.push(ChangeRecord {
            cursor,
            message_ids: vec![message.id.clone()],
        });
        state.messages.push(message);
        cursor
    }

    pub fn fail_fetch(&self, message_id: impl Into<String>) {
        self.state().failing_fetches.insert(message_id.into());
    }

    /// Makes listing fail when page number `page` (zero-based) is requested.
    pub fn fail_list_at_page(&self, page: usize) {
        self.state().fail_list_at_page = Some(page);
    }

    pub fn fail_resolve(&self, error: ProviderError) {
        self.state().resolve_failure = Some(error);
    }

    pub fn fail_watch(&self, error: ProviderError) {
        self.state().watch_failure = Some(error);
    }

    pub fn fail_mark_read(&self, message_id: impl Into<String>) {
        self.state().mark_read_failures.insert(message_id.into());
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Current head of the change history.
    pub fn history_head(&self) -> ChangeCursor {
        ChangeCursor(self.state().history_head)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self, message_id: &str) -> usize {
        self.state()
            .fetch_counts
            .get(message_id)
            .copied()
            .unwrap_or(0)
    }

    /// Ids passed to `mark_read`, in call order.
    pub fn marked_read(&self) -> Vec<String> {
        self.state().marked_read.clone()
    }

    pub fn watches(&self) -> Vec<String> {
        self.state().watches.clone()
    }

    pub fn is_unread(&self, message_id: &str) -> Option<bool> {
        self.state()
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .map(Message::is_unread)
    }
}

impl MailProvider for InMemoryMailbox {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn list_page(
        &self,
        criteria: &SearchCriteria,
        cursor: Option<&str>,
    ) -> ProviderResult<MessagePage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();

        let offset = match cursor {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ProviderError::Request(format!("invalid page token '{}'", token)))?,
        };

        let page_size = criteria
            .max_results
            .map(|m| (m as usize).clamp(1, self.page_size))
            .unwrap_or(self.page_size);

        if let Some(fail_at) = state.fail_list_at_page {
            if offset / page_size == fail_at {
                return Err(ProviderError::Request(format!(
                    "listing failed at page {}",
                    fail_at
                )));
            }
        }

        let matching: Vec<&Message> = state
            .messages
            .iter()
            .filter(|m| {
                criteria
                    .label_ids
                    .iter()
                    .all(|label| m.label_ids.iter().any(|l| l == label))
            })
            .collect();

        let ids: Vec<String> = matching
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|m| m.id.clone())
            .collect();

        let next = offset + page_size;
        let next_cursor = (next < matching.len()).then(|| next.to_string());

        Ok(MessagePage { ids, next_cursor })
    }

    fn fetch_full(&self, _user_id: &str, message_id: &str) -> ProviderResult<Message> {
        let mut state = self.state();
        *state
            .fetch_counts
            .entry(message_id.to_string())
            .or_insert(0) += 1;

        if state.failing_fetches.contains(message_id) {
            return Err(ProviderError::Request(format!(
                "fetch of '{}' failed",
                message_id
            )));
        }

        state
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(message_id.to_string()))
    }

    fn mark_read(&self, _user_id: &str, message_id: &str) -> ProviderResult<()> {
        let mut state = self.state();

        if state.mark_read_failures.contains(message_id) {
            return Err(ProviderError::Request(format!(
                "modify of '{}' failed",
                message_id
            )));
        }

        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| ProviderError::NotFound(message_id.to_string()))?;
        message.label_ids.retain(|l| l != UNREAD_LABEL);
        state.marked_read.push(message_id.to_string());
        Ok(())
    }

    fn resolve_changes(
        &self,
        _user_id: &str,
        cursor: ChangeCursor,
    ) -> ProviderResult<Vec<ChangeRecord>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();

        if let Some(err) = &state.resolve_failure {
            return Err(err.clone());
        }

        Ok(state
            .changes
            .iter()
            .filter(|c| c.cursor > cursor)
            .cloned()
            .collect())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn register_watch(&self, _user_id: &str, topic: &str) -> ProviderResult<WatchRegistration> {
        let mut state = self.state();

        if let Some(err) = &state.watch_failure {
            return Err(err.clone());
        }

        state.watches.push(topic.to_string());
        Ok(WatchRegistration {
            topic: topic.to_string(),
            cursor: Some(ChangeCursor(state.history_head)),
            expiration_ms: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbox_message(id: &str) -> Message {
        Message::new(id).with_label("INBOX").with_label("UNREAD")
    }

    #[test]
    fn test_pages_follow_insertion_order() {
        let mailbox = InMemoryMailbox::with_page_size(2);
        for id in ["a", "b", "c"] {
            mailbox.deliver(inbox_message(id));
        }

        let criteria = SearchCriteria::default();
        let first = mailbox.list_page(&criteria, None).unwrap();
        assert_eq!(first.ids, vec!["a", "b"]);
        assert_eq!(first.next_cursor.as_deref(), Some("2"));

        let second = mailbox.list_page(&criteria, Some("2")).unwrap();
        assert_eq!(second.ids, vec!["c"]);
        assert_eq!(second.next_cursor, None);
    }

    #[test]
    fn test_label_filter() {
        let mailbox = InMemoryMailbox::new();
        mailbox.deliver(inbox_message("a"));
        mailbox.deliver(Message::new("sent").with_label("SENT"));

        let page = mailbox.list_page(&SearchCriteria::default(), None).unwrap();
        assert_eq!(page.ids, vec!["a"]);
    }

    #[test]
    fn test_mark_read_clears_unread() {
        let mailbox = InMemoryMailbox::new();
        mailbox.deliver(inbox_message("a"));

        assert_eq!(mailbox.is_unread("a"), Some(true));
        mailbox.mark_read("me", "a").unwrap();
        assert_eq!(mailbox.is_unread("a"), Some(false));
        assert_eq!(mailbox.marked_read(), vec!["a"]);
    }

    #[test]
    fn test_resolve_changes_after_cursor() {
        let mailbox = InMemoryMailbox::new();
        let first = mailbox.deliver(inbox_message("a"));
        mailbox.deliver(inbox_message("b"));

        let changes = mailbox.resolve_changes("me", first).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].message_ids, vec!["b"]);
    }

    #[test]
    fn test_injected_failures() {
        let mailbox = InMemoryMailbox::new();
        mailbox.deliver(inbox_message("a"));
        mailbox.fail_fetch("a");
        mailbox.fail_resolve(ProviderError::CursorExpired(1));

        assert!(mailbox.fetch_full("me", "a").is_err());
        assert_eq!(mailbox.fetch_count("a"), 1);
        assert_eq!(
            mailbox.resolve_changes("me", ChangeCursor(1)),
            Err(ProviderError::CursorExpired(1))
        );
    }
}

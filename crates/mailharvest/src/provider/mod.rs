//! Mail provider contract.
//!
//! The concrete network client (credentials, HTTP transport, retries) lives
//! outside this crate. Anything implementing [`MailProvider`] can be driven by
//! the harvester, the pipeline and the reconciler. [`InMemoryMailbox`] is a
//! complete in-process implementation used by tests and local runs.

pub mod criteria;
pub mod memory;
pub mod message;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub use criteria::{SearchCriteria, SearchCriteriaBuilder};
pub use memory::InMemoryMailbox;
pub use message::{Header, Message, MessageBody, MessagePart};

/// User scope meaning "the authenticated account".
pub const CURRENT_USER_ID: &str = "me";
pub const INBOX_LABEL: &str = "INBOX";
pub const UNREAD_LABEL: &str = "UNREAD";

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// One page of message identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub ids: Vec<String>,
    /// Continuation token; `None` means this was the last page.
    pub next_cursor: Option<String>,
}

/// Opaque position in the provider's change history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangeCursor(pub u64);

impl fmt::Display for ChangeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the provider's change history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub cursor: ChangeCursor,
    pub message_ids: Vec<String>,
}

/// Result of registering a push-notification watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRegistration {
    pub topic: String,
    /// Cursor current at registration time.
    pub cursor: Option<ChangeCursor>,
    /// Expiration as milliseconds since the Unix epoch, if the provider reports one.
    pub expiration_ms: Option<i64>,
}

/// Remote mailbox operations consumed by the ingestion core.
///
/// Implementations are expected to apply their own timeouts and retries.
pub trait MailProvider: Send + Sync {
    /// Human readable provider name for logs.
    fn name(&self) -> &str;

    /// Lists one page of message identifiers matching `criteria`.
    fn list_page(
        &self,
        criteria: &SearchCriteria,
        cursor: Option<&str>,
    ) -> ProviderResult<MessagePage>;

    /// Fetches headers and body parts of a single message.
    fn fetch_full(&self, user_id: &str, message_id: &str) -> ProviderResult<Message>;

    /// Clears the unread flag on the remote side.
    fn mark_read(&self, user_id: &str, message_id: &str) -> ProviderResult<()>;

    /// Resolves changes recorded since `cursor`. Unreliable for old cursors.
    fn resolve_changes(
        &self,
        user_id: &str,
        cursor: ChangeCursor,
    ) -> ProviderResult<Vec<ChangeRecord>>;

    /// Cheap round-trip check.
    fn is_available(&self) -> bool;

    /// Registers push notifications for the mailbox on `topic`.
    fn register_watch(&self, user_id: &str, topic: &str) -> ProviderResult<WatchRegistration>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_ordering_and_display() {
        assert!(ChangeCursor(5) < ChangeCursor(12));
        assert_eq!(ChangeCursor(42).to_string(), "42");
    }
}

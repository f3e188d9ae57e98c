use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{HarvestError, Result};
use crate::provider::{MailProvider, WatchRegistration};

/// Registers the mailbox push-notification watch at startup.
pub struct WatchManager {
    provider: Arc<dyn MailProvider>,
    user_id: String,
    topic: Option<String>,
}

impl WatchManager {
    pub fn new(
        provider: Arc<dyn MailProvider>,
        user_id: impl Into<String>,
        topic: Option<String>,
    ) -> Self {
        Self {
            provider,
            user_id: user_id.into(),
            topic,
        }
    }

    /// Registers the watch on the configured topic.
    ///
    /// Returns `Ok(None)` when no topic is configured. A registration failure
    /// is an initialization error.
    pub fn start(&self) -> Result<Option<WatchRegistration>> {
        let Some(topic) = self.topic.as_deref() else {
            warn!("No watch topic configured, push notifications are disabled");
            return Ok(None);
        };

        let registration = self
            .provider
            .register_watch(&self.user_id, topic)
            .map_err(|source| HarvestError::Watch {
                topic: topic.to_string(),
                source,
            })?;

        match registration.cursor {
            Some(cursor) => info!("Mailbox watch registered on '{}' at cursor {}", topic, cursor),
            None => info!("Mailbox watch registered on '{}'", topic),
        }

        Ok(Some(registration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::InMemoryMailbox;

    #[test]
    fn test_missing_topic_disables_watch() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let manager = WatchManager::new(mailbox.clone(), "me", None);

        assert!(manager.start().unwrap().is_none());
        assert!(mailbox.watches().is_empty());
    }

    #[test]
    fn test_registers_on_topic() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let manager = WatchManager::new(mailbox.clone(), "me", Some("projects/p/topics/mail".to_string()));

        let registration = manager.start().unwrap().unwrap();
        assert_eq!(registration.topic, "projects/p/topics/mail");
        assert_eq!(mailbox.watches(), vec!["projects/p/topics/mail"]);
    }

    #[test]
    fn test_registration_failure_is_fatal() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox.fail_watch(ProviderError::Authentication("denied".to_string()));
        let manager = WatchManager::new(mailbox, "me", Some("topic".to_string()));

        let err = manager.start().unwrap_err();
        assert!(matches!(err, HarvestError::Watch { ref topic, .. } if topic == "topic"));
    }
}

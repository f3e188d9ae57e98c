//! Builders for test messages and configurations.

#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use mailharvest::config::Config;
use mailharvest::provider::{Header, Message, MessageBody, MessagePart};

/// Builder for provider `Message` values.
pub struct MessageBuilder {
    id: String,
    labels: Vec<String>,
    headers: Vec<Header>,
    inline_body: Option<String>,
    parts: Vec<MessagePart>,
    payload: bool,
}

impl MessageBuilder {
    /// An unread inbox message with no payload yet.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            labels: vec!["INBOX".to_string(), "UNREAD".to_string()],
            headers: Vec::new(),
            inline_body: None,
            parts: Vec::new(),
            payload: false,
        }
    }

    pub fn labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(Header::new(name, value));
        self.payload = true;
        self
    }

    pub fn from(self, value: &str) -> Self {
        self.header("From", value)
    }

    pub fn subject(self, value: &str) -> Self {
        self.header("Subject", value)
    }

    pub fn date(self, value: &str) -> Self {
        self.header("Date", value)
    }

    /// Inline body, encoded the way the provider delivers it.
    pub fn body(mut self, text: &str) -> Self {
        self.inline_body = Some(encode(text));
        self.payload = true;
        self
    }

    /// Raw inline body data, not encoded.
    pub fn raw_body(mut self, data: &str) -> Self {
        self.inline_body = Some(data.to_string());
        self.payload = true;
        self
    }

    /// Adds a MIME part with the given type and text.
    pub fn part(mut self, mime_type: &str, text: &str) -> Self {
        self.parts.push(MessagePart {
            mime_type: mime_type.to_string(),
            headers: Vec::new(),
            body: Some(body(encode(text))),
            parts: Vec::new(),
        });
        self.payload = true;
        self
    }

    pub fn build(self) -> Message {
        let mut message = Message::new(self.id);
        message.label_ids = self.labels;
        if self.payload {
            message = message.with_payload(MessagePart {
                mime_type: if self.parts.is_empty() {
                    "text/plain".to_string()
                } else {
                    "multipart/alternative".to_string()
                },
                headers: self.headers,
                body: self.inline_body.map(body),
                parts: self.parts,
            });
        }
        message
    }
}

pub fn encode(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

fn body(data: String) -> MessageBody {
    MessageBody {
        size: data.len() as u64,
        data: Some(data),
    }
}

/// Builder for `Config` instances pointing at a test directory.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(storage_directory: &std::path::Path) -> Self {
        let mut config = Config::with_storage_directory(storage_directory);
        config.notification.workers = 2;
        Self { config }
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.config.max_results = Some(max_results);
        self
    }

    pub fn watch_topic(mut self, topic: &str) -> Self {
        self.config.watch_topic = Some(topic.to_string());
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.notification.workers = workers;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

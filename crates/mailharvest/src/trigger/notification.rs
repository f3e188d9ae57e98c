//! Change notifications as delivered by the push transport.

use serde_json::Value;
use tracing::{debug, warn};

use crate::provider::ChangeCursor;

/// Transport-level acknowledgement handle for one delivery.
pub trait AckHandle: Send {
    fn ack(self: Box<Self>);
    fn nack(self: Box<Self>);
}

/// One delivery from the notification channel.
pub struct Notification {
    pub payload: Vec<u8>,
    pub ack: Box<dyn AckHandle>,
}

impl Notification {
    pub fn new(payload: impl Into<Vec<u8>>, ack: Box<dyn AckHandle>) -> Self {
        Self {
            payload: payload.into(),
            ack,
        }
    }
}

/// Acks the wrapped handle when dropped, including during unwinding.
pub struct AckGuard {
    handle: Option<Box<dyn AckHandle>>,
}

impl AckGuard {
    pub fn new(handle: Box<dyn AckHandle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl Drop for AckGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.ack();
            debug!("Notification acknowledged");
        }
    }
}

/// Extracts `historyId` from a JSON notification payload.
///
/// Accepts the id as a JSON number or a decimal string. Anything else,
/// including malformed JSON, yields `None`.
pub fn parse_change_cursor(payload: &[u8]) -> Option<ChangeCursor> {
    let value: Value = match serde_json::from_slice(payload) {
        Ok(value) => value,
        Err(e) => {
            warn!("Notification payload is not valid JSON: {}", e);
            return None;
        }
    };

    let cursor = match value.get("historyId") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
        None => {
            warn!("Notification payload has no historyId field");
            return None;
        }
    };

    if cursor.is_none() {
        warn!("Notification historyId is not a valid cursor");
    }
    cursor.map(ChangeCursor)
}

//! Conversion of fetched messages into flat JSON records.

use std::sync::LazyLock;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ProcessError;
use crate::provider::{Message, MessagePart};

static RE_TRAILING_ZONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" [+-]\d{4}$").unwrap());
static RE_LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n|\r|\n").unwrap());

/// URL-safe alphabet, padding optional.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const INPUT_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";
const OUTPUT_DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";
const PLAIN_TEXT_MIME: &str = "text/plain";

/// Canonical record written for each converted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedEmail {
    pub id: String,
    pub date: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

impl ConvertedEmail {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date: String::new(),
            from: String::new(),
            subject: String::new(),
            body: String::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, ProcessError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Extracts sender, subject, date and plain-text body from a message.
#[derive(Debug, Clone, Default)]
pub struct EmailConverter;

impl EmailConverter {
    pub fn new() -> Self {
        Self
    }

    pub fn convert(&self, message: &Message) -> Result<ConvertedEmail, ProcessError> {
        let Some(payload) = message.payload.as_ref() else {
            return Ok(ConvertedEmail::empty(&message.id));
        };

        Ok(ConvertedEmail {
            id: message.id.clone(),
            date: format_date(payload.header("Date").unwrap_or_default()),
            from: payload.header("From").unwrap_or_default().to_string(),
            subject: payload.header("Subject").unwrap_or_default().to_string(),
            body: extract_body(&message.id, payload)?,
        })
    }

    pub fn convert_to_json(&self, message: &Message) -> Result<String, ProcessError> {
        self.convert(message)?.to_json()
    }
}

fn extract_body(message_id: &str, payload: &MessagePart) -> Result<String, ProcessError> {
    let data = payload.body_data().or_else(|| {
        payload
            .parts
            .iter()
            .filter(|part| part.mime_type == PLAIN_TEXT_MIME)
            .find_map(|part| part.body_data())
    });

    let body = match data {
        Some(data) => decode_base64(message_id, data)?,
        None => String::new(),
    };

    Ok(RE_LINE_BREAK.replace_all(&body, " ").trim().to_string())
}

fn decode_base64(message_id: &str, data: &str) -> Result<String, ProcessError> {
    let bytes = URL_SAFE_LENIENT
        .decode(data.trim())
        .map_err(|e| ProcessError::Decode {
            message_id: message_id.to_string(),
            reason: e.to_string(),
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Renders `Mon, 15 Jan 2024 10:30:00 +0000` as `15-01-2024 10:30:00hs`.
///
/// Falls back to the input without its numeric zone when it does not parse.
pub fn format_date(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let without_zone = RE_TRAILING_ZONE.replace(raw, "");
    match NaiveDateTime::parse_from_str(&without_zone, INPUT_DATE_FORMAT) {
        Ok(dt) => format!("{}hs", dt.format(OUTPUT_DATE_FORMAT)),
        Err(_) => without_zone.into_owned(),
    }
}

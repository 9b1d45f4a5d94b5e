//! Structured form of a submitted message.
//!
//! This module defines [`EmailMessage`], the representation every stage of
//! the pipeline works on after the raw submission has been split and its
//! headers parsed. Headers live in a map keyed by lower-cased name, the
//! body is kept apart and always treated as HTML content.

use std::collections::HashMap;

use serde::{ser::SerializeMap, Serialize, Serializer};
use uuid::Uuid;

use crate::{parse_headers, split_raw};

/// Key under which the body appears in the serialized form of a message.
pub const HTML_KEY: &str = "html";

/// Represents a message submitted to the facade.
///
/// Header keys are unique and lower-cased, a header parsed from a line
/// without a colon is present but carries no value. The serialized form
/// (used for loss records) lists every header and then the body under
/// [`HTML_KEY`], a header with that very name never shadows the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Identifier used to correlate the log records of one submission,
    /// never written into the outgoing mail.
    pub message_id: String,

    /// Parsed headers, lower-cased keys and trimmed values.
    headers: HashMap<String, Option<String>>,

    /// Trimmed message body after the header/body boundary.
    html: String,
}

impl EmailMessage {
    pub fn new(headers: HashMap<String, Option<String>>, html: String) -> Self {
        let mut headers = headers;
        headers.remove(HTML_KEY);
        Self {
            message_id: Uuid::new_v4().to_string(),
            headers,
            html,
        }
    }

    /// Builds a message from a raw sendmail-style submission.
    pub fn from_raw(raw: &str) -> Self {
        let parts = split_raw(raw);
        Self::new(parse_headers(parts.headers), parts.body.to_string())
    }

    /// Returns the value of the header with the given name (case-insensitive).
    ///
    /// Valueless headers and missing headers both yield `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|value| value.as_deref())
    }

    /// Returns whether a header with the given name was present, with or
    /// without a value.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    /// Sets a header, replacing any previous value under the same key.
    ///
    /// Attempts to set the body key are ignored, use [`set_html`](Self::set_html).
    pub fn set_header(&mut self, name: &str, value: &str) {
        let key = name.to_lowercase();
        if key == HTML_KEY {
            return;
        }
        self.headers.insert(key, Some(value.to_string()));
    }

    /// Returns a reference to the header map.
    pub fn headers(&self) -> &HashMap<String, Option<String>> {
        &self.headers
    }

    pub fn from(&self) -> Option<&str> {
        self.header("from")
    }

    pub fn to(&self) -> Option<&str> {
        self.header("to")
    }

    /// Overwrites the `to` header.
    pub fn set_to(&mut self, to: &str) {
        self.set_header("to", to);
    }

    pub fn cc(&self) -> Option<&str> {
        self.header("cc")
    }

    pub fn bcc(&self) -> Option<&str> {
        self.header("bcc")
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.header("reply-to")
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("subject")
    }

    /// Returns the message body.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Replaces the message body.
    pub fn set_html(&mut self, html: String) {
        self.html = html;
    }
}

impl Serialize for EmailMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut keys: Vec<&String> = self.headers.keys().collect();
        keys.sort();

        let mut map = serializer.serialize_map(Some(keys.len() + 1))?;
        for key in keys {
            map.serialize_entry(key, &self.headers[key])?;
        }
        map.serialize_entry(HTML_KEY, &self.html)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn test_email_message_from_raw() {
        let message = EmailMessage::from_raw(
            "From: sender@example.com\nTo: rcpt@example.com\nSubject: Hello\n\n<p>Body</p>\n",
        );

        assert_eq!(message.from(), Some("sender@example.com"));
        assert_eq!(message.to(), Some("rcpt@example.com"));
        assert_eq!(message.subject(), Some("Hello"));
        assert_eq!(message.html(), "<p>Body</p>");
    }

    #[test]
    fn test_email_message_no_boundary() {
        let message = EmailMessage::from_raw("Subject: Hello\r\nFrom: a@example.com");

        assert!(message.headers().is_empty());
        assert_eq!(message.subject(), None);
        assert_eq!(message.html(), "Subject: Hello\r\nFrom: a@example.com");
    }

    #[test]
    fn test_email_message_header_case_insensitive() {
        let message = EmailMessage::from_raw("Reply-To: a@example.com\n\nBody");

        assert_eq!(message.header("REPLY-TO"), Some("a@example.com"));
        assert_eq!(message.reply_to(), Some("a@example.com"));
    }

    #[test]
    fn test_email_message_valueless_header() {
        let message = EmailMessage::from_raw("Subject: Hi\nX-Marker\n\nBody");

        assert!(message.has_header("x-marker"));
        assert_eq!(message.header("x-marker"), None);
        assert!(!message.has_header("x-missing"));
    }

    #[test]
    fn test_email_message_html_header_never_shadows_body() {
        let mut message = EmailMessage::from_raw("Html: fake\nSubject: Hi\n\nreal body");

        assert!(!message.has_header("html"));
        assert_eq!(message.html(), "real body");

        message.set_header("HTML", "still fake");
        assert!(!message.has_header("html"));
        assert_eq!(message.html(), "real body");
    }

    #[test]
    fn test_email_message_set_to() {
        let mut message = EmailMessage::from_raw("To: a@example.com\n\nBody");
        message.set_to("b@example.com, a@example.com");

        assert_eq!(message.to(), Some("b@example.com, a@example.com"));
    }

    #[test]
    fn test_email_message_unique_ids() {
        let first = EmailMessage::from_raw("Subject: Hi\n\nBody");
        let second = EmailMessage::from_raw("Subject: Hi\n\nBody");

        assert_ne!(first.message_id, second.message_id);
    }

    #[test]
    fn test_email_message_serialize() {
        let message = EmailMessage::from_raw("From: a@example.com\nX-Flag\n\nHello");
        let value: Value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["from"], json!("a@example.com"));
        assert_eq!(value["x-flag"], Value::Null);
        assert_eq!(value["html"], json!("Hello"));
        assert_eq!(value.as_object().unwrap().len(), 3);
    }
}

//! Audit event model.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::http::request::RequestContext;
use crate::submission::sanitize::{clean_line, count_links};
use crate::submission::Sanitized;

/// What happened to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    HoneypotHit,
    Validated,
    MailSent,
    MailFailed,
    RateLimited,
    RuntimeError,
    Fatal,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::HoneypotHit => "honeypot_hit",
            EventKind::Validated => "validated",
            EventKind::MailSent => "mail_sent",
            EventKind::MailFailed => "mail_failed",
            EventKind::RateLimited => "rate_limited",
            EventKind::RuntimeError => "runtime_error",
            EventKind::Fatal => "fatal",
        }
    }
}

/// One audit log line.
///
/// Common request fields come first, followed by `event` and the
/// event-specific fields.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub ts: String,
    pub rid: String,
    pub ip: String,
    pub ua: String,
    pub path: String,
    pub event: EventKind,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AuditEvent {
    pub fn new(ctx: &RequestContext, event: EventKind) -> Self {
        Self {
            ts: ctx.received_at.to_rfc3339(),
            rid: ctx.request_id.clone(),
            ip: ctx.client_ip.clone(),
            ua: ctx.user_agent.clone(),
            path: ctx.path.clone(),
            event,
            fields: Map::new(),
        }
    }

    /// Attach an event-specific field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Attach an error message, flattened to one line.
    pub fn with_error(self, err: &str) -> Self {
        self.with("err", clean_line(err))
    }

    /// Attach submission lengths and the email hash; raw values only when
    /// `include_pii` is set.
    pub fn with_digest(mut self, fields: &Sanitized, include_pii: bool) -> Self {
        let digest = [
            ("name_len", Value::from(fields.name.chars().count())),
            ("email_hash", Value::from(email_hash(&fields.email))),
            ("phone_len", Value::from(fields.phone.chars().count())),
            ("msg_len", Value::from(fields.message.chars().count())),
            ("url_count", Value::from(count_links(&fields.message))),
        ];
        for (key, value) in digest {
            self.fields.insert(key.to_string(), value);
        }
        if include_pii {
            self = self
                .with("email", fields.email.as_str())
                .with("name", fields.name.as_str())
                .with("phone", fields.phone.as_str());
        }
        self
    }

    /// Serialize as a single JSON line without the trailing newline.
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Hex SHA-256 of the lowercased address.
pub fn email_hash(email: &str) -> String {
    hex::encode(Sha256::digest(email.to_lowercase().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> Sanitized {
        Sanitized {
            name: "Kovács János".into(),
            email: "Test@Example.com".into(),
            phone: "".into(),
            message: "see http://a and https://b".into(),
        }
    }

    #[test]
    fn test_line_shape() {
        let ctx = RequestContext::for_test("198.51.100.7");
        let line = AuditEvent::new(&ctx, EventKind::RateLimited).to_line().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["event"], "rate_limited");
        assert_eq!(value["ip"], "198.51.100.7");
        assert_eq!(value["rid"], ctx.request_id.as_str());
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_digest_without_pii() {
        let ctx = RequestContext::for_test("10.0.0.1");
        let event = AuditEvent::new(&ctx, EventKind::Validated).with_digest(&sample_fields(), false);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["name_len"], 12);
        assert_eq!(value["msg_len"], 26);
        assert_eq!(value["url_count"], 2);
        assert_eq!(value["email_hash"], email_hash("test@example.com"));
        assert!(value.get("email").is_none());
        assert!(value.get("name").is_none());
        assert!(!event.to_line().unwrap().contains("Example.com"));
    }

    #[test]
    fn test_digest_with_pii() {
        let ctx = RequestContext::for_test("10.0.0.1");
        let value = serde_json::to_value(
            AuditEvent::new(&ctx, EventKind::Validated).with_digest(&sample_fields(), true),
        )
        .unwrap();
        assert_eq!(value["email"], "Test@Example.com");
        assert_eq!(value["name"], "Kovács János");
        assert_eq!(value["phone"], "");
    }

    #[test]
    fn test_error_is_single_line() {
        let ctx = RequestContext::for_test("10.0.0.1");
        let value = serde_json::to_value(
            AuditEvent::new(&ctx, EventKind::RuntimeError).with_error("disk\nfull\r\n"),
        )
        .unwrap();
        assert_eq!(value["err"], "disk full");
    }

    #[test]
    fn test_email_hash_is_case_insensitive() {
        assert_eq!(email_hash("A@B.HU"), email_hash("a@b.hu"));
        assert_eq!(email_hash("a@b.hu").len(), 64);
    }
}

//! Notification composition.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::schema::MailConfig;
use crate::http::request::RequestContext;
use crate::submission::sanitize::clean_line;
use crate::submission::Submission;

/// Characters of the submitter's name shown in the subject.
const SUBJECT_NAME_CHARS: usize = 40;

/// Longest payload per RFC 2047 encoded word that keeps the word within
/// 75 characters.
const ENCODED_WORD_BYTES: usize = 45;

/// A fully composed notification ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    /// Subject as composed, for logs and development dumps.
    pub subject_raw: String,
    /// Subject safe for a header line.
    pub subject: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
    /// Protocol-level sender used for bounces.
    pub envelope_sender: String,
}

impl OutboundMessage {
    /// Build the notification for an accepted submission.
    pub fn compose(mail: &MailConfig, submission: &Submission, ctx: &RequestContext) -> Self {
        let short_name: String = submission.name.chars().take(SUBJECT_NAME_CHARS).collect();
        let subject_raw = format!("[{}] New message: {}", mail.site, short_name);

        let phone = if submission.phone.is_empty() {
            "-"
        } else {
            submission.phone.as_str()
        };
        let user_agent = if ctx.user_agent.is_empty() {
            "-"
        } else {
            ctx.user_agent.as_str()
        };

        let body = format!(
            "New contact request from the website.\n\n\
             Name: {name}\n\
             E-mail: {email}\n\
             Phone: {phone}\n\
             IP: {ip}\n\
             User-Agent: {user_agent}\n\
             Time: {time}\n\
             Request-ID: {rid}\n\n\
             Message:\n\
             {message}\n",
            name = submission.name,
            email = submission.email,
            ip = ctx.client_ip,
            time = ctx.received_at.format("%Y-%m-%d %H:%M:%S"),
            rid = ctx.request_id,
            message = submission.message,
        );

        let headers = vec![
            ("MIME-Version".to_string(), "1.0".to_string()),
            (
                "Content-Type".to_string(),
                "text/plain; charset=UTF-8".to_string(),
            ),
            ("Content-Transfer-Encoding".to_string(), "8bit".to_string()),
            (
                "From".to_string(),
                format!(
                    "{} <{}>",
                    encode_header_value(&mail.site),
                    clean_line(&mail.from_address)
                ),
            ),
            (
                "Reply-To".to_string(),
                format!("<{}>", clean_line(&submission.email)),
            ),
            (
                "X-Mailer".to_string(),
                concat!("contact-relay/", env!("CARGO_PKG_VERSION")).to_string(),
            ),
            ("X-Request-ID".to_string(), ctx.request_id.clone()),
        ];

        Self {
            to: clean_line(&mail.recipient),
            subject: encode_header_value(&subject_raw),
            subject_raw,
            body,
            headers,
            envelope_sender: clean_line(&mail.from_address),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// RFC 5322 text handed to a sendmail-style transport.
    pub fn to_rfc5322(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 512);
        out.push_str(&format!("To: {}\r\n", self.to));
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        for (name, value) in &self.headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        out.push_str("\r\n");
        out.push_str(&self.body.replace('\n', "\r\n"));
        out
    }

    /// Plain dump used in development mode.
    pub fn to_dump(&self) -> String {
        format!("SUBJECT: {}\n\n{}\n", self.subject_raw, self.body)
    }
}

/// Single-line header value; non-ASCII text becomes RFC 2047 `B` words.
pub fn encode_header_value(value: &str) -> String {
    let line = clean_line(value);
    if line.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return line;
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in line.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_BYTES {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }
    words.join("\r\n ")
}

fn encoded_word(chunk: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(chunk.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> Submission {
        Submission {
            name: "Kovács János".into(),
            email: "test@example.com".into(),
            phone: String::new(),
            message: "Hello\nsecond line".into(),
            url_count: 0,
        }
    }

    fn mail() -> MailConfig {
        MailConfig {
            recipient: "info@vbfplus.hu".into(),
            site: "vbfplus.hu".into(),
            from_address: "noreply@vbfplus.hu".into(),
            ..MailConfig::default()
        }
    }

    #[test]
    fn test_compose() {
        let ctx = RequestContext::for_test("203.0.113.9");
        let msg = OutboundMessage::compose(&mail(), &submission(), &ctx);

        assert_eq!(msg.to, "info@vbfplus.hu");
        assert_eq!(msg.subject_raw, "[vbfplus.hu] New message: Kovács János");
        assert!(msg.subject.starts_with("=?UTF-8?B?"));
        assert_eq!(msg.envelope_sender, "noreply@vbfplus.hu");
        assert_eq!(msg.header("reply-to"), Some("<test@example.com>"));
        assert_eq!(msg.header("From"), Some("vbfplus.hu <noreply@vbfplus.hu>"));
        assert_eq!(msg.header("X-Request-ID"), Some(ctx.request_id.as_str()));

        assert!(msg.body.contains("Name: Kovács János\n"));
        assert!(msg.body.contains("Phone: -\n"));
        assert!(msg.body.contains("IP: 203.0.113.9\n"));
        assert!(msg.body.contains(&format!("Request-ID: {}\n", ctx.request_id)));
        assert!(msg.body.ends_with("Message:\nHello\nsecond line\n"));
    }

    #[test]
    fn test_subject_name_is_truncated() {
        let ctx = RequestContext::for_test("203.0.113.9");
        let mut s = submission();
        s.name = "é".repeat(60);
        let msg = OutboundMessage::compose(&mail(), &s, &ctx);
        assert!(msg.subject_raw.ends_with(&"é".repeat(40)));
        assert!(!msg.subject_raw.ends_with(&"é".repeat(41)));
    }

    #[test]
    fn test_ascii_header_is_untouched() {
        assert_eq!(encode_header_value("[site] New message: Bob"), "[site] New message: Bob");
        assert_eq!(encode_header_value("a\r\nBcc: x"), "a  Bcc: x");
    }

    #[test]
    fn test_encoded_words_decode_back() {
        let raw = "[vbfplus.hu] Új üzenet: Árvíztűrő tükörfúrógép Kovács János";
        let encoded = encode_header_value(raw);

        let mut decoded = Vec::new();
        for word in encoded.split("\r\n ") {
            assert!(word.len() <= 75, "{word}");
            let payload = word
                .strip_prefix("=?UTF-8?B?")
                .and_then(|w| w.strip_suffix("?="))
                .unwrap();
            decoded.extend(STANDARD.decode(payload).unwrap());
        }
        assert_eq!(String::from_utf8(decoded).unwrap(), raw);
    }

    #[test]
    fn test_rfc5322_uses_crlf() {
        let ctx = RequestContext::for_test("203.0.113.9");
        let text = OutboundMessage::compose(&mail(), &submission(), &ctx).to_rfc5322();
        assert!(text.starts_with("To: info@vbfplus.hu\r\nSubject: =?UTF-8?B?"));
        assert!(text.contains("\r\n\r\nNew contact request"));
        assert!(!text.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_dump_format() {
        let ctx = RequestContext::for_test("203.0.113.9");
        let msg = OutboundMessage::compose(&mail(), &submission(), &ctx);
        assert!(msg
            .to_dump()
            .starts_with("SUBJECT: [vbfplus.hu] New message: Kovács János\n\nNew contact"));
    }
}

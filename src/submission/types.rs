//! Submission data types.

use std::fmt;

use serde::Serialize;

/// Raw form fields, exactly as posted. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    /// Honeypot. Hidden from people, filled in by bots.
    pub website: String,
}

impl SubmissionForm {
    /// Decode an `application/x-www-form-urlencoded` body. Unknown keys are
    /// ignored; a repeated key keeps its last value.
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut form = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            let slot = match key.as_ref() {
                "name" => &mut form.name,
                "email" => &mut form.email,
                "phone" => &mut form.phone,
                "message" => &mut form.message,
                "website" => &mut form.website,
                _ => continue,
            };
            *slot = value.into_owned();
        }
        form
    }

    pub fn is_honeypot_hit(&self) -> bool {
        !self.website.trim().is_empty()
    }
}

/// Submission after sanitization and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    /// Number of links counted in the message.
    pub url_count: usize,
}

/// Form fields that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Phone,
    Message,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Message => "message",
        }
    }

    /// Capitalized label for public messages.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Email => "E-mail",
            Field::Phone => "Phone",
            Field::Message => "Message",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

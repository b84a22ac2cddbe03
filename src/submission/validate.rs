//! Bounds, required-field, format and link-spam checks.

use email_address::{EmailAddress, Options};
use thiserror::Error;

use crate::config::FieldLimits;
use crate::submission::sanitize::{count_links, Sanitized};
use crate::submission::types::{Field, Submission};

/// First failed check for a submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field too long: {0}")]
    FieldTooLong(Field),
    #[error("missing required field: {0}")]
    MissingRequiredField(Field),
    #[error("invalid email format")]
    InvalidEmailFormat,
    #[error("too many links: {count} > {max}")]
    TooManyLinks { count: usize, max: usize },
}

/// Run all checks in order and return the accepted submission.
pub fn validate(fields: Sanitized, limits: &FieldLimits) -> Result<Submission, ValidationError> {
    let bounds = [
        (Field::Name, &fields.name, limits.name),
        (Field::Email, &fields.email, limits.email),
        (Field::Phone, &fields.phone, limits.phone),
        (Field::Message, &fields.message, limits.message),
    ];
    for (field, value, max) in bounds {
        if value.chars().count() > max {
            return Err(ValidationError::FieldTooLong(field));
        }
    }

    let required = [
        (Field::Name, &fields.name),
        (Field::Email, &fields.email),
        (Field::Message, &fields.message),
    ];
    for (field, value) in required {
        if value.is_empty() {
            return Err(ValidationError::MissingRequiredField(field));
        }
    }

    if !is_valid_email(&fields.email) {
        return Err(ValidationError::InvalidEmailFormat);
    }

    let url_count = count_links(&fields.message);
    if limits.max_links > 0 && url_count > limits.max_links {
        return Err(ValidationError::TooManyLinks {
            count: url_count,
            max: limits.max_links,
        });
    }

    Ok(Submission {
        name: fields.name,
        email: fields.email,
        phone: fields.phone,
        message: fields.message,
        url_count,
    })
}

/// Bare `local@domain.tld` only; display names and domain literals are
/// refused so the value is safe to place in a Reply-To header.
pub fn is_valid_email(email: &str) -> bool {
    let options = Options::default()
        .with_required_tld()
        .without_display_text()
        .without_domain_literal();
    !email.contains(char::is_whitespace) && EmailAddress::parse_with_options(email, options).is_ok()
}

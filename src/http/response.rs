//! Public responses and the failure taxonomy.
//!
//! # Responsibilities
//! - Map each failure kind to one status code and fixed message
//! - Append the request id only where a user may need to report it
//! - Attach `X-Request-ID` to every pipeline response
//!
//! # Design Decisions
//! - Internal detail (I/O errors, transport output) never reaches the body
//! - Field content is never echoed back

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::security::headers::{TEXT_PLAIN_UTF8, X_REQUEST_ID};
use crate::submission::{Field, ValidationError};

/// Every way a submission can fail.
#[derive(Debug, Error)]
pub enum ContactError {
    #[error("no writable runtime storage: {0}")]
    MissingPrecondition(String),
    #[error("forbidden origin (origin/referer): {host}")]
    ForbiddenOrigin { host: String },
    #[error("rate limited")]
    RateLimited,
    #[error("field too long: {0}")]
    FieldTooLong(Field),
    #[error("missing required field: {0}")]
    MissingRequiredField(Field),
    #[error("invalid email format")]
    InvalidEmailFormat,
    #[error("too many links: {count}")]
    TooManyLinks { count: usize },
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("unexpected internal error: {0}")]
    UnexpectedInternal(String),
}

impl From<ValidationError> for ContactError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FieldTooLong(field) => ContactError::FieldTooLong(field),
            ValidationError::MissingRequiredField(field) => {
                ContactError::MissingRequiredField(field)
            }
            ValidationError::InvalidEmailFormat => ContactError::InvalidEmailFormat,
            ValidationError::TooManyLinks { count, .. } => ContactError::TooManyLinks { count },
        }
    }
}

impl ContactError {
    pub fn status(&self) -> StatusCode {
        match self {
            ContactError::MissingPrecondition(_)
            | ContactError::DeliveryFailed(_)
            | ContactError::UnexpectedInternal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ContactError::ForbiddenOrigin { .. } => StatusCode::FORBIDDEN,
            ContactError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ContactError::FieldTooLong(_)
            | ContactError::MissingRequiredField(_)
            | ContactError::InvalidEmailFormat
            | ContactError::TooManyLinks { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Fixed text shown to the client.
    pub fn public_message(&self) -> String {
        match self {
            ContactError::MissingPrecondition(_) => "Server error (runtime directory).".into(),
            ContactError::ForbiddenOrigin { .. } => "Forbidden origin.".into(),
            ContactError::RateLimited => {
                "Too many requests in a short time. Please try again later.".into()
            }
            ContactError::FieldTooLong(field) => format!("{} is too long.", field.label()),
            ContactError::MissingRequiredField(_) => "Missing required field.".into(),
            ContactError::InvalidEmailFormat => "Invalid e-mail format.".into(),
            ContactError::TooManyLinks { .. } => "The message contains too many links.".into(),
            ContactError::DeliveryFailed(_) => {
                "Could not send the message. Please try again later, or write an e-mail directly."
                    .into()
            }
            ContactError::UnexpectedInternal(_) => "A server error occurred.".into(),
        }
    }

    /// Whether the body carries the request id for support correlation.
    pub fn includes_request_id(&self) -> bool {
        matches!(
            self,
            ContactError::DeliveryFailed(_) | ContactError::UnexpectedInternal(_)
        )
    }

    /// Short machine tag for audit `reason` fields and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ContactError::MissingPrecondition(_) => "missing_precondition",
            ContactError::ForbiddenOrigin { .. } => "forbidden_origin",
            ContactError::RateLimited => "rate_limited",
            ContactError::FieldTooLong(_) => "field_too_long",
            ContactError::MissingRequiredField(_) => "missing_required_field",
            ContactError::InvalidEmailFormat => "invalid_email_format",
            ContactError::TooManyLinks { .. } => "too_many_links",
            ContactError::DeliveryFailed(_) => "delivery_failed",
            ContactError::UnexpectedInternal(_) => "unexpected_internal",
        }
    }

    pub fn is_validation(&self) -> bool {
        self.status() == StatusCode::BAD_REQUEST
    }

    /// Public response for this failure.
    pub fn to_response(&self, request_id: &str) -> Response {
        let message = self.public_message();
        let body = if self.includes_request_id() {
            format!("{message} (Error ID: {request_id})")
        } else {
            message
        };
        text_response(self.status(), body, Some(request_id))
    }
}

/// Plain-text response with the request id header.
pub fn text_response(status: StatusCode, body: String, request_id: Option<&str>) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(TEXT_PLAIN_UTF8),
    );
    if let Some(rid) = request_id.and_then(|r| HeaderValue::from_str(r).ok()) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), rid);
    }
    response
}

/// 303 to the confirmation page.
pub fn see_other(location: &str, request_id: &str) -> Response {
    let mut response = text_response(StatusCode::SEE_OTHER, String::new(), Some(request_id));
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// Generic success returned to honeypot hits.
pub fn honeypot_ok(request_id: &str) -> Response {
    text_response(StatusCode::OK, "OK".to_string(), Some(request_id))
}

/// 405 for anything but POST. No body is read.
pub fn method_not_allowed() -> Response {
    let mut response = text_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "Method Not Allowed".to_string(),
        None,
    );
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("POST"));
    response
}

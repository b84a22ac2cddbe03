//! Hardening headers attached to every response.
//!
//! # Design Decisions
//! - Applied as tower-http layers so 405 and extractor rejections carry them
//! - `X-Request-ID` is set by the handler once a request context exists

use axum::http::{header, HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

/// Correlation header echoed on every pipeline response.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub const NO_STORE: &str = "no-store, max-age=0";
pub const NOSNIFF: &str = "nosniff";
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=UTF-8";

/// `X-Content-Type-Options: nosniff`
pub fn nosniff_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static(NOSNIFF),
    )
}

/// `Cache-Control: no-store, max-age=0`
pub fn no_store_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE))
}

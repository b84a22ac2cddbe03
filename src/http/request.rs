//! Request context and correlation ids.
//!
//! # Responsibilities
//! - Generate a unique request id (128 random bits, hex)
//! - Capture client address, user agent and path for the audit log
//!
//! # Design Decisions
//! - Created once per request, before any pipeline stage runs
//! - Values are flattened to one line; they end up in log lines and
//!   message bodies

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, Uri};
use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::submission::sanitize::clean_line;

/// Per-request facts shared by every audit event and response.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: String,
    pub user_agent: String,
    pub path: String,
    pub received_at: DateTime<Local>,
}

impl RequestContext {
    pub fn new(peer: Option<SocketAddr>, headers: &HeaderMap, uri: &Uri) -> Self {
        let user_agent = headers
            .get(header::USER_AGENT)
            .map(|v| clean_line(&String::from_utf8_lossy(v.as_bytes())))
            .unwrap_or_else(|| "-".to_string());
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Self {
            request_id: new_request_id(),
            client_ip: peer
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            user_agent,
            path,
            received_at: Local::now(),
        }
    }

    /// Key the rate limiter counts against.
    pub fn rate_limit_key(&self) -> String {
        format!("ip:{}", self.client_ip)
    }

    #[cfg(test)]
    pub(crate) fn for_test(ip: &str) -> Self {
        Self {
            request_id: new_request_id(),
            client_ip: ip.to_string(),
            user_agent: "test-agent/1.0".to_string(),
            path: "/contact".to_string(),
            received_at: Local::now(),
        }
    }
}

/// 32 lowercase hex characters from 128 random bits.
pub fn new_request_id() -> String {
    Uuid::from_bytes(rand::random()).simple().to_string()
}

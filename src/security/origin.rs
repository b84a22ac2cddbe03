//! Origin/Referer allow-list check.
//!
//! Defense in depth only: a missing header passes, because browsers do not
//! always send one and the check cannot be the sole trust boundary.

use axum::http::{header, HeaderMap};
use url::Url;

/// Hosts always accepted in development mode.
const DEV_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// Outcome of a rejected origin check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenOrigin {
    /// Host extracted from the header, empty when it could not be parsed.
    pub host: String,
}

/// Allow-list of lowercase host names.
#[derive(Debug, Clone)]
pub struct OriginGuard {
    allowed: Vec<String>,
}

impl OriginGuard {
    pub fn new(allowed_hosts: &[String]) -> Self {
        Self {
            allowed: allowed_hosts.iter().map(|h| h.to_lowercase()).collect(),
        }
    }

    /// Widen the list for local testing: loopback names plus the host the
    /// request was addressed to.
    pub fn for_development(&self, request_host: Option<&str>) -> Self {
        let mut allowed = self.allowed.clone();
        allowed.extend(DEV_HOSTS.iter().map(|h| h.to_string()));
        if let Some(host) = request_host.map(strip_port).filter(|h| !h.is_empty()) {
            allowed.push(host.to_lowercase());
        }
        allowed.sort();
        allowed.dedup();
        Self { allowed }
    }

    /// Pass when no origin-indicating header is present or its host is listed.
    pub fn assert_allowed(&self, headers: &HeaderMap) -> Result<(), ForbiddenOrigin> {
        let declared = declared_bytes(headers, header::ORIGIN.as_str())
            .or_else(|| declared_bytes(headers, header::REFERER.as_str()));

        let Some(declared) = declared else {
            return Ok(());
        };

        // Present but not UTF-8 counts as an unparsable host.
        let host = std::str::from_utf8(declared)
            .ok()
            .and_then(extract_host)
            .unwrap_or_default();
        if !host.is_empty() && self.allowed.iter().any(|h| *h == host) {
            Ok(())
        } else {
            Err(ForbiddenOrigin { host })
        }
    }

    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed
    }
}

/// Raw value of a non-empty header.
fn declared_bytes<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a [u8]> {
    headers
        .get(name)
        .map(|v| v.as_bytes())
        .filter(|v| !v.is_empty())
}

/// Lowercase host of an absolute URL, without IPv6 brackets.
fn extract_host(value: &str) -> Option<String> {
    let url = Url::parse(value).ok()?;
    let host = url.host_str()?;
    Some(host.trim_start_matches('[').trim_end_matches(']').to_lowercase())
}

/// Drop a trailing `:port` from a Host header value.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // [::1]:8000
        return host
            .split_once(']')
            .map(|(h, _)| h.trim_start_matches('['))
            .unwrap_or(host);
    }
    match host.rsplit_once(':') {
        Some((h, port)) if !h.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => h,
        _ => host,
    }
}

//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming submission:
//!     → origin.rs (Origin/Referer allow-list)
//!     → rate_limit.rs (durable per-IP sliding window)
//!     → Pass to sanitization
//!
//! Every response:
//!     → headers.rs (nosniff, no-store)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: origin check never acts alone
//! - Fail closed on quota, fail open on corrupt rate-limit state
//! - No trust in client input

pub mod headers;
pub mod origin;
pub mod rate_limit;

pub use origin::{ForbiddenOrigin, OriginGuard};
pub use rate_limit::{RateLimitError, RateLimiter};

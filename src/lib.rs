//! Contact form relay.
//!
//! Accepts a website contact form over HTTP, screens it (origin, quota,
//! honeypot, validation), turns it into a notification email and keeps a
//! structured audit trail of every decision.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /contact
//!     ─────────────▶ http ──▶ pipeline ──▶ security (origin, quota)
//!                                │
//!                                ├──▶ submission (parse, sanitize, validate)
//!                                ├──▶ mail (compose, sendmail / dev dump)
//!                                └──▶ audit (JSON lines, retention)
//!
//!     Cross-cutting: config, storage, lifecycle, observability
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod pipeline;
pub mod submission;

// Side effects
pub mod audit;
pub mod mail;
pub mod storage;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

//! Audit subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline stage
//!     → event.rs (AuditEvent: request context + kind + fields)
//!     → monitor.rs (one JSON line, append + exclusive lock)
//!     → monitor/monitor-YYYYMMDD.log
//!
//! sampled per request, or on a timer:
//!     → retention.rs (delete rotated files past retention)
//! ```
//!
//! # Design Decisions
//! - Best-effort: audit failures never change a response
//! - No raw email/name/phone unless explicitly enabled

pub mod event;
pub mod monitor;
pub mod retention;

pub use event::{email_hash, AuditEvent, EventKind};
pub use monitor::AuditMonitor;

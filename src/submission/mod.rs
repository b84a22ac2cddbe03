//! Submission handling subsystem.
//!
//! # Data Flow
//! ```text
//! form body
//!     → types.rs (SubmissionForm, every field present)
//!     → sanitize.rs (normalize, filter characters)
//!     → validate.rs (bounds → required → email → links)
//!     → Submission (accepted, consumed once)
//! ```

pub mod sanitize;
pub mod types;
pub mod validate;

pub use sanitize::Sanitized;
pub use types::{Field, Submission, SubmissionForm};
pub use validate::{validate, ValidationError};

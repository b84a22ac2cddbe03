//! Notification subsystem.
//!
//! # Data Flow
//! ```text
//! Submission + RequestContext
//!     → message.rs (subject, body, headers, envelope sender)
//!     → transport.rs (sendmail, or file dump in development mode)
//! ```

pub mod message;
pub mod transport;

pub use message::OutboundMessage;
pub use transport::{Delivery, DeliveryError, DevDumpTransport, MailTransport, SendmailTransport};

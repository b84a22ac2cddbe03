//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → handler.rs (POST only, read body)
//!     → request.rs (request id, client ip, user agent)
//!     → [pipeline decides the outcome]
//!     → response.rs (status, fixed message, headers)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use request::{new_request_id, RequestContext};
pub use response::ContactError;
pub use server::HttpServer;

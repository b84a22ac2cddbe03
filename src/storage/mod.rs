//! Durable state subsystem.
//!
//! Everything the relay persists lives under one private directory tree:
//! rate-limit records, audit logs and development dumps. Nothing else is
//! shared between requests.

pub mod runtime_dir;

pub use runtime_dir::{ensure_dir, RuntimeDirs, StorageError};

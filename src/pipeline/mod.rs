//! Submission processing pipeline.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, Outcome, Stage};

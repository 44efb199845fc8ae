//! Wave execution state for spec-driven workflows.
//!
//! Reads a spec directory (task list, wave runs, checkpoint verdicts) and
//! resolves what should happen next, and records the same artifacts in a
//! per-spec SQLite history plus a workspace-wide full-text index.

pub mod config;
pub mod error;
pub mod layout;
pub mod log;
pub mod stage;
pub mod store;
pub mod tasks;
pub mod wave;

pub use error::{Error, Result};

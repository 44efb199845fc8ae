//! Integration test suite for spw.
//!
//! These tests build real spec directories on disk and run the public API
//! against them, from parsing `tasks.md` through checkpoint resolution to
//! harvesting into `spec.db` and searching the workspace index.
//!
//! # Test Categories
//!
//! - `next_wave`: next-work resolution scenarios
//! - `checkpoint`: checkpoint precedence, wave scanning, and resume
//! - `harvest`: run directory and artifact harvesting
//! - `index`: workspace search index

mod fixtures;

mod checkpoint;
mod harvest;
mod index;
mod next_wave;

//! Task documents (`tasks.md`): parsing, next-work resolution, validation,
//! complexity scoring, and in-place status updates.
//!
//! The body of the document is authoritative. Frontmatter `task_ids` are
//! informational and only produce warnings when they disagree.

pub mod complexity;
pub mod mark;
pub mod next;
pub mod parser;
pub mod types;
pub mod validate;

pub use complexity::score_complexity;
pub use mark::{check_impl_log, mark_task_in_file, MarkOptions};
pub use next::{resolve_next_wave, resolve_next_wave_with};
pub use parser::{parse, parse_file, reconcile_task_ids, Parser, TaskPatterns};
pub use types::{
    ComplexityResult, Document, Frontmatter, GenerationStrategy, ModelHint, NextAction,
    NextWaveResult, Task, TaskCounts, TaskStatus, ValidateResult, WavePlanEntry,
};
pub use validate::{validate, validate_document};

//! Wave-level state resolution.
//!
//! Everything here reads the spec directory through [`WaveFs`] and returns
//! plain values; missing or corrupt files degrade to `missing`/`no_runs`
//! style results rather than errors.

pub mod checkpoint;
pub mod fs;
pub mod resume;
pub mod scanner;
pub mod summary;
pub mod types;

pub use checkpoint::{resolve_checkpoint, CheckpointResolver};
pub use fs::{DiskFs, MemoryFs, WaveFs};
pub use resume::{compute_resume, compute_resume_with, resume_from_states};
pub use scanner::{attach_task_ids, scan_waves, scan_waves_with};
pub use summary::{generate_summary, generate_summary_with};
pub use types::{
    CheckpointResult, CheckpointSource, CheckpointStatus, ResumeAction, ResumeState, SummarySource,
    WaveState, WaveStatus, WaveSummary,
};

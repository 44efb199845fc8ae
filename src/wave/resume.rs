use std::path::Path;

use super::fs::{DiskFs, WaveFs};
use super::scanner::scan_waves_with;
use super::types::{ResumeAction, ResumeState, WaveState, WaveStatus};
use crate::config::DEFAULT_CHECKPOINT_SUBAGENT;

/// Decide where to pick up execution of a spec from its wave directories.
pub fn compute_resume(spec_dir: &Path) -> ResumeState {
    compute_resume_with(&DiskFs, spec_dir, DEFAULT_CHECKPOINT_SUBAGENT)
}

pub fn compute_resume_with<F: WaveFs + ?Sized>(fs: &F, spec_dir: &Path, subagent: &str) -> ResumeState {
    resume_from_states(&scan_waves_with(fs, spec_dir, subagent))
}

/// Blocked waves first, then in-progress, then untouched; otherwise done.
pub fn resume_from_states(waves: &[WaveState]) -> ResumeState {
    let state = |action, wave, reason: &str| ResumeState {
        action,
        wave,
        reason: reason.to_string(),
    };
    let first = |status: WaveStatus| waves.iter().find(|w| w.status == status);

    let Some(last) = waves.last() else {
        return state(ResumeAction::NextWave, 1, "no waves found, start first wave");
    };
    if let Some(w) = first(WaveStatus::Blocked) {
        return state(ResumeAction::Blocked, w.wave, "wave is blocked by checkpoint failure");
    }
    if let Some(w) = first(WaveStatus::InProgress) {
        return state(
            ResumeAction::ContinueWave,
            w.wave,
            "wave has execution runs but no passing checkpoint",
        );
    }
    if let Some(w) = first(WaveStatus::Pending) {
        return state(ResumeAction::ContinueWave, w.wave, "wave exists but has no runs yet");
    }
    state(ResumeAction::Done, last.wave, "all waves complete")
}

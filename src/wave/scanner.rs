//! Wave lifecycle classification from directory contents.

use std::path::Path;

use super::checkpoint::CheckpointResolver;
use super::fs::{self, DiskFs, WaveFs};
use super::types::{CheckpointStatus, WaveState, WaveStatus};
use crate::config::DEFAULT_CHECKPOINT_SUBAGENT;
use crate::layout;
use crate::spwlog_debug;
use crate::tasks::Document;

/// Scan every wave directory of a spec, ascending by wave number.
pub fn scan_waves(spec_dir: &Path) -> Vec<WaveState> {
    scan_waves_with(&DiskFs, spec_dir, DEFAULT_CHECKPOINT_SUBAGENT)
}

pub fn scan_waves_with<F: WaveFs + ?Sized>(fs: &F, spec_dir: &Path, subagent: &str) -> Vec<WaveState> {
    let resolver = CheckpointResolver::new(fs, subagent);
    let states: Vec<WaveState> = fs::list_wave_dirs(fs, spec_dir)
        .into_iter()
        .map(|entry| {
            let wave = entry.number;
            let exec_runs = fs::count_run_dirs(fs, &layout::wave_exec_path(spec_dir, wave));
            let check_runs = fs::count_run_dirs(fs, &layout::wave_checkpoint_path(spec_dir, wave));

            let checkpoint = (check_runs > 0).then(|| resolver.resolve(spec_dir, wave));
            WaveState {
                wave,
                status: classify(exec_runs, check_runs, checkpoint.as_ref().map(|c| c.status)),
                task_ids: Vec::new(),
                exec_runs,
                check_runs,
                checkpoint,
            }
        })
        .collect();

    spwlog_debug!("scanned {} waves under {}", states.len(), spec_dir.display());
    states
}

fn classify(exec_runs: u32, check_runs: u32, checkpoint: Option<CheckpointStatus>) -> WaveStatus {
    if exec_runs == 0 && check_runs == 0 {
        return WaveStatus::Pending;
    }
    match checkpoint {
        Some(CheckpointStatus::Pass) => WaveStatus::Complete,
        Some(CheckpointStatus::Blocked) => WaveStatus::Blocked,
        _ if exec_runs > 0 => WaveStatus::InProgress,
        _ => WaveStatus::Pending,
    }
}

/// Fill `task_ids` from the document's wave plan, falling back to the
/// tasks' own `Wave:` metadata for waves the plan does not list.
pub fn attach_task_ids(states: &mut [WaveState], doc: &Document) {
    for state in states.iter_mut() {
        state.task_ids = match doc.wave_plan.iter().find(|e| e.wave == state.wave) {
            Some(entry) => entry.task_ids.clone(),
            None => doc.tasks_in_wave(state.wave).map(|t| t.id.clone()).collect(),
        };
    }
}

//! Checkpoint verdict resolution.
//!
//! Precedence, per wave:
//! 1. No `checkpoint/` directory: `missing`.
//! 2. `_latest.json` naming an existing run directory: that run decides.
//!    The designated subagent's `status.json` is read first, then any other
//!    subagent's, then the status recorded in `_latest.json` itself.
//! 3. Otherwise the highest `run-NNN` directory decides; none at all is `no_runs`.
//!
//! `_wave-summary.json` is a cache. It never decides a verdict; when it
//! disagrees with the resolved one the result is flagged stale.

use std::path::Path;

use super::fs::{self, DiskFs, WaveFs};
use super::types::{CheckpointResult, CheckpointSource, CheckpointStatus};
use crate::config::DEFAULT_CHECKPOINT_SUBAGENT;
use crate::layout::{self, STATUS_JSON};
use crate::{spwlog_debug, spwlog_warn};

/// Resolves checkpoint verdicts through an injected filesystem.
pub struct CheckpointResolver<'a, F: WaveFs + ?Sized> {
    fs: &'a F,
    subagent: &'a str,
}

impl<'a, F: WaveFs + ?Sized> CheckpointResolver<'a, F> {
    /// `subagent` is the name whose `status.json` is authoritative within a run.
    pub fn new(fs: &'a F, subagent: &'a str) -> Self {
        Self { fs, subagent }
    }

    pub fn resolve(&self, spec_dir: &Path, wave: u32) -> CheckpointResult {
        let check_dir = layout::wave_checkpoint_path(spec_dir, wave);
        if !self.fs.is_dir(&check_dir) {
            spwlog_debug!("checkpoint wave={} missing dir {}", wave, check_dir.display());
            return CheckpointResult::new(wave, CheckpointStatus::Missing, CheckpointSource::DirScan);
        }

        let mut result = self
            .from_latest(spec_dir, wave, &check_dir)
            .unwrap_or_else(|| self.from_dir_scan(wave, &check_dir));

        self.flag_stale(spec_dir, &mut result);
        spwlog_debug!(
            "checkpoint wave={} status={} source={} run={:?} stale={}",
            wave,
            result.status,
            result.source,
            result.run_id,
            result.stale_flag
        );
        result
    }

    /// `None` when `_latest.json` is absent, unparsable, empty, or points at
    /// a run directory that does not exist.
    fn from_latest(&self, spec_dir: &Path, wave: u32, check_dir: &Path) -> Option<CheckpointResult> {
        let latest = fs::read_latest_doc(self.fs, &layout::wave_latest_path(spec_dir, wave))?;
        let run_id = latest.run_id.trim();
        if run_id.is_empty() {
            return None;
        }
        let run_path = check_dir.join(run_id);
        if !self.fs.is_dir(&run_path) {
            spwlog_debug!(
                "checkpoint wave={} _latest.json names {} but the run is gone; scanning",
                wave,
                run_id
            );
            return None;
        }

        let status = self
            .run_status(&run_path)
            .or_else(|| CheckpointStatus::from_verdict(&latest.status));

        let mut result = CheckpointResult::new(
            wave,
            status.unwrap_or(CheckpointStatus::NoRuns),
            CheckpointSource::LatestJson,
        );
        result.run_id = Some(run_id.to_string());
        if status.is_none() {
            result.detail = Some(format!("checkpoint run {} has no status.json", run_id));
        }
        Some(result)
    }

    fn from_dir_scan(&self, wave: u32, check_dir: &Path) -> CheckpointResult {
        let Some((run_id, _)) = fs::latest_run_dir(self.fs, check_dir) else {
            return CheckpointResult::new(wave, CheckpointStatus::NoRuns, CheckpointSource::DirScan);
        };

        let status = self.run_status(&check_dir.join(&run_id));
        let mut result = CheckpointResult::new(
            wave,
            status.unwrap_or(CheckpointStatus::NoRuns),
            CheckpointSource::DirScan,
        );
        if status.is_none() {
            result.detail = Some("checkpoint run exists but no status.json found".to_string());
        }
        result.run_id = Some(run_id);
        result
    }

    /// Verdict of one run: designated subagent first, then any subagent in name order.
    pub(crate) fn run_status(&self, run_path: &Path) -> Option<CheckpointStatus> {
        let designated = run_path.join(self.subagent).join(STATUS_JSON);
        if let Some(status) = fs::read_status_doc(self.fs, &designated)
            .and_then(|doc| CheckpointStatus::from_verdict(&doc.status))
        {
            return Some(status);
        }

        self.fs
            .child_dirs(run_path)
            .into_iter()
            .filter(|name| name != self.subagent)
            .find_map(|name| {
                fs::read_status_doc(self.fs, &run_path.join(name).join(STATUS_JSON))
                    .and_then(|doc| CheckpointStatus::from_verdict(&doc.status))
            })
    }

    fn flag_stale(&self, spec_dir: &Path, result: &mut CheckpointResult) {
        if !matches!(result.status, CheckpointStatus::Pass | CheckpointStatus::Blocked) {
            return;
        }
        let Some(summary) =
            fs::read_status_doc(self.fs, &layout::wave_summary_path(spec_dir, result.wave))
        else {
            return;
        };
        if summary.status.trim() == result.status.as_str() {
            return;
        }
        result.stale_flag = true;
        result.detail = Some(format!(
            "wave-summary says {} but latest run says {}",
            summary.status.trim(),
            result.status
        ));
        spwlog_warn!(
            "stale wave summary for wave {}: summary={} resolved={}",
            result.wave,
            summary.status.trim(),
            result.status
        );
    }
}

/// Resolve a wave's checkpoint on disk with the default checkpoint subagent.
pub fn resolve_checkpoint(spec_dir: &Path, wave: u32) -> CheckpointResult {
    CheckpointResolver::new(&DiskFs, DEFAULT_CHECKPOINT_SUBAGENT).resolve(spec_dir, wave)
}

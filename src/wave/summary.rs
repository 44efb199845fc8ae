//! Best-effort wave summary for status displays.
//!
//! Unlike checkpoint resolution this reads every source the wave may carry,
//! in order: `_wave-summary.json` (cross-checked against `_latest.json`),
//! `_latest.json`, the latest checkpoint run, the latest execution run.
//! `_latest.json` stands for the verdict of the run it names, the same one
//! checkpoint resolution reads.

use std::path::Path;

use super::checkpoint::CheckpointResolver;
use super::fs::{self, DiskFs, WaveFs};
use super::types::{SummarySource, WaveSummary};
use crate::config::DEFAULT_CHECKPOINT_SUBAGENT;
use crate::layout::{self, LatestDoc, STATUS_JSON};
use crate::spwlog_debug;

pub fn generate_summary(spec_dir: &Path, wave: u32) -> WaveSummary {
    generate_summary_with(&DiskFs, spec_dir, wave, DEFAULT_CHECKPOINT_SUBAGENT)
}

pub fn generate_summary_with<F: WaveFs + ?Sized>(
    fs: &F,
    spec_dir: &Path,
    wave: u32,
    subagent: &str,
) -> WaveSummary {
    let make = |status: &str, summary: &str, source: SummarySource| WaveSummary {
        wave,
        status: status.to_string(),
        summary: summary.to_string(),
        source,
        stale_flag: false,
    };

    if !fs.is_dir(&layout::wave_path(spec_dir, wave)) {
        return make("missing", "", SummarySource::None);
    }

    let latest = fs::read_latest_doc(fs, &layout::wave_latest_path(spec_dir, wave));
    let latest_status = latest
        .as_ref()
        .and_then(|doc| latest_verdict(fs, spec_dir, wave, subagent, doc));

    if let Some(doc) = fs::read_status_doc(fs, &layout::wave_summary_path(spec_dir, wave)) {
        return match (&latest, &latest_status) {
            (Some(latest), Some(verdict)) if verdict != doc.status.trim() => {
                spwlog_debug!(
                    "wave {} summary says {} but _latest.json resolves to {}",
                    wave,
                    doc.status,
                    verdict
                );
                WaveSummary {
                    stale_flag: true,
                    ..make(verdict.as_str(), &latest.summary, SummarySource::LatestJson)
                }
            }
            _ => make(&doc.status, &doc.summary, SummarySource::WaveSummary),
        };
    }

    if let (Some(latest), Some(verdict)) = (&latest, &latest_status) {
        return make(verdict.as_str(), &latest.summary, SummarySource::LatestJson);
    }

    for dir in [
        layout::wave_checkpoint_path(spec_dir, wave),
        layout::wave_exec_path(spec_dir, wave),
    ] {
        if let Some((run, _)) = fs::latest_run_dir(fs, &dir) {
            if let Some((status, summary)) = aggregate_run(fs, &dir.join(run)) {
                return make(status, &summary, SummarySource::CheckpointScan);
            }
        }
    }

    make("in_progress", "wave exists but no summary data found", SummarySource::None)
}

/// Status `_latest.json` stands for: the verdict of the run it names when that
/// run exists, else its own non-empty `status` field.
fn latest_verdict<F: WaveFs + ?Sized>(
    fs: &F,
    spec_dir: &Path,
    wave: u32,
    subagent: &str,
    doc: &LatestDoc,
) -> Option<String> {
    let run_id = doc.run_id.trim();
    if !run_id.is_empty() {
        let run_path = layout::wave_checkpoint_path(spec_dir, wave).join(run_id);
        if fs.is_dir(&run_path) {
            if let Some(status) = CheckpointResolver::new(fs, subagent).run_status(&run_path) {
                return Some(status.as_str().to_string());
            }
        }
    }
    let status = doc.status.trim();
    (!status.is_empty()).then(|| status.to_string())
}

/// Fold every subagent status in a run: any blocked wins, then any pass.
/// Summary text is taken from the last subagent read.
fn aggregate_run<F: WaveFs + ?Sized>(fs: &F, run_dir: &Path) -> Option<(&'static str, String)> {
    let mut blocked = false;
    let mut pass = false;
    let mut last_summary = String::new();

    for name in fs.child_dirs(run_dir) {
        let Some(doc) = fs::read_status_doc(fs, &run_dir.join(name).join(STATUS_JSON)) else {
            continue;
        };
        match doc.status.as_str() {
            "blocked" => blocked = true,
            "pass" => pass = true,
            _ => {}
        }
        last_summary = doc.summary;
    }

    if blocked {
        Some(("blocked", last_summary))
    } else if pass {
        Some(("pass", last_summary))
    } else if !last_summary.is_empty() {
        Some(("in_progress", last_summary))
    } else {
        None
    }
}

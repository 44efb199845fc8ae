//! Checkpoint, wave scanning, and resume integration tests.
//!
//! These tests lay out wave directories on disk the way agents write them
//! and verify that conflicting status sources resolve deterministically.

use spw::config::DEFAULT_CHECKPOINT_SUBAGENT as GATE;
use spw::wave::{
    attach_task_ids, compute_resume, generate_summary, resolve_checkpoint, scan_waves,
    CheckpointSource, CheckpointStatus, ResumeAction, SummarySource, WaveStatus,
};

use crate::fixtures::{SpecFixture, TWO_WAVE_TASKS};

/// Test: Latest run beats a stale wave summary
/// Given _wave-summary.json says blocked and _latest.json points at run-003 which passed
/// When the checkpoint is resolved
/// Then the verdict is pass with the stale flag set
#[test]
fn test_scenario_d_latest_beats_stale_summary() {
    let fixture = SpecFixture::new();
    fixture.checkpoint_status(1, 1, GATE, "blocked");
    fixture.checkpoint_status(1, 2, GATE, "blocked");
    fixture.checkpoint_status(1, 3, GATE, "pass");
    fixture.wave_summary(1, "blocked");
    fixture.latest(1, "run-003", "pass");

    let result = resolve_checkpoint(&fixture.spec_dir, 1);

    assert_eq!(result.status, CheckpointStatus::Pass);
    assert!(result.stale_flag);
    assert_eq!(result.run_id.as_deref(), Some("run-003"));
    assert_eq!(result.source, CheckpointSource::LatestJson);
}

/// Test: Directory scan without a latest pointer
/// Given two checkpoint runs and no _latest.json
/// When the checkpoint is resolved
/// Then the highest-numbered run decides
#[test]
fn test_dir_scan_uses_highest_run() {
    let fixture = SpecFixture::new();
    fixture.checkpoint_status(1, 1, GATE, "pass");
    fixture.checkpoint_status(1, 2, GATE, "blocked");

    let result = resolve_checkpoint(&fixture.spec_dir, 1);

    assert_eq!(result.status, CheckpointStatus::Blocked);
    assert_eq!(result.source, CheckpointSource::DirScan);
    assert_eq!(result.run_id.as_deref(), Some("run-002"));
    assert!(!result.stale_flag);
}

/// Test: Missing artifacts degrade instead of failing
/// Given a wave with no checkpoint directory and a wave with an empty one
/// When each checkpoint is resolved
/// Then the results are missing and no_runs
#[test]
fn test_missing_and_empty_checkpoints() {
    let fixture = SpecFixture::new();
    fixture.exec_run(1, 1);
    std::fs::create_dir_all(spw::layout::wave_checkpoint_path(&fixture.spec_dir, 2)).unwrap();

    assert_eq!(
        resolve_checkpoint(&fixture.spec_dir, 1).status,
        CheckpointStatus::Missing
    );
    assert_eq!(
        resolve_checkpoint(&fixture.spec_dir, 2).status,
        CheckpointStatus::NoRuns
    );
}

/// Test: Corrupt status files are ignored
/// Given a checkpoint run whose status.json is not JSON
/// When the checkpoint is resolved
/// Then the run counts as having no status
#[test]
fn test_corrupt_status_is_absent() {
    let fixture = SpecFixture::new();
    let run_dir = fixture.checkpoint_status(1, 1, GATE, "pass");
    std::fs::write(run_dir.join(GATE).join("status.json"), "{not json").unwrap();

    let result = resolve_checkpoint(&fixture.spec_dir, 1);
    assert_eq!(result.status, CheckpointStatus::NoRuns);
    assert!(result.detail.is_some());
}

/// Test: Wave scan and resume
/// Given wave 1 complete, wave 2 in progress, wave 3 untouched
/// When the waves are scanned and resume is computed
/// Then each wave is classified and resume continues wave 2
#[test]
fn test_scan_and_resume() {
    let fixture = SpecFixture::new();
    fixture.write_tasks(TWO_WAVE_TASKS);
    fixture.exec_run(1, 1);
    fixture.checkpoint_status(1, 1, GATE, "pass");
    fixture.exec_run(2, 1);
    std::fs::create_dir_all(spw::layout::wave_path(&fixture.spec_dir, 3)).unwrap();

    let mut waves = scan_waves(&fixture.spec_dir);
    let statuses: Vec<WaveStatus> = waves.iter().map(|w| w.status).collect();
    assert_eq!(
        statuses,
        vec![WaveStatus::Complete, WaveStatus::InProgress, WaveStatus::Pending]
    );

    attach_task_ids(&mut waves, &fixture.document());
    assert_eq!(waves[0].task_ids, vec!["1", "2"]);
    assert_eq!(waves[1].task_ids, vec!["3", "4"]);
    assert!(waves[2].task_ids.is_empty());

    let resume = compute_resume(&fixture.spec_dir);
    assert_eq!(resume.action, ResumeAction::ContinueWave);
    assert_eq!(resume.wave, 2);
}

/// Test: Resume prefers a blocked wave
/// Given wave 1 blocked at checkpoint and wave 2 in progress
/// When resume is computed
/// Then the result is blocked at wave 1
#[test]
fn test_resume_blocked_first() {
    let fixture = SpecFixture::new();
    fixture.exec_run(1, 1);
    fixture.checkpoint_status(1, 1, GATE, "blocked");
    fixture.exec_run(2, 1);

    let resume = compute_resume(&fixture.spec_dir);
    assert_eq!(resume.action, ResumeAction::Blocked);
    assert_eq!(resume.wave, 1);
}

/// Test: Resume with no waves
/// Given a spec with no execution directory
/// When resume is computed
/// Then the first wave should be started
#[test]
fn test_resume_without_waves() {
    let fixture = SpecFixture::new();
    let resume = compute_resume(&fixture.spec_dir);
    assert_eq!(resume.action, ResumeAction::NextWave);
    assert_eq!(resume.wave, 1);
}

/// Test: Summary generation follows source precedence
/// Given one wave with a disagreeing summary and latest pointer, and one with only runs
/// When summaries are generated
/// Then _latest.json wins with the stale flag, and the second falls back to the run scan
#[test]
fn test_generate_summary_sources() {
    let fixture = SpecFixture::new();
    fixture.checkpoint_status(1, 1, GATE, "pass");
    fixture.wave_summary(1, "blocked");
    fixture.latest(1, "run-001", "pass");
    fixture.checkpoint_status(2, 1, GATE, "blocked");

    let first = generate_summary(&fixture.spec_dir, 1);
    assert_eq!(first.status, "pass");
    assert_eq!(first.source, SummarySource::LatestJson);
    assert!(first.stale_flag);

    let second = generate_summary(&fixture.spec_dir, 2);
    assert_eq!(second.status, "blocked");
    assert_eq!(second.source, SummarySource::CheckpointScan);

    let missing = generate_summary(&fixture.spec_dir, 9);
    assert_eq!(missing.status, "missing");
    assert_eq!(missing.source, SummarySource::None);
}

/// Test: Summary and checkpoint agree on a bare _latest.json
/// Given a passing run, a passing wave summary, and _latest.json naming the run without a status
/// When the summary and the checkpoint are resolved
/// Then both report pass and neither is flagged stale
#[test]
fn test_summary_reads_run_named_by_latest() {
    let fixture = SpecFixture::new();
    fixture.checkpoint_status(1, 1, GATE, "pass");
    fixture.wave_summary(1, "pass");
    std::fs::write(
        spw::layout::wave_latest_path(&fixture.spec_dir, 1),
        r#"{"run_id":"run-001"}"#,
    )
    .unwrap();

    let checkpoint = resolve_checkpoint(&fixture.spec_dir, 1);
    let summary = generate_summary(&fixture.spec_dir, 1);
    assert_eq!(checkpoint.status, CheckpointStatus::Pass);
    assert!(!checkpoint.stale_flag);
    assert_eq!(summary.status, "pass");
    assert_eq!(summary.source, SummarySource::WaveSummary);
    assert!(!summary.stale_flag);
}

//! Harvest store integration tests.
//!
//! These tests harvest run directories and artifacts from a spec on disk into
//! `spec.db` and verify the records that come back out.

use std::thread;
use std::time::Duration;

use spw::config::DEFAULT_CHECKPOINT_SUBAGENT as GATE;
use spw::layout::{self, Command};
use spw::store::{RunStatus, Store};
use spw::tasks::{mark_task_in_file, MarkOptions, TaskStatus};

use crate::fixtures::{SpecFixture, TWO_WAVE_TASKS};

/// Test: Mixed verdicts block the run
/// Given a checkpoint run with one passing and one blocked subagent plus a handoff
/// When the run directory is harvested
/// Then the run is blocked and exactly two subagents are recorded
#[test]
fn test_scenario_e_harvest_blocked_run() {
    let fixture = SpecFixture::new();
    fixture.checkpoint_status(1, 1, GATE, "pass");
    let run_dir = fixture.checkpoint_status(1, 1, "qa-reviewer", "blocked");
    std::fs::write(run_dir.join(layout::HANDOFF_MD), "# Handoff\n").unwrap();

    let mut store = Store::open(&fixture.spec_dir).unwrap();
    let run_id = store
        .harvest_run_dir(&run_dir, Command::Checkpoint, Some(1))
        .unwrap();

    let run = store
        .get_run(Command::Checkpoint, 1, Some(1))
        .unwrap()
        .expect("run recorded");
    assert_eq!(run.status, RunStatus::Blocked);
    assert_eq!(store.list_subagents(run_id).unwrap().len(), 2);

    // A second harvest must not duplicate anything.
    store
        .harvest_run_dir(&run_dir, Command::Checkpoint, Some(1))
        .unwrap();
    assert_eq!(store.list_subagents(run_id).unwrap().len(), 2);
    assert_eq!(store.list_runs(Command::Checkpoint).unwrap().len(), 1);
}

/// Test: Re-harvesting unchanged content is a no-op
/// Given an artifact already harvested
/// When it is harvested again with the same bytes
/// Then no row is added and updated_at does not move
#[test]
fn test_artifact_harvest_is_idempotent() {
    let fixture = SpecFixture::new();
    let path = fixture.write(layout::DESIGN_MD, "# Design\n\nUse SQLite.\n");
    let store = Store::open(&fixture.spec_dir).unwrap();

    store.harvest_artifact("design", layout::DESIGN_MD, &path).unwrap();
    let before = store.get_artifact(layout::DESIGN_MD).unwrap().unwrap();

    thread::sleep(Duration::from_millis(1100));
    let changed = store.harvest_artifact("design", layout::DESIGN_MD, &path).unwrap();
    let after = store.get_artifact(layout::DESIGN_MD).unwrap().unwrap();

    assert!(!changed);
    assert_eq!(before.updated_at, after.updated_at);
    assert_eq!(store.list_artifacts("design").unwrap().len(), 1);
}

/// Test: Store survives reopening
/// Given harvested runs, waves, tasks, and a completion summary
/// When the store is closed and reopened
/// Then every record is still there
#[test]
fn test_store_persists_across_open() {
    let fixture = SpecFixture::new();
    fixture.write_tasks(TWO_WAVE_TASKS);
    let exec = fixture.exec_run(1, 1);
    fixture.checkpoint_status(1, 1, GATE, "pass");
    let log = fixture.impl_log("1");

    {
        let mut store = Store::open(&fixture.spec_dir).unwrap();
        store.harvest_run_dir(&exec, Command::Exec, Some(1)).unwrap();
        store.harvest_impl_log("1", &log).unwrap();
        assert_eq!(store.harvest_waves(GATE).unwrap(), 1);
        assert_eq!(store.sync_document(&fixture.document()).unwrap(), 4);
        store
            .save_completion_summary("spec: demo", "All waves done.")
            .unwrap();
        store.close().unwrap();
    }

    let store = Store::open(&fixture.spec_dir).unwrap();
    assert_eq!(
        store.latest_run(Command::Exec).unwrap().unwrap().status,
        RunStatus::InProgress
    );
    assert!(store.get_impl_log("1").unwrap().is_some());
    let wave = store.get_wave(1).unwrap().unwrap();
    assert_eq!(wave.status, "complete");
    assert_eq!(wave.exec_runs, 1);
    assert_eq!(store.list_tasks().unwrap().len(), 4);
    assert_eq!(
        store.get_completion_summary().unwrap().unwrap().body,
        "All waves done."
    );
}

/// Test: Marking a task mirrors into the store
/// Given a synced document
/// When a task is marked done with store sync enabled
/// Then both tasks.md and spec.db agree
#[test]
fn test_mark_mirrors_into_store() {
    let fixture = SpecFixture::new();
    let tasks = fixture.write_tasks(TWO_WAVE_TASKS);
    {
        let mut store = Store::open(&fixture.spec_dir).unwrap();
        store.sync_document(&fixture.document()).unwrap();
    }

    let opts = MarkOptions {
        require_impl_log: false,
        spec_dir: Some(fixture.spec_dir.as_path()),
        sync_store: true,
    };
    mark_task_in_file(&tasks, "3", TaskStatus::Done, &opts).unwrap();

    assert_eq!(
        fixture.document().task_by_id("3").unwrap().status,
        TaskStatus::Done
    );
    let store = Store::open(&fixture.spec_dir).unwrap();
    let record = store.get_task("3").unwrap().unwrap();
    assert_eq!(record.status, "done");
    assert_eq!(record.title, "API layer");
}

//! Next-work resolution integration tests.
//!
//! These tests write `tasks.md` and checkpoint runs to disk and verify the
//! single action `resolve_next_wave` settles on.

use spw::config::DEFAULT_CHECKPOINT_SUBAGENT as GATE;
use spw::tasks::{mark_task_in_file, resolve_next_wave, MarkOptions, NextAction, TaskStatus};

use crate::fixtures::{SpecFixture, TWO_WAVE_TASKS};

/// Test: Next wave after a passing checkpoint
/// Given wave 1 done with a passing checkpoint and a dependency chain in wave 2
/// When the next wave is resolved
/// Then only the task whose dependencies are done is executable
#[test]
fn test_scenario_a_executes_ready_tasks() {
    let fixture = SpecFixture::new();
    fixture.write_tasks(TWO_WAVE_TASKS);
    fixture.checkpoint_status(1, 1, GATE, "pass");

    let result = resolve_next_wave(&fixture.document(), &fixture.spec_dir);

    assert_eq!(result.action, NextAction::Execute);
    assert_eq!(result.wave, Some(2));
    assert_eq!(result.task_ids, vec!["3"]);
    assert!(result.deferred_ready.is_empty());
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
}

/// Test: Blocked checkpoint stops progress
/// Given wave 1 done but its checkpoint blocked
/// When the next wave is resolved
/// Then the result is blocked at wave 1
#[test]
fn test_scenario_b_blocked_checkpoint() {
    let fixture = SpecFixture::new();
    fixture.write_tasks(TWO_WAVE_TASKS);
    fixture.checkpoint_status(1, 1, GATE, "blocked");

    let result = resolve_next_wave(&fixture.document(), &fixture.spec_dir);

    assert_eq!(result.action, NextAction::Blocked);
    assert_eq!(result.wave, Some(1));
    assert!(result.task_ids.is_empty());
}

/// Test: Deferred work surfaces once regular work is done
/// Given tasks 1-4 done, both checkpoints passing, and deferred task 5 depending on 4
/// When the next wave is resolved
/// Then task 5 is reported as deferred-ready
#[test]
fn test_scenario_c_deferred_ready() {
    let fixture = SpecFixture::new();
    fixture.write_tasks(
        &(TWO_WAVE_TASKS
            .replace("task_ids: [1, 2, 3, 4]", "task_ids: [1, 2, 3, 4, 5]")
            .replace("- [ ]", "- [x]")
            + "\n## Deferred\n\n- [ ] 5 Polish\n  Depends on: 4\n"),
    );
    fixture.checkpoint_status(1, 1, GATE, "pass");
    fixture.checkpoint_status(2, 1, GATE, "pass");

    let doc = fixture.document();
    assert!(doc.has_deferred);
    let result = resolve_next_wave(&doc, &fixture.spec_dir);

    assert_eq!(result.action, NextAction::Execute);
    assert_eq!(result.deferred_ready, vec!["5"]);
    assert!(result.task_ids.is_empty());
    assert_eq!(result.wave, None);
}

/// Test: Body is authoritative over frontmatter
/// Given a body task missing from frontmatter task_ids
/// When the document is parsed
/// Then the task is kept, forced deferred, and a mismatch warning is raised
#[test]
fn test_body_task_missing_from_frontmatter_is_deferred() {
    let fixture = SpecFixture::new();
    fixture.write_tasks(&(TWO_WAVE_TASKS.to_string() + "- [ ] 6 Extra docs\n  Wave: 2\n"));

    let doc = fixture.document();
    let extra = doc.task_by_id("6").expect("task 6 must not be dropped");
    assert!(extra.is_deferred);
    assert!(doc
        .warnings
        .iter()
        .any(|w| w.starts_with("task_ids_mismatch") && w.contains("task 6")));
}

/// Test: Wave sequencing stops at the first incomplete wave
/// Given wave 1 incomplete and wave 2 fully done
/// When the next wave is resolved
/// Then wave 1's remaining task is executed
#[test]
fn test_sequencing_stops_at_first_incomplete_wave() {
    let fixture = SpecFixture::new();
    fixture.write_tasks(
        "- [x] 1 A\n  Wave: 1\n- [ ] 2 B\n  Wave: 1\n- [x] 3 C\n  Wave: 2\n",
    );

    let result = resolve_next_wave(&fixture.document(), &fixture.spec_dir);

    assert_eq!(result.action, NextAction::Execute);
    assert_eq!(result.wave, Some(1));
    assert_eq!(result.task_ids, vec!["2"]);
}

/// Test: Stale summary is reported but does not block
/// Given a wave summary saying blocked and a newer passing run
/// When the next wave is resolved
/// Then execution continues and a stale_summary warning is attached
#[test]
fn test_stale_summary_warning() {
    let fixture = SpecFixture::new();
    fixture.write_tasks(TWO_WAVE_TASKS);
    fixture.checkpoint_status(1, 1, GATE, "blocked");
    fixture.checkpoint_status(1, 2, GATE, "pass");
    fixture.latest(1, "run-002", "pass");
    fixture.wave_summary(1, "blocked");

    let result = resolve_next_wave(&fixture.document(), &fixture.spec_dir);

    assert_eq!(result.action, NextAction::Execute);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("stale_summary: wave 1"));
}

/// Test: Marking progress moves the frontier
/// Given scenario A on disk
/// When task 3 is marked in progress, then done with its implementation log
/// Then resolution continues wave 2 and afterwards offers task 4
#[test]
fn test_mark_then_resolve() {
    let fixture = SpecFixture::new();
    let tasks = fixture.write_tasks(TWO_WAVE_TASKS);
    fixture.checkpoint_status(1, 1, GATE, "pass");
    let opts = MarkOptions {
        require_impl_log: true,
        spec_dir: Some(fixture.spec_dir.as_path()),
        sync_store: false,
    };

    mark_task_in_file(&tasks, "3", TaskStatus::InProgress, &opts).unwrap();
    let result = resolve_next_wave(&fixture.document(), &fixture.spec_dir);
    assert_eq!(result.action, NextAction::ContinueWave);
    assert_eq!(result.wave, Some(2));

    assert!(mark_task_in_file(&tasks, "3", TaskStatus::Done, &opts).is_err());
    fixture.impl_log("3");
    mark_task_in_file(&tasks, "3", TaskStatus::Done, &opts).unwrap();

    let result = resolve_next_wave(&fixture.document(), &fixture.spec_dir);
    assert_eq!(result.action, NextAction::Execute);
    assert_eq!(result.task_ids, vec!["4"]);
}

/// Test: Everything done
/// Given all tasks done and every checkpoint passing
/// When the next wave is resolved
/// Then the result is done
#[test]
fn test_all_done() {
    let fixture = SpecFixture::new();
    fixture.write_tasks(&TWO_WAVE_TASKS.replace("- [ ]", "- [x]"));
    fixture.checkpoint_status(2, 1, GATE, "pass");

    let result = resolve_next_wave(&fixture.document(), &fixture.spec_dir);
    assert_eq!(result.action, NextAction::Done);
}

//! Next-work resolution.
//!
//! Rules, first match wins:
//! 1. A non-deferred task is in progress: continue its wave.
//! 2. Find the highest wave whose non-deferred tasks are all done, stopping
//!    at the first incomplete wave.
//! 3. That wave's checkpoint is blocked: blocked.
//! 4. Pending tasks with all dependencies done in the lowest later wave,
//!    plus every pending deferred task with all dependencies done: execute.
//! 5. Nothing runnable: plan the next wave under rolling-wave generation,
//!    otherwise done.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::types::{Document, GenerationStrategy, NextAction, NextWaveResult, Task, TaskStatus};
use crate::config::DEFAULT_CHECKPOINT_SUBAGENT;
use crate::spwlog_debug;
use crate::wave::{CheckpointResolver, CheckpointStatus, DiskFs, WaveFs};

/// Resolve the next action for a document against checkpoints on disk.
pub fn resolve_next_wave(doc: &Document, spec_dir: &Path) -> NextWaveResult {
    let resolver = CheckpointResolver::new(&DiskFs, DEFAULT_CHECKPOINT_SUBAGENT);
    resolve_next_wave_with(doc, spec_dir, &resolver)
}

/// Same as [`resolve_next_wave`] with an explicit checkpoint resolver.
pub fn resolve_next_wave_with<F: WaveFs + ?Sized>(
    doc: &Document,
    spec_dir: &Path,
    checkpoints: &CheckpointResolver<'_, F>,
) -> NextWaveResult {
    if doc.tasks.is_empty() {
        return NextWaveResult::new(NextAction::Done, "no tasks found");
    }

    let mut warnings = doc.warnings.clone();

    if let Some(task) = doc
        .tasks
        .iter()
        .find(|t| !t.is_deferred && t.status == TaskStatus::InProgress)
    {
        return NextWaveResult::new(
            NextAction::ContinueWave,
            format!("task {} is in progress", task.id),
        )
        .at_wave(task.wave)
        .with_warnings(warnings);
    }

    let status_by_id: HashMap<&str, TaskStatus> =
        doc.tasks.iter().map(|t| (t.id.as_str(), t.status)).collect();
    let waves = wave_map(&doc.tasks);
    let highest = highest_completed_wave(&waves);

    if highest > 0 {
        let checkpoint = checkpoints.resolve(spec_dir, highest);
        if checkpoint.stale_flag {
            if let Some(detail) = &checkpoint.detail {
                warnings.push(format!("stale_summary: wave {} {}", highest, detail));
            }
        }
        if checkpoint.status == CheckpointStatus::Blocked {
            return NextWaveResult::new(
                NextAction::Blocked,
                format!("wave {} checkpoint is blocked", highest),
            )
            .at_wave(highest)
            .with_warnings(warnings);
        }
    }

    let next = executable_tasks(&waves, &status_by_id, highest);
    let deferred_ready = deferred_ready(&doc.tasks, &status_by_id);
    spwlog_debug!(
        "next-wave: highest_completed={} next={:?} deferred_ready={:?}",
        highest,
        next,
        deferred_ready
    );

    if next.is_some() || !deferred_ready.is_empty() {
        let (wave, task_ids) = next.map_or((None, Vec::new()), |(w, ids)| (Some(w), ids));
        let reason = match wave {
            Some(w) => format!("wave {} has {} ready task(s)", w, task_ids.len()),
            None => format!("{} deferred task(s) ready", deferred_ready.len()),
        };
        return NextWaveResult {
            action: NextAction::Execute,
            wave,
            task_ids,
            deferred_ready,
            reason,
            warnings,
        };
    }

    let result = if doc.frontmatter.generation_strategy == GenerationStrategy::RollingWave {
        NextWaveResult::new(
            NextAction::PlanNextWave,
            "all planned tasks complete, rolling-wave strategy allows planning next wave",
        )
    } else {
        NextWaveResult::new(NextAction::Done, "all tasks complete")
    };
    result.with_warnings(warnings)
}

/// Non-deferred tasks grouped by wave, ascending.
fn wave_map(tasks: &[Task]) -> BTreeMap<u32, Vec<&Task>> {
    let mut map: BTreeMap<u32, Vec<&Task>> = BTreeMap::new();
    for task in tasks.iter().filter(|t| !t.is_deferred) {
        map.entry(task.wave).or_default().push(task);
    }
    map
}

/// Highest wave reached by walking waves upward while every task is done.
fn highest_completed_wave(waves: &BTreeMap<u32, Vec<&Task>>) -> u32 {
    let mut highest = 0;
    for (&wave, tasks) in waves {
        if !tasks.iter().all(|t| t.status == TaskStatus::Done) {
            break;
        }
        highest = wave;
    }
    highest
}

fn deps_resolved(task: &Task, status_by_id: &HashMap<&str, TaskStatus>) -> bool {
    task.depends_on
        .iter()
        .all(|dep| status_by_id.get(dep.as_str()) == Some(&TaskStatus::Done))
}

/// Lowest wave above `highest` with at least one runnable pending task.
fn executable_tasks(
    waves: &BTreeMap<u32, Vec<&Task>>,
    status_by_id: &HashMap<&str, TaskStatus>,
    highest: u32,
) -> Option<(u32, Vec<String>)> {
    waves
        .range(highest.saturating_add(1)..)
        .find_map(|(&wave, tasks)| {
            let ids: Vec<String> = tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Pending && deps_resolved(t, status_by_id))
                .map(|t| t.id.clone())
                .collect();
            (!ids.is_empty()).then_some((wave, ids))
        })
}

fn deferred_ready(tasks: &[Task], status_by_id: &HashMap<&str, TaskStatus>) -> Vec<String> {
    tasks
        .iter()
        .filter(|t| t.is_deferred && t.status == TaskStatus::Pending && deps_resolved(t, status_by_id))
        .map(|t| t.id.clone())
        .collect()
}

//! In-place checkbox updates for task documents.

use regex::Regex;
use std::fs;
use std::path::Path;

use super::types::TaskStatus;
use crate::layout;
use crate::store::Store;
use crate::{spwlog_debug, spwlog_warn, Error, Result};

#[derive(Debug, Clone, Default)]
pub struct MarkOptions<'a> {
    /// Refuse to mark a task done unless its implementation log exists.
    pub require_impl_log: bool,
    /// Spec directory used to find implementation logs and `spec.db`.
    pub spec_dir: Option<&'a Path>,
    /// Mirror the new status into `spec.db` when it can be opened.
    pub sync_store: bool,
}

/// Rewrite one task's checkbox glyph in `path`, leaving every other byte alone.
pub fn mark_task_in_file(
    path: &Path,
    task_id: &str,
    status: TaskStatus,
    opts: &MarkOptions<'_>,
) -> Result<()> {
    if status == TaskStatus::Done && opts.require_impl_log {
        let spec_dir = opts.spec_dir.ok_or_else(|| {
            Error::Validation("spec directory required to check implementation logs".to_string())
        })?;
        check_impl_log(spec_dir, task_id)?;
    }

    let content = fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let pattern = Regex::new(&format!(r"^(- \[)[ x\-](\] {}\s)", regex::escape(task_id)))
        .map_err(|e| Error::Validation(e.to_string()))?;

    let mut found = false;
    let mut lines: Vec<String> = Vec::new();
    for line in content.split('\n') {
        if !found {
            if let Some(caps) = pattern.captures(line) {
                let glyph_at = caps.get(1).map_or(0, |m| m.end());
                let mut updated = String::with_capacity(line.len());
                updated.push_str(&line[..glyph_at]);
                updated.push(status.glyph());
                updated.push_str(&line[glyph_at + 1..]);
                lines.push(updated);
                found = true;
                continue;
            }
        }
        lines.push(line.to_string());
    }

    if !found {
        return Err(Error::TaskNotFound {
            task_id: task_id.to_string(),
            path: path.to_path_buf(),
        });
    }

    fs::write(path, lines.join("\n"))?;
    spwlog_debug!("marked task {} as {} in {}", task_id, status, path.display());

    if opts.sync_store {
        if let Some(spec_dir) = opts.spec_dir {
            if let Some(store) = Store::try_open(spec_dir) {
                if let Err(e) = store.update_task_status(task_id, status) {
                    spwlog_warn!("could not mirror task {} status to spec.db: {}", task_id, e);
                }
            }
        }
    }
    Ok(())
}

/// Accepts `task-<id>.md` and, failing that, `task_<id>.md` or `task<id>.md`.
pub fn check_impl_log(spec_dir: &Path, task_id: &str) -> Result<()> {
    let expected = layout::impl_log_path(spec_dir, task_id);
    if expected.is_file() {
        return Ok(());
    }

    let missing = || Error::ImplLogMissing {
        task_id: task_id.to_string(),
        expected: expected.clone(),
    };
    let Ok(entries) = fs::read_dir(layout::impl_logs_path(spec_dir)) else {
        return Err(missing());
    };

    let alt = Regex::new(r"^task[_\-]?(\S+)\.md$").map_err(|e| Error::Validation(e.to_string()))?;
    let found = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .any(|name| {
            alt.captures(&name)
                .is_some_and(|caps| &caps[1] == task_id)
        });

    if found {
        Ok(())
    } else {
        Err(missing())
    }
}

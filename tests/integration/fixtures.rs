//! Test fixtures for integration tests.
//!
//! Provides a throwaway workspace with one spec directory and helpers for
//! writing the files agents leave behind during a wave.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use spw::layout;
use spw::tasks::{parse_file, Document};

/// Four tasks over two waves; wave 1 done, wave 2 pending with a chain.
pub const TWO_WAVE_TASKS: &str = "\
---
spec: demo
task_ids: [1, 2, 3, 4]
---
# Tasks

- [x] 1 Create schema
  Wave: 1
  Files: `db/schema.sql`
- [x] 2 Seed data
  Wave: 1
  Depends on: 1
- [ ] 3 API layer
  Wave: 2
  Depends on: 2
- [ ] 4 UI
  Wave: 2
  Depends on: 3
";

/// A workspace with a single spec named `demo`.
pub struct SpecFixture {
    /// Keeps the directory alive for the test's duration.
    pub temp_dir: TempDir,
    pub workspace: PathBuf,
    pub spec_dir: PathBuf,
}

impl SpecFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let workspace = temp_dir.path().to_path_buf();
        let spec_dir = layout::spec_dir(&workspace, "demo");
        fs::create_dir_all(&spec_dir).expect("Failed to create spec dir");
        Self {
            temp_dir,
            workspace,
            spec_dir,
        }
    }

    /// Write a file relative to the spec directory, creating parents.
    pub fn write(&self, rel: impl AsRef<Path>, content: &str) -> PathBuf {
        let path = self.spec_dir.join(rel);
        write_file(&path, content);
        path
    }

    pub fn write_tasks(&self, content: &str) -> PathBuf {
        self.write(layout::TASKS_MD, content)
    }

    pub fn document(&self) -> Document {
        parse_file(&layout::tasks_path(&self.spec_dir)).expect("Failed to parse tasks.md")
    }

    /// Write `status.json` for one subagent of a checkpoint run.
    pub fn checkpoint_status(&self, wave: u32, run: u32, subagent: &str, status: &str) -> PathBuf {
        let run_dir = layout::checkpoint_run_path(&self.spec_dir, wave, run);
        write_file(
            &run_dir.join(subagent).join(layout::STATUS_JSON),
            &status_doc(status, &format!("{} says {}", subagent, status)),
        );
        run_dir
    }

    /// Create an execution run with one implementer subagent.
    pub fn exec_run(&self, wave: u32, run: u32) -> PathBuf {
        let run_dir = layout::wave_exec_path(&self.spec_dir, wave).join(layout::run_dir_name(run));
        write_file(&run_dir.join("implementer").join(layout::BRIEF_MD), "# Brief\n");
        run_dir
    }

    pub fn latest(&self, wave: u32, run_id: &str, status: &str) {
        write_file(
            &layout::wave_latest_path(&self.spec_dir, wave),
            &format!(r#"{{"run_id":"{}","status":"{}"}}"#, run_id, status),
        );
    }

    pub fn impl_log(&self, task_id: &str) -> PathBuf {
        let path = layout::impl_log_path(&self.spec_dir, task_id);
        write_file(&path, &format!("# Task {}\n", task_id));
        path
    }

    pub fn wave_summary(&self, wave: u32, status: &str) {
        write_file(
            &layout::wave_summary_path(&self.spec_dir, wave),
            &status_doc(status, "wave summary"),
        );
    }
}

pub fn status_doc(status: &str, summary: &str) -> String {
    format!(r#"{{"status":"{}","summary":"{}"}}"#, status, summary)
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
}

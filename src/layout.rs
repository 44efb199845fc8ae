//! Canonical on-disk layout of a spec directory.
//!
//! Every path the resolvers and the store touch is built here; nothing else
//! in the crate joins path segments by hand.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const TASKS_MD: &str = "tasks.md";
pub const REQUIREMENTS_MD: &str = "requirements.md";
pub const DESIGN_MD: &str = "design.md";
pub const DESIGN_RESEARCH_MD: &str = "design/DESIGN-RESEARCH.md";
pub const QA_TEST_PLAN_MD: &str = "qa/QA-TEST-PLAN.md";
pub const QA_CHECK_MD: &str = "qa/QA-CHECK.md";
pub const QA_EXEC_REPORT_MD: &str = "qa/QA-EXECUTION-REPORT.md";
pub const POST_MORTEM_REPORT_MD: &str = "post-mortem/report.md";

pub const WAVES_DIR: &str = "execution/waves";
pub const IMPL_LOGS_DIR: &str = "execution/_implementation-logs";
pub const WAVE_EXEC_DIR: &str = "execution";
pub const WAVE_CHECKPOINT_DIR: &str = "checkpoint";
pub const WAVE_SUMMARY_JSON: &str = "_wave-summary.json";
pub const LATEST_JSON: &str = "_latest.json";

pub const BRIEF_MD: &str = "brief.md";
pub const REPORT_MD: &str = "report.md";
pub const STATUS_JSON: &str = "status.json";
pub const HANDOFF_MD: &str = "_handoff.md";

pub const SPEC_DB: &str = "spec.db";

/// Directory name for wave `n`, e.g. `wave-02`.
pub fn wave_dir_name(n: u32) -> String {
    format!("wave-{:02}", n)
}

/// Directory name for run `n`, e.g. `run-003`.
pub fn run_dir_name(n: u32) -> String {
    format!("run-{:03}", n)
}

fn parse_numbered(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `run-003` → `Some(3)`. Anything else → `None`.
pub fn parse_run_number(name: &str) -> Option<u32> {
    parse_numbered(name, "run-")
}

/// `wave-02` → `Some(2)`. Anything else → `None`.
pub fn parse_wave_number(name: &str) -> Option<u32> {
    parse_numbered(name, "wave-")
}

/// Relative directory of a named spec inside a workspace.
pub fn spec_dir(workspace: &Path, name: &str) -> PathBuf {
    workspace.join(".spec-workflow").join("specs").join(name)
}

pub fn tasks_path(spec_dir: &Path) -> PathBuf {
    spec_dir.join(TASKS_MD)
}

pub fn spec_db_path(spec_dir: &Path) -> PathBuf {
    spec_dir.join(SPEC_DB)
}

pub fn waves_path(spec_dir: &Path) -> PathBuf {
    spec_dir.join(WAVES_DIR)
}

pub fn wave_path(spec_dir: &Path, wave: u32) -> PathBuf {
    waves_path(spec_dir).join(wave_dir_name(wave))
}

pub fn wave_exec_path(spec_dir: &Path, wave: u32) -> PathBuf {
    wave_path(spec_dir, wave).join(WAVE_EXEC_DIR)
}

pub fn wave_checkpoint_path(spec_dir: &Path, wave: u32) -> PathBuf {
    wave_path(spec_dir, wave).join(WAVE_CHECKPOINT_DIR)
}

pub fn wave_summary_path(spec_dir: &Path, wave: u32) -> PathBuf {
    wave_path(spec_dir, wave).join(WAVE_SUMMARY_JSON)
}

pub fn wave_latest_path(spec_dir: &Path, wave: u32) -> PathBuf {
    wave_path(spec_dir, wave).join(LATEST_JSON)
}

pub fn checkpoint_run_path(spec_dir: &Path, wave: u32, run: u32) -> PathBuf {
    wave_checkpoint_path(spec_dir, wave).join(run_dir_name(run))
}

pub fn impl_logs_path(spec_dir: &Path) -> PathBuf {
    spec_dir.join(IMPL_LOGS_DIR)
}

/// Canonical implementation log for a task: `task-<id>.md`.
pub fn impl_log_path(spec_dir: &Path, task_id: &str) -> PathBuf {
    impl_logs_path(spec_dir).join(format!("task-{}.md", task_id))
}

/// Workflow phase a command or artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Discover,
    Design,
    Planning,
    Execution,
    Qa,
    PostMortem,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Discover,
        Phase::Design,
        Phase::Planning,
        Phase::Execution,
        Phase::Qa,
        Phase::PostMortem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Discover => "discover",
            Phase::Design => "design",
            Phase::Planning => "planning",
            Phase::Execution => "execution",
            Phase::Qa => "qa",
            Phase::PostMortem => "post-mortem",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown phase: {}", s))
    }
}

/// A workflow command that writes runs under a `_comms` directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    Discover,
    DesignResearch,
    DesignDraft,
    TasksPlan,
    TasksCheck,
    Qa,
    QaCheck,
    QaExec,
    PostMortem,
    Exec,
    Checkpoint,
}

impl Command {
    pub const ALL: [Command; 11] = [
        Command::Discover,
        Command::DesignResearch,
        Command::DesignDraft,
        Command::TasksPlan,
        Command::TasksCheck,
        Command::Qa,
        Command::QaCheck,
        Command::QaExec,
        Command::PostMortem,
        Command::Exec,
        Command::Checkpoint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Discover => "discover",
            Command::DesignResearch => "design-research",
            Command::DesignDraft => "design-draft",
            Command::TasksPlan => "tasks-plan",
            Command::TasksCheck => "tasks-check",
            Command::Qa => "qa",
            Command::QaCheck => "qa-check",
            Command::QaExec => "qa-exec",
            Command::PostMortem => "post-mortem",
            Command::Exec => "exec",
            Command::Checkpoint => "checkpoint",
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Command::Discover => Phase::Discover,
            Command::DesignResearch | Command::DesignDraft => Phase::Design,
            Command::TasksPlan | Command::TasksCheck => Phase::Planning,
            Command::Exec | Command::Checkpoint => Phase::Execution,
            Command::Qa | Command::QaCheck | Command::QaExec => Phase::Qa,
            Command::PostMortem => Phase::PostMortem,
        }
    }

    /// Commands whose runs live under a specific wave.
    pub fn is_wave_scoped(&self) -> bool {
        matches!(self, Command::QaExec | Command::Exec | Command::Checkpoint)
    }

    /// Directory holding this command's `run-NNN` folders.
    ///
    /// Wave-scoped commands use `wave`; a missing wave falls back to wave 1.
    pub fn comms_path(&self, spec_dir: &Path, wave: Option<u32>) -> PathBuf {
        let wave = wave.unwrap_or(1);
        match self {
            Command::Discover => spec_dir.join("discover/_comms"),
            Command::DesignResearch => spec_dir.join("design/_comms/design-research"),
            Command::DesignDraft => spec_dir.join("design/_comms/design-draft"),
            Command::TasksPlan => spec_dir.join("planning/_comms/tasks-plan"),
            Command::TasksCheck => spec_dir.join("planning/_comms/tasks-check"),
            Command::Qa => spec_dir.join("qa/_comms/qa"),
            Command::QaCheck => spec_dir.join("qa/_comms/qa-check"),
            Command::QaExec => spec_dir
                .join("qa/_comms/qa-exec/waves")
                .join(wave_dir_name(wave)),
            Command::PostMortem => spec_dir.join("post-mortem/_comms"),
            Command::Exec => wave_exec_path(spec_dir, wave),
            Command::Checkpoint => wave_checkpoint_path(spec_dir, wave),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown command: {}", s))
    }
}

/// Contents of a subagent `status.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusDoc {
    pub status: String,
    pub summary: String,
}

/// Contents of a wave's `_latest.json` pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatestDoc {
    pub run_id: String,
    pub run_dir: String,
    pub status: String,
    pub summary: String,
}

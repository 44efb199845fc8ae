use serde::{Deserialize, Serialize};

/// Resolved checkpoint verdict for a wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Pass,
    Blocked,
    /// No checkpoint directory at all.
    Missing,
    /// Checkpoint directory exists but no run produced a verdict.
    NoRuns,
}

impl CheckpointStatus {
    /// Parse a verdict written by a subagent. Only `pass` and `blocked` are verdicts.
    pub fn from_verdict(s: &str) -> Option<Self> {
        match s.trim() {
            "pass" => Some(CheckpointStatus::Pass),
            "blocked" => Some(CheckpointStatus::Blocked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointStatus::Pass => "pass",
            CheckpointStatus::Blocked => "blocked",
            CheckpointStatus::Missing => "missing",
            CheckpointStatus::NoRuns => "no_runs",
        }
    }
}

impl std::fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a checkpoint verdict was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSource {
    LatestJson,
    DirScan,
}

impl std::fmt::Display for CheckpointSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointSource::LatestJson => write!(f, "latest_json"),
            CheckpointSource::DirScan => write!(f, "dir_scan"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointResult {
    pub wave: u32,
    pub status: CheckpointStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub source: CheckpointSource,
    /// `_wave-summary.json` disagrees with the resolved verdict.
    pub stale_flag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckpointResult {
    pub(crate) fn new(wave: u32, status: CheckpointStatus, source: CheckpointSource) -> Self {
        Self {
            wave,
            status,
            run_id: None,
            source,
            stale_flag: false,
            detail: None,
        }
    }
}

/// Lifecycle state of a wave directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveStatus {
    Pending,
    InProgress,
    Complete,
    Blocked,
}

impl WaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaveStatus::Pending => "pending",
            WaveStatus::InProgress => "in_progress",
            WaveStatus::Complete => "complete",
            WaveStatus::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for WaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveState {
    pub wave: u32,
    pub status: WaveStatus,
    /// Filled from the document's wave plan by [`super::attach_task_ids`].
    #[serde(default)]
    pub task_ids: Vec<String>,
    pub exec_runs: u32,
    pub check_runs: u32,
    /// Resolved verdict, present when the wave has checkpoint runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<CheckpointResult>,
}

/// Which file a [`WaveSummary`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    WaveSummary,
    LatestJson,
    CheckpointScan,
    None,
}

/// Best available one-line summary of a wave.
///
/// `status` is whatever the winning source recorded (`pass`, `blocked`,
/// `in_progress`, `missing`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveSummary {
    pub wave: u32,
    pub status: String,
    pub summary: String,
    pub source: SummarySource,
    pub stale_flag: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumeAction {
    ContinueWave,
    NextWave,
    Blocked,
    Done,
}

impl std::fmt::Display for ResumeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResumeAction::ContinueWave => write!(f, "continue-wave"),
            ResumeAction::NextWave => write!(f, "next-wave"),
            ResumeAction::Blocked => write!(f, "blocked"),
            ResumeAction::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    pub action: ResumeAction,
    pub wave: u32,
    pub reason: String,
}

//! Row types for the per-spec store and the global index.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::tasks::Task;
use crate::wave::{CheckpointResult, WaveState};
use crate::Error;

/// Lifecycle of a harvested run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    InProgress,
    Pass,
    Blocked,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Pass => "pass",
            RunStatus::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(RunStatus::InProgress),
            "pass" => Ok(RunStatus::Pass),
            "blocked" => Ok(RunStatus::Blocked),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

impl FromSql for RunStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

/// One `run-NNN` directory of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i64,
    pub command: String,
    pub run_number: u32,
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave_number: Option<u32>,
    /// Run directory relative to the spec directory.
    pub comms_path: String,
    pub status: RunStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubagentRecord {
    pub id: i64,
    pub run_id: i64,
    pub name: String,
    pub brief: Option<String>,
    pub report: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    /// Raw `status.json` text as found on disk.
    pub status_json: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffRecord {
    pub id: i64,
    pub run_id: i64,
    pub content: String,
    pub all_pass: bool,
    pub created_at: String,
}

/// Kind of harvested file, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactType {
    Status,
    Brief,
    Report,
    Handoff,
    WaveState,
    Document,
    Data,
    Other,
}

impl ArtifactType {
    pub fn infer(rel_path: &str) -> Self {
        let path = Path::new(rel_path);
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        match name {
            "status.json" => return ArtifactType::Status,
            "brief.md" => return ArtifactType::Brief,
            "report.md" => return ArtifactType::Report,
            "_handoff.md" => return ArtifactType::Handoff,
            "_wave-summary.json" | "_latest.json" => return ArtifactType::WaveState,
            _ => {}
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") => ArtifactType::Document,
            Some("json") => ArtifactType::Data,
            _ => ArtifactType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Status => "status",
            ArtifactType::Brief => "brief",
            ArtifactType::Report => "report",
            ArtifactType::Handoff => "handoff",
            ArtifactType::WaveState => "wave-state",
            ArtifactType::Document => "document",
            ArtifactType::Data => "data",
            ArtifactType::Other => "other",
        }
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: i64,
    pub phase: String,
    pub rel_path: String,
    pub artifact_type: String,
    pub content: String,
    /// Lowercase hex SHA-256 of the file bytes.
    pub content_hash: String,
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplLogRecord {
    pub task_id: String,
    pub content: String,
    pub content_hash: String,
    pub updated_at: String,
}

/// Persisted view of a wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveRecord {
    pub wave_number: u32,
    pub status: String,
    pub exec_runs: u32,
    pub check_runs: u32,
    pub summary_status: Option<String>,
    pub summary_text: Option<String>,
    pub summary_source: Option<String>,
    pub stale_flag: bool,
    /// Set by the store on write.
    #[serde(default)]
    pub updated_at: String,
}

impl WaveRecord {
    /// Build a record from a scan result and, when resolved, its checkpoint.
    pub fn from_scan(state: &WaveState, checkpoint: Option<&CheckpointResult>) -> Self {
        Self {
            wave_number: state.wave,
            status: state.status.as_str().to_string(),
            exec_runs: state.exec_runs,
            check_runs: state.check_runs,
            summary_status: checkpoint.map(|c| c.status.as_str().to_string()),
            summary_text: checkpoint.and_then(|c| c.detail.clone()),
            summary_source: checkpoint.map(|c| c.source.to_string()),
            stale_flag: checkpoint.is_some_and(|c| c.stale_flag),
            updated_at: String::new(),
        }
    }
}

/// Persisted view of a task line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub title: String,
    pub status: String,
    pub wave: Option<u32>,
    /// Comma-separated dependency ids.
    pub depends_on: Option<String>,
    pub files: Option<String>,
    pub tdd: bool,
    pub is_deferred: bool,
    #[serde(default)]
    pub updated_at: String,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            status: task.status.as_str().to_string(),
            wave: (task.wave > 0).then_some(task.wave),
            depends_on: (!task.depends_on.is_empty()).then(|| task.depends_on.join(",")),
            files: task.files.clone(),
            tdd: task.requires_tdd(),
            is_deferred: task.is_deferred,
            updated_at: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub frontmatter: String,
    pub body: String,
    pub generated_at: String,
}

/// A spec registered in the global index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRecord {
    pub name: String,
    pub stage: String,
    pub db_path: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub spec: String,
    pub doc_type: String,
    pub phase: String,
    pub title: String,
    pub snippet: String,
    /// FTS5 rank; lower is a better match.
    pub rank: f64,
}

//! Task document data model.

use serde::{Deserialize, Serialize};

/// Checkbox state of a task line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// `- [ ]`
    #[default]
    Pending,
    /// `- [-]`
    InProgress,
    /// `- [x]`
    Done,
}

impl TaskStatus {
    /// Map a checkbox glyph to a status. Unknown glyphs read as pending.
    pub fn from_glyph(glyph: char) -> Self {
        match glyph {
            'x' => TaskStatus::Done,
            '-' => TaskStatus::InProgress,
            _ => TaskStatus::Pending,
        }
    }

    pub fn glyph(&self) -> char {
        match self {
            TaskStatus::Pending => ' ',
            TaskStatus::InProgress => '-',
            TaskStatus::Done => 'x',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(crate::Error::InvalidStatus(other.to_string())),
        }
    }
}

/// A single task parsed from the body of a task document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Dotted numeric id, e.g. `2.1`.
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    /// Wave number; 0 when the task carries no `Wave:` line.
    pub wave: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tdd: Option<String>,
    pub is_deferred: bool,
    /// 1-based line number of the checkbox line.
    pub raw_line: usize,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status,
            wave: 0,
            depends_on: Vec::new(),
            files: None,
            tdd: None,
            is_deferred: false,
            raw_line: 0,
        }
    }

    /// True when the `TDD:` metadata asks for test-first work.
    pub fn requires_tdd(&self) -> bool {
        matches!(
            self.tdd.as_deref().map(|t| t.trim().to_lowercase()).as_deref(),
            Some("yes" | "true" | "required")
        )
    }
}

/// How the task list grows over time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GenerationStrategy {
    /// Only the next wave is planned; later waves are planned as earlier ones finish.
    RollingWave,
    /// Every wave is planned up front.
    #[default]
    AllAtOnce,
    Other(String),
}

impl GenerationStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            GenerationStrategy::RollingWave => "rolling-wave",
            GenerationStrategy::AllAtOnce => "all-at-once",
            GenerationStrategy::Other(s) => s,
        }
    }
}

impl From<&str> for GenerationStrategy {
    fn from(s: &str) -> Self {
        match s.trim() {
            "rolling-wave" => GenerationStrategy::RollingWave,
            "all-at-once" | "" => GenerationStrategy::AllAtOnce,
            other => GenerationStrategy::Other(other.to_string()),
        }
    }
}

impl From<String> for GenerationStrategy {
    fn from(s: String) -> Self {
        GenerationStrategy::from(s.as_str())
    }
}

impl From<GenerationStrategy> for String {
    fn from(g: GenerationStrategy) -> Self {
        g.as_str().to_string()
    }
}

/// Single-line fields from the `---` block at the top of the document.
///
/// Informational only: task status and membership always come from the body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Frontmatter {
    pub spec: Option<String>,
    pub task_ids: Vec<String>,
    pub approval_id: Option<String>,
    pub generation_strategy: GenerationStrategy,
}

/// One `- Wave N: Tasks a, b, c` line from the wave plan section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavePlanEntry {
    pub wave: u32,
    pub task_ids: Vec<String>,
}

/// Task totals for a document. Deferred tasks are also counted by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
    pub deferred: usize,
}

/// A fully parsed task document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    pub frontmatter: Frontmatter,
    pub tasks: Vec<Task>,
    pub wave_plan: Vec<WavePlanEntry>,
    pub constraints: String,
    pub has_deferred: bool,
    pub warnings: Vec<String>,
}

impl Document {
    pub fn task_by_id(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn tasks_in_wave(&self, wave: u32) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.wave == wave)
    }

    pub fn count(&self) -> TaskCounts {
        let mut counts = TaskCounts {
            total: self.tasks.len(),
            ..TaskCounts::default()
        };
        for task in &self.tasks {
            match task.status {
                TaskStatus::Done => counts.done += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Pending => counts.pending += 1,
            }
            if task.is_deferred {
                counts.deferred += 1;
            }
        }
        counts
    }

    /// True when every task, deferred included, is checked off.
    pub fn all_done(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.status == TaskStatus::Done)
    }
}

/// What should happen next for a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NextAction {
    ContinueWave,
    Execute,
    Blocked,
    PlanNextWave,
    Done,
}

impl NextAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextAction::ContinueWave => "continue-wave",
            NextAction::Execute => "execute",
            NextAction::Blocked => "blocked",
            NextAction::PlanNextWave => "plan-next-wave",
            NextAction::Done => "done",
        }
    }
}

impl std::fmt::Display for NextAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of next-work resolution. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextWaveResult {
    pub action: NextAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deferred_ready: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl NextWaveResult {
    pub fn new(action: NextAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            wave: None,
            task_ids: Vec::new(),
            deferred_ready: Vec::new(),
            reason: reason.into(),
            warnings: Vec::new(),
        }
    }

    pub fn at_wave(mut self, wave: u32) -> Self {
        self.wave = Some(wave);
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Formatting or graph findings for a task document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidateResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ValidateResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Model tier suggested for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelHint {
    Haiku,
    Sonnet,
    Opus,
}

impl ModelHint {
    /// 1-3 haiku, 4-6 sonnet, 7+ opus.
    pub fn for_score(score: u32) -> Self {
        match score {
            7.. => ModelHint::Opus,
            4..=6 => ModelHint::Sonnet,
            _ => ModelHint::Haiku,
        }
    }
}

impl std::fmt::Display for ModelHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelHint::Haiku => write!(f, "haiku"),
            ModelHint::Sonnet => write!(f, "sonnet"),
            ModelHint::Opus => write!(f, "opus"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityResult {
    pub task_id: String,
    pub score: u32,
    pub model_hint: ModelHint,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factors: Vec<String>,
}

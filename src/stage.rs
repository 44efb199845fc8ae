//! Lifecycle stage of a spec, read from which artifacts exist on disk.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecStage {
    PostMortem,
    Qa,
    Execution,
    Planning,
    Design,
    Requirements,
    Unknown,
}

impl SpecStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecStage::PostMortem => "post-mortem",
            SpecStage::Qa => "qa",
            SpecStage::Execution => "execution",
            SpecStage::Planning => "planning",
            SpecStage::Design => "design",
            SpecStage::Requirements => "requirements",
            SpecStage::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SpecStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify by the most advanced artifact present, checking later stages first.
pub fn classify_stage(spec_dir: &Path) -> SpecStage {
    let has = |rel: &str| spec_dir.join(rel).is_file();

    if has(layout::POST_MORTEM_REPORT_MD) {
        SpecStage::PostMortem
    } else if has(layout::QA_TEST_PLAN_MD) || has(layout::QA_CHECK_MD) || has(layout::QA_EXEC_REPORT_MD) {
        SpecStage::Qa
    } else if layout::waves_path(spec_dir).is_dir() {
        SpecStage::Execution
    } else if has(layout::TASKS_MD) {
        SpecStage::Planning
    } else if has(layout::DESIGN_MD) || has(layout::DESIGN_RESEARCH_MD) {
        SpecStage::Design
    } else if has(layout::REQUIREMENTS_MD) {
        SpecStage::Requirements
    } else {
        SpecStage::Unknown
    }
}

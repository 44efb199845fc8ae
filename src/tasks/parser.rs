//! Task document parser.
//!
//! Two passes over the text: the first `---` block is read for frontmatter
//! fields line by line (no YAML), then the whole text is scanned for section
//! headers, task lines, and indented metadata. Parsing never fails;
//! unrecognised lines are skipped and inconsistencies become warnings.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use super::types::{Document, Frontmatter, GenerationStrategy, Task, TaskStatus, WavePlanEntry};
use crate::{spwlog_debug, Error, Result};

/// Compiled patterns for reading task documents.
///
/// Built once by the caller and shared by reference with the parser and
/// the validator.
#[derive(Debug, Clone)]
pub struct TaskPatterns {
    /// `- [x] 2.1 Title`
    pub task_line: Regex,
    pub wave_meta: Regex,
    pub depends_meta: Regex,
    pub files_meta: Regex,
    pub tdd_meta: Regex,
    /// `- Wave 1: Tasks 1, 2, 3`
    pub wave_plan: Regex,
    pub fm_spec: Regex,
    pub fm_task_ids: Regex,
    pub fm_approval: Regex,
    pub fm_strategy: Regex,
    pub task_id_ref: Regex,
    // formatting rules
    pub checkbox_line: Regex,
    pub task_checkbox: Regex,
    pub star_list: Regex,
    pub nested_checkbox: Regex,
    pub empty_files_meta: Regex,
}

impl TaskPatterns {
    pub fn new() -> Result<Self> {
        let re = |p: &str| Regex::new(p).map_err(|e| Error::Validation(e.to_string()));
        Ok(Self {
            task_line: re(r"^- \[([ x\-])\] (\d+(?:\.\d+)?)\s+(.*)$")?,
            wave_meta: re(r"(?i)^\s+Wave:\s*(\d+)")?,
            depends_meta: re(r"(?i)^\s+Depends\s+On:\s*(.+)")?,
            files_meta: re(r"(?i)^\s+Files:\s*(.+)")?,
            tdd_meta: re(r"(?i)^\s+TDD:\s*(.+)")?,
            wave_plan: re(r"(?i)^-\s+Wave\s+(\d+):\s*Tasks?\s+(.+)")?,
            fm_spec: re(r"(?i)^spec:\s*(.+)")?,
            fm_task_ids: re(r"(?i)^task_ids:\s*\[([^\]]*)\]")?,
            fm_approval: re(r"(?i)^approval_id:\s*(.+)")?,
            fm_strategy: re(r"(?i)^generation_strategy:\s*(.+)")?,
            task_id_ref: re(r"\d+(?:\.\d+)?")?,
            checkbox_line: re(r"^- \[([ x\-])\] ")?,
            task_checkbox: re(r"^- \[([ x\-])\] \d+(?:\.\d+)?\s")?,
            star_list: re(r"^\*\s")?,
            nested_checkbox: re(r"^\s+- \[([ x\-])\] ")?,
            empty_files_meta: re(r"(?i)^\s+Files:\s*$")?,
        })
    }

    /// Every dotted-numeric id in `s`, in order of appearance.
    pub fn id_list(&self, s: &str) -> Vec<String> {
        self.task_id_ref
            .find_iter(s)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Body,
    Constraints,
    WavePlan,
}

/// Parser bound to a pattern set.
pub struct Parser<'a> {
    patterns: &'a TaskPatterns,
}

impl<'a> Parser<'a> {
    pub fn new(patterns: &'a TaskPatterns) -> Self {
        Self { patterns }
    }

    pub fn parse(&self, content: &str) -> Document {
        let lines: Vec<&str> = content.split('\n').collect();
        let mut doc = Document::default();

        if let Some((start, end)) = find_frontmatter(&lines) {
            doc.frontmatter = self.parse_frontmatter(&lines[start + 1..end]);
        }

        let mut section = Section::Body;
        let mut in_deferred = false;
        let mut constraints = String::new();
        let mut current: Option<Task> = None;
        let mut seen: HashSet<String> = HashSet::new();

        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim();

            if trimmed.starts_with("## ") {
                flush(&mut doc, &mut seen, current.take());
                let lower = trimmed.to_lowercase();
                section = Section::Body;
                if lower.contains("execution constraints") {
                    section = Section::Constraints;
                } else if lower.contains("wave plan") {
                    section = Section::WavePlan;
                } else {
                    in_deferred = lower.contains("deferred");
                }
                continue;
            }

            match section {
                Section::Constraints => {
                    constraints.push_str(line);
                    constraints.push('\n');
                    continue;
                }
                Section::WavePlan => {
                    if let Some(caps) = self.patterns.wave_plan.captures(trimmed) {
                        if let Ok(wave) = caps[1].parse() {
                            doc.wave_plan.push(WavePlanEntry {
                                wave,
                                task_ids: self.patterns.id_list(&caps[2]),
                            });
                        }
                    }
                    continue;
                }
                Section::Body => {}
            }

            if let Some(caps) = self.patterns.task_line.captures(line) {
                flush(&mut doc, &mut seen, current.take());
                let glyph = caps[1].chars().next().unwrap_or(' ');
                let mut task = Task::new(&caps[2], caps[3].trim(), TaskStatus::from_glyph(glyph));
                task.raw_line = idx + 1;
                if in_deferred {
                    task.is_deferred = true;
                    doc.has_deferred = true;
                }
                current = Some(task);
                continue;
            }

            if let Some(task) = current.as_mut() {
                if line.starts_with("  ") || line.starts_with('\t') {
                    self.apply_metadata(task, line);
                }
            }
        }

        flush(&mut doc, &mut seen, current.take());
        doc.constraints = constraints.trim().to_string();

        let warnings = reconcile_task_ids(&doc.frontmatter, &mut doc.tasks);
        if doc.tasks.iter().any(|t| t.is_deferred) {
            doc.has_deferred = true;
        }
        doc.warnings.extend(warnings);

        spwlog_debug!(
            "parsed task document: tasks={} waves_planned={} warnings={}",
            doc.tasks.len(),
            doc.wave_plan.len(),
            doc.warnings.len()
        );
        doc
    }

    fn apply_metadata(&self, task: &mut Task, line: &str) {
        let p = self.patterns;
        if let Some(caps) = p.wave_meta.captures(line) {
            task.wave = caps[1].parse().unwrap_or(0);
        } else if let Some(caps) = p.depends_meta.captures(line) {
            task.depends_on = p.id_list(&caps[1]);
        } else if let Some(caps) = p.files_meta.captures(line) {
            task.files = Some(caps[1].trim().to_string());
        } else if let Some(caps) = p.tdd_meta.captures(line) {
            task.tdd = Some(caps[1].trim().to_string());
        }
    }

    fn parse_frontmatter(&self, lines: &[&str]) -> Frontmatter {
        let p = self.patterns;
        let mut fm = Frontmatter::default();
        for line in lines {
            if let Some(caps) = p.fm_spec.captures(line) {
                fm.spec = Some(caps[1].trim().to_string());
            } else if let Some(caps) = p.fm_task_ids.captures(line) {
                fm.task_ids = p.id_list(&caps[1]);
            } else if let Some(caps) = p.fm_approval.captures(line) {
                fm.approval_id = Some(caps[1].trim().to_string());
            } else if let Some(caps) = p.fm_strategy.captures(line) {
                fm.generation_strategy = GenerationStrategy::from(caps[1].trim());
            }
        }
        fm
    }
}

/// Indices of the first two `---` lines.
fn find_frontmatter(lines: &[&str]) -> Option<(usize, usize)> {
    let mut fences = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.trim() == "---")
        .map(|(i, _)| i);
    let start = fences.next()?;
    let end = fences.next()?;
    Some((start, end))
}

fn flush(doc: &mut Document, seen: &mut HashSet<String>, task: Option<Task>) {
    let Some(task) = task else { return };
    if !seen.insert(task.id.clone()) {
        doc.warnings.push(format!(
            "duplicate_task_id: task {} repeated at line {}; keeping first occurrence",
            task.id, task.raw_line
        ));
        return;
    }
    doc.tasks.push(task);
}

/// Reconcile frontmatter `task_ids` with the tasks found in the body.
///
/// The body is authoritative. A body task missing from the frontmatter list
/// is kept but forced deferred; a frontmatter id with no body task is only
/// reported. Nothing happens when the frontmatter declares no ids.
pub fn reconcile_task_ids(frontmatter: &Frontmatter, tasks: &mut [Task]) -> Vec<String> {
    let mut warnings = Vec::new();
    if frontmatter.task_ids.is_empty() {
        return warnings;
    }

    let declared: HashSet<&str> = frontmatter.task_ids.iter().map(String::as_str).collect();
    for task in tasks.iter_mut() {
        if !declared.contains(task.id.as_str()) {
            task.is_deferred = true;
            warnings.push(format!(
                "task_ids_mismatch: task {} found in body but not in frontmatter task_ids",
                task.id
            ));
        }
    }

    let body: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    for id in &frontmatter.task_ids {
        if !body.contains(id.as_str()) {
            warnings.push(format!(
                "task_ids_mismatch: frontmatter task_ids contains {} but no matching task in body",
                id
            ));
        }
    }
    warnings
}

/// Parse task document text with a freshly built pattern set.
pub fn parse(content: &str) -> Result<Document> {
    let patterns = TaskPatterns::new()?;
    Ok(Parser::new(&patterns).parse(content))
}

/// Read and parse a task document. Only the read can fail.
pub fn parse_file(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content)
}

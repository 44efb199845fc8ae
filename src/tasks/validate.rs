//! Task document checks.
//!
//! [`validate`] enforces the line formatting dashboards rely on;
//! [`validate_document`] checks the dependency graph of a parsed document.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use super::parser::TaskPatterns;
use super::types::{Document, ValidateResult};

/// Formatting rules:
/// - checkbox markers only on task lines with a numeric id
/// - `-` as the list marker, never `*`
/// - no nested checkboxes inside task metadata
/// - `Files:` metadata on a single line
pub fn validate(content: &str, patterns: &TaskPatterns) -> ValidateResult {
    let mut errors = Vec::new();

    for (i, line) in content.split('\n').enumerate() {
        let line_no = i + 1;
        let mut push = |msg: &str| errors.push(format!("line {}: {}", line_no, msg));

        if patterns.checkbox_line.is_match(line) && !patterns.task_checkbox.is_match(line) {
            push("checkbox marker on non-task line (must have numeric ID after checkbox)");
        }
        if patterns.star_list.is_match(line.trim()) {
            push("use '-' as list marker, not '*'");
        }
        if patterns.nested_checkbox.is_match(line) {
            push("nested checkbox found in metadata (checkboxes only allowed on top-level task lines)");
        }
        if patterns.empty_files_meta.is_match(line) {
            push("Files metadata must be on a single line (found empty Files: with no value)");
        }
    }

    ValidateResult::from_errors(errors)
}

/// Dependency graph rules: every dependency names a task in the document,
/// no task depends on itself, no cycles, and no wave-scheduled task depends
/// on a task scheduled in a later wave.
pub fn validate_document(doc: &Document) -> ValidateResult {
    let mut errors = Vec::new();
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let index: HashMap<&str, NodeIndex> = doc
        .tasks
        .iter()
        .map(|t| (t.id.as_str(), graph.add_node(t.id.as_str())))
        .collect();

    for task in &doc.tasks {
        for dep in &task.depends_on {
            if dep == &task.id {
                errors.push(format!("task {} depends on itself", task.id));
                continue;
            }
            let Some(&dep_idx) = index.get(dep.as_str()) else {
                errors.push(format!("task {} depends on unknown task {}", task.id, dep));
                continue;
            };
            graph.add_edge(dep_idx, index[task.id.as_str()], ());

            if let Some(dep_task) = doc.task_by_id(dep) {
                if !task.is_deferred && task.wave > 0 && dep_task.wave > task.wave {
                    errors.push(format!(
                        "task {} (wave {}) depends on task {} scheduled in later wave {}",
                        task.id, task.wave, dep, dep_task.wave
                    ));
                }
            }
        }
    }

    for component in tarjan_scc(&graph) {
        if component.len() > 1 {
            let mut ids: Vec<&str> = component.iter().map(|&n| graph[n]).collect();
            ids.sort_unstable();
            errors.push(format!("dependency cycle between tasks {}", ids.join(", ")));
        }
    }

    ValidateResult::from_errors(errors)
}

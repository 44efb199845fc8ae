use super::types::{ComplexityResult, ModelHint, Task};

/// Score a task's complexity and suggest a model tier.
///
/// Factors are file count, dependency count, a TDD requirement, and deferral.
/// The score never drops below 1.
pub fn score_complexity(task: &Task) -> ComplexityResult {
    let mut score: u32 = 0;
    let mut factors = Vec::new();

    match count_files(task.files.as_deref().unwrap_or("")) {
        n if n >= 5 => {
            score += 3;
            factors.push("many files (5+)");
        }
        3 | 4 => {
            score += 2;
            factors.push("moderate files (3-4)");
        }
        1 | 2 => {
            score += 1;
            factors.push("few files (1-2)");
        }
        _ => {}
    }

    match task.depends_on.len() {
        n if n >= 3 => {
            score += 3;
            factors.push("many dependencies (3+)");
        }
        2 => {
            score += 2;
            factors.push("moderate dependencies (2)");
        }
        1 => {
            score += 1;
            factors.push("single dependency");
        }
        _ => {}
    }

    if task.requires_tdd() {
        score += 2;
        factors.push("TDD required");
    }

    if task.is_deferred {
        score += 1;
        factors.push("deferred task");
    }

    let score = score.max(1);
    ComplexityResult {
        task_id: task.id.clone(),
        score,
        model_hint: ModelHint::for_score(score),
        factors: factors.into_iter().map(String::from).collect(),
    }
}

/// Count backtick-quoted entries, falling back to comma-separated ones.
fn count_files(files: &str) -> usize {
    let quoted = files.matches('`').count() / 2;
    if quoted > 0 {
        return quoted;
    }
    files.split(',').filter(|p| !p.trim().is_empty()).count()
}

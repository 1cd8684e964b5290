//! Structural playbook optimization.
//!
//! Deduplicates structurally-identical tasks and merges runs of similar
//! tasks into loops. Two tasks are interchangeable only when everything but
//! per-task metadata matches; non-contiguous similar tasks are never merged
//! (documented limitation). Non-mergeable input passes through unchanged —
//! never an error.

use super::types::Task;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;
use std::collections::HashSet;

/// Per-task metadata fields excluded from the equivalence check.
pub const EXCLUDED_TASK_FIELDS: [&str; 6] =
    ["name", "register", "tags", "when", "become", "become_user"];

/// Subset of `EXCLUDED_TASK_FIELDS` that can surface inside the param
/// mapping. `name` is deliberately absent: inside params it is the
/// module's own name argument (e.g. the package name), not the task
/// display name, and must participate in the comparison.
const EXCLUDED_PARAM_FIELDS: [&str; 4] = ["register", "tags", "become", "become_user"];

/// Minimum run length that collapses into a loop.
const LOOP_THRESHOLD: usize = 3;

/// Optimization outcome counts. Field names are a stable external contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationMetrics {
    pub original_task_count: usize,
    pub optimized_task_count: usize,
    pub tasks_reduced: usize,
    pub reduction_percentage: f64,
    pub optimization_applied: bool,
}

fn filtered_params(task: &Task) -> IndexMap<&str, &Value> {
    task.params
        .iter()
        .filter(|(k, _)| !EXCLUDED_PARAM_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), v))
        .collect()
}

/// Structural equivalence: same module key, and all non-metadata fields
/// match after excluding `EXCLUDED_TASK_FIELDS`. The task-level `name`
/// and `when` fields live on the struct and are simply not compared.
fn tasks_equivalent(a: &Task, b: &Task) -> bool {
    a.module == b.module
        && filtered_params(a) == filtered_params(b)
        && a.notify == b.notify
        && a.loop_items == b.loop_items
        && a.vars == b.vars
}

/// O(n²) pairwise duplicate detection. Returns every equivalent index pair
/// with i < j, not just first-seen duplicates.
pub fn detect_duplicate_tasks(tasks: &[Task]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..tasks.len() {
        for j in (i + 1)..tasks.len() {
            if tasks_equivalent(&tasks[i], &tasks[j]) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Keep the first occurrence per duplicate group; drop every index that
/// appears as the later element of any pair.
pub fn consolidate_duplicate_tasks(tasks: Vec<Task>) -> Vec<Task> {
    let drop: HashSet<usize> = detect_duplicate_tasks(&tasks)
        .into_iter()
        .map(|(_, j)| j)
        .collect();

    tasks
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !drop.contains(i))
        .map(|(_, t)| t)
        .collect()
}

/// The parameter that carries per-item values when a module's tasks
/// collapse into a loop. Only modules with a name-like field merge.
fn loop_key_field(module: &str) -> Option<&'static str> {
    match module {
        "package" | "apt" | "yum" | "dnf" | "pip" | "service" | "systemd" | "user" | "group" => {
            Some("name")
        }
        _ => None,
    }
}

/// Merge runs of ≥3 consecutive interchangeable tasks into a single looped
/// task. A run grows only while the next task is equivalent to the first
/// modulo the loop-key field, so tasks that differ in any other substantive
/// parameter (e.g. `state`) split the run rather than being absorbed;
/// shorter runs pass through unchanged.
pub fn optimize_task_loops(tasks: Vec<Task>) -> Vec<Task> {
    let mut optimized = Vec::with_capacity(tasks.len());
    let mut i = 0;

    while i < tasks.len() {
        let field = loop_key_field(&tasks[i].module)
            .filter(|f| tasks[i].params.contains_key(*f));

        let mut j = i + 1;
        if let Some(field) = field {
            while j < tasks.len() && loop_mergeable(&tasks[i], &tasks[j], field) {
                j += 1;
            }
        }

        let run = &tasks[i..j];
        match field.filter(|_| run.len() >= LOOP_THRESHOLD) {
            Some(field) => optimized.push(merge_run(run, field)),
            None => optimized.extend(run.iter().cloned()),
        }
        i = j;
    }

    optimized
}

/// Interchangeable modulo the loop-key field: same equivalence as
/// `tasks_equivalent` with the per-item key value carved out.
fn loop_mergeable(a: &Task, b: &Task, field: &str) -> bool {
    a.module == b.module
        && b.params.contains_key(field)
        && params_without(a, field) == params_without(b, field)
        && a.notify == b.notify
        && a.loop_items == b.loop_items
        && a.vars == b.vars
}

fn params_without<'a>(task: &'a Task, field: &str) -> IndexMap<&'a str, &'a Value> {
    let mut params = filtered_params(task);
    params.shift_remove(field);
    params
}

fn merge_run(run: &[Task], field: &str) -> Task {
    let items: Vec<Value> = run.iter().map(|t| t.params[field].clone()).collect();

    let mut merged = run[0].clone();
    merged.name = format!("{} ({} items)", merged.name, run.len());
    merged
        .params
        .insert(field.to_string(), Value::String("{{ item }}".to_string()));
    merged.loop_items = Some(items);
    merged
}

/// Report counts for an optimization pass.
pub fn calculate_optimization_metrics(original: &[Task], optimized: &[Task]) -> OptimizationMetrics {
    let original_task_count = original.len();
    let optimized_task_count = optimized.len();
    let tasks_reduced = original_task_count.saturating_sub(optimized_task_count);
    let reduction_percentage = if original_task_count == 0 {
        0.0
    } else {
        let pct = tasks_reduced as f64 / original_task_count as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    };

    OptimizationMetrics {
        original_task_count,
        optimized_task_count,
        tasks_reduced,
        reduction_percentage,
        optimization_applied: tasks_reduced > 0,
    }
}

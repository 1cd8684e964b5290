//! Recipe conversion pipeline.
//!
//! Per resource: extract guards and notifications, apply the rule engine,
//! assemble task and handlers, append one audit record. Recipe-wide:
//! consolidate duplicates, merge loops, compute metrics, finalize the
//! trail. Malformed input degrades to flagged output — a whole-cookbook
//! conversion always completes.

use super::assembler::assemble;
use super::guard::GuardSet;
use super::notify::extract_notifications;
use super::optimizer::{
    calculate_optimization_metrics, consolidate_duplicate_tasks, optimize_task_loops,
    OptimizationMetrics,
};
use super::types::{Handler, ResourceRecord, Task};
use crate::audit::{
    ConversionAuditTrail, ConversionDecision, ResourceComplexity, ResourceConversionRecord,
};
use crate::rules::engine::RuleEngine;
use chrono::Utc;
use log::{debug, warn};
use std::collections::HashSet;
use std::time::Instant;

/// Everything produced for one recipe.
#[derive(Debug)]
pub struct RecipeConversion {
    pub tasks: Vec<Task>,
    pub handlers: Vec<Handler>,
    pub metrics: OptimizationMetrics,
    pub trail: ConversionAuditTrail,
}

/// Convert every resource of a recipe and optimize the result.
///
/// The engine is read-only here; build it (and register custom rules)
/// before conversion starts.
pub fn convert_recipe(
    engine: &RuleEngine,
    resources: &[ResourceRecord],
    cookbook_name: &str,
) -> RecipeConversion {
    let mut trail = ConversionAuditTrail::new(cookbook_name);
    let mut tasks: Vec<Task> = Vec::new();
    let mut handlers: Vec<Handler> = Vec::new();

    for resource in resources {
        let started = Instant::now();
        let guards = GuardSet::extract(&resource.body);
        let notifications = extract_notifications(&resource.body);
        let complexity = estimate_complexity(resource, &guards, notifications.len());

        let mut record = match engine.apply_rule(resource) {
            Some((body, rule)) => {
                let assembled = assemble(resource, body, &guards, &notifications, resources);
                let decision = if engine.is_default(rule) {
                    ConversionDecision::RequiresManualReview
                } else if assembled.warnings.is_empty() {
                    ConversionDecision::FullyConverted
                } else {
                    ConversionDecision::PartiallyConverted
                };

                debug!(
                    "{} converted by '{}' ({:?})",
                    resource.label(),
                    rule.name,
                    decision
                );
                tasks.push(assembled.task);
                handlers.extend(assembled.handlers);

                let mut record = ResourceConversionRecord {
                    resource_type: resource.resource_type.clone(),
                    resource_name: resource.name.clone(),
                    decision,
                    reason: format!("matched rule '{}'", rule.name),
                    complexity,
                    duration_seconds: 0.0,
                    warnings: assembled.warnings,
                    recommendations: Vec::new(),
                    timestamp: Utc::now(),
                };
                if decision == ConversionDecision::RequiresManualReview {
                    record
                        .recommendations
                        .push(format!("convert {} by hand", resource.label()));
                }
                record
            }
            None => {
                // No rule and no default: the resource stays unconverted
                // rather than failing the batch.
                warn!("no conversion rule for {}", resource.label());
                let decision = if resource.body.trim().is_empty() {
                    ConversionDecision::NotApplicable
                } else {
                    ConversionDecision::RequiresManualReview
                };
                ResourceConversionRecord {
                    resource_type: resource.resource_type.clone(),
                    resource_name: resource.name.clone(),
                    decision,
                    reason: "no conversion rule matched".to_string(),
                    complexity,
                    duration_seconds: 0.0,
                    warnings: Vec::new(),
                    recommendations: vec![format!("convert {} by hand", resource.label())],
                    timestamp: Utc::now(),
                }
            }
        };

        record.duration_seconds = started.elapsed().as_secs_f64();
        trail.add_resource_record(record);
    }

    let handlers = dedupe_handlers(handlers);

    let original = tasks.clone();
    let optimized = optimize_task_loops(consolidate_duplicate_tasks(tasks));
    let metrics = calculate_optimization_metrics(&original, &optimized);
    if metrics.optimization_applied {
        trail.add_note(&format!(
            "optimization reduced {} tasks to {} ({:.2}%)",
            metrics.original_task_count, metrics.optimized_task_count,
            metrics.reduction_percentage
        ));
    }
    trail.finalize();

    RecipeConversion {
        tasks: optimized,
        handlers,
        metrics,
        trail,
    }
}

/// Handler names are a pure function of their target, so several resources
/// notifying the same target produce identical entries; keep the first.
fn dedupe_handlers(handlers: Vec<Handler>) -> Vec<Handler> {
    let mut seen = HashSet::new();
    handlers
        .into_iter()
        .filter(|h| seen.insert(h.name.clone()))
        .collect()
}

/// Bucket a resource's complexity from its body size and the number of
/// guard/notification extras. The upstream record carries no hint.
fn estimate_complexity(
    resource: &ResourceRecord,
    guards: &GuardSet,
    notification_count: usize,
) -> ResourceComplexity {
    let mut extras = notification_count;
    if guards.only_if.is_some() {
        extras += 1;
    }
    if guards.not_if.is_some() {
        extras += 1;
    }
    if guards.ignore_failure {
        extras += 1;
    }

    let body_len = resource.body.len();
    if extras >= 3 || body_len > 800 {
        ResourceComplexity::Complex
    } else if extras >= 1 || body_len > 200 {
        ResourceComplexity::Moderate
    } else {
        ResourceComplexity::Simple
    }
}

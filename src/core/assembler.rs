//! Task assembly.
//!
//! Merges one resource's rule-produced module body with guard-derived
//! `when:` and notification-derived `notify:`/handler records. Cross-resource
//! `subscribes` wiring matches `type[name]` labels textually against the
//! other resources of the same recipe.

use super::guard::{guard_to_when, GuardSet};
use super::notify::{Notification, NotificationDirective, NotificationTiming};
use super::types::{Handler, ModuleBody, ResourceRecord, Task, IMMEDIATE_LISTEN};
use crate::rules::service::service_state;
use indexmap::IndexMap;
use serde_yaml_ng::Value;

/// One assembled resource: the task, its handlers, and any warnings that
/// downgrade the conversion decision.
#[derive(Debug)]
pub struct AssembledTask {
    pub task: Task,
    pub handlers: Vec<Handler>,
    pub warnings: Vec<String>,
}

/// Assemble the task and handler records for one resource.
///
/// `recipe` is the full resource list of the recipe, used only to resolve
/// `subscribes` targets.
pub fn assemble(
    resource: &ResourceRecord,
    body: ModuleBody,
    guards: &GuardSet,
    notifications: &[Notification],
    recipe: &[ResourceRecord],
) -> AssembledTask {
    let mut task = Task::from_body(&format!("{} {}", resource.resource_type, resource.name), body);
    let mut handlers = Vec::new();
    let mut warnings = Vec::new();

    // primary_kind only yields only_if/not_if, both of which have a
    // conditional equivalent; ignore_failure is carried as metadata below.
    if let Some(kind) = guards.primary_kind() {
        task.when = Some(guard_to_when(kind).to_string());
        // The original shell condition travels as metadata only; a
        // prior command step is assumed to populate command_result.
        if let Some(condition) = guards.primary_condition() {
            task_vars(&mut task)
                .insert("guard_condition".to_string(), Value::String(condition.to_string()));
        }
    }

    if guards.ignore_failure {
        task_vars(&mut task).insert("chef_ignore_failure".to_string(), Value::Bool(true));
    }

    for notification in notifications {
        match notification.directive {
            NotificationDirective::Notifies => {
                let handler = build_handler(
                    &notification.resource_type,
                    &notification.resource_name,
                    &notification.action,
                    notification.timing,
                );
                task.notify.push(handler.name.clone());
                handlers.push(handler);
            }
            NotificationDirective::Subscribes => {
                let target = notification.target_label();
                let watched_exists = recipe
                    .iter()
                    .any(|r| r.label() == target && r.label() != resource.label());
                if watched_exists {
                    // The subscribing resource owns the handler: its own
                    // action runs when the watched resource changes.
                    handlers.push(build_handler(
                        &resource.resource_type,
                        &resource.name,
                        &notification.action,
                        notification.timing,
                    ));
                } else {
                    warnings.push(format!(
                        "{} subscribes to '{}', which is not in this recipe",
                        resource.label(),
                        target
                    ));
                }
            }
        }
    }

    AssembledTask {
        task,
        handlers,
        warnings,
    }
}

fn task_vars(task: &mut Task) -> &mut IndexMap<String, Value> {
    task.vars.get_or_insert_with(IndexMap::new)
}

/// Build one handler. Timing is normalized to delayed when absent; the
/// `listen` tag is attached only for immediate timing.
fn build_handler(
    resource_type: &str,
    resource_name: &str,
    action: &str,
    timing: Option<NotificationTiming>,
) -> Handler {
    let timing = timing.unwrap_or(NotificationTiming::Delayed);
    Handler {
        name: Handler::name_for(resource_type, resource_name, action),
        body: Some(handler_body(resource_type, resource_name, action)),
        listen: (timing == NotificationTiming::Immediately)
            .then(|| IMMEDIATE_LISTEN.to_string()),
    }
}

/// Best-effort handler body. Service-like targets map the action to a
/// service state; anything else renders a manual-review placeholder so the
/// handler stays renderable.
fn handler_body(resource_type: &str, resource_name: &str, action: &str) -> ModuleBody {
    if matches!(resource_type, "service" | "systemd_unit") {
        let state = service_state(action).unwrap_or("restarted");
        return ModuleBody::new("service")
            .with_param("name", resource_name.to_string())
            .with_param("state", state);
    }

    ModuleBody::new("debug").with_param(
        "msg",
        format!(
            "TODO: handler '{} {}[{}]' requires manual conversion",
            action, resource_type, resource_name
        ),
    )
}

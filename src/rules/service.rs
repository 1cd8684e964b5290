//! Built-in HIGH-priority rule for service resources.

use super::{ConversionRule, RulePriority, RuleType};
use crate::core::types::{ModuleBody, ResourceRecord};

const SERVICE_TYPES: &[&str] = &["service", "systemd_unit"];

/// The built-in service conversion rule.
pub fn rule() -> ConversionRule {
    ConversionRule::new("builtin_service", RuleType::ResourceName, RulePriority::High)
        .with_predicate(|r| SERVICE_TYPES.contains(&r.resource_type.as_str()))
        .with_transform(transform)
}

/// Map a source service action to a target state, if it has one.
pub(crate) fn service_state(action: &str) -> Option<&'static str> {
    if action.contains("restart") {
        Some("restarted")
    } else if action.contains("reload") {
        Some("reloaded")
    } else if action.contains("stop") {
        Some("stopped")
    } else if action.contains("start") {
        Some("started")
    } else {
        None
    }
}

fn transform(resource: &ResourceRecord) -> ModuleBody {
    let mut body = ModuleBody::new("service").with_param("name", resource.name.clone());

    // Source actions may be compound (":[:enable, :start]"); scan for each
    // verb rather than matching the whole string.
    if let Some(state) = service_state(&resource.action) {
        body = body.with_param("state", state);
    }
    if resource.action.contains("disable") {
        body = body.with_param("enabled", false);
    } else if resource.action.contains("enable") {
        body = body.with_param("enabled", true);
    }

    // A bare declaration converges to a running service.
    if !body.params.contains_key("state") && !body.params.contains_key("enabled") {
        body = body.with_param("state", "started");
    }

    body
}

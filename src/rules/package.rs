//! Built-in HIGH-priority rule for package resources.

use super::{body_attribute, ConversionRule, RulePriority, RuleType};
use crate::core::types::{ModuleBody, ResourceRecord};

const PACKAGE_TYPES: &[&str] = &[
    "package",
    "apt_package",
    "yum_package",
    "dnf_package",
    "zypper_package",
];

/// The built-in package conversion rule.
pub fn rule() -> ConversionRule {
    ConversionRule::new("builtin_package", RuleType::ResourceName, RulePriority::High)
        .with_predicate(|r| PACKAGE_TYPES.contains(&r.resource_type.as_str()))
        .with_transform(transform)
}

/// Map a source package action to a target state.
fn package_state(action: &str) -> &'static str {
    match action {
        "upgrade" => "latest",
        "remove" | "purge" => "absent",
        // install is the source default when no action is declared
        _ => "present",
    }
}

fn transform(resource: &ResourceRecord) -> ModuleBody {
    // A pinned version rides along on the package name (apt-style pin);
    // the generic package module has no separate version parameter.
    let name = match body_attribute(&resource.body, "version") {
        Some(version) => format!("{}={}", resource.name, version),
        None => resource.name.clone(),
    };

    ModuleBody::new("package")
        .with_param("name", name)
        .with_param("state", package_state(&resource.action))
}

//! Shared data model for the conversion core.
//!
//! Defines the upstream resource-record contract, the module bodies
//! produced by conversion rules, and the task/handler records consumed by
//! the external YAML emitter. Output-facing types derive Serialize and
//! render their downstream wire shape via `to_mapping`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::{Mapping, Value};
use std::fmt;

// ============================================================================
// Upstream contract
// ============================================================================

/// A resource fragment handed to this core by the upstream DSL scanner.
///
/// `body` is the raw, untokenized text of the resource block — extraction
/// over it is best-effort and never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Source resource type (e.g. "package", "service", "template")
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Resource name (the string argument of the resource block)
    pub name: String,

    /// Declared action (empty when the source relies on the default)
    #[serde(default)]
    pub action: String,

    /// Raw resource body text
    #[serde(default)]
    pub body: String,
}

impl ResourceRecord {
    pub fn new(resource_type: &str, name: &str, action: &str, body: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            action: action.to_string(),
            body: body.to_string(),
        }
    }

    /// The `type[name]` label used for cross-resource notification matching.
    pub fn label(&self) -> String {
        format!("{}[{}]", self.resource_type, self.name)
    }
}

// ============================================================================
// Module body — the output of a rule transformation
// ============================================================================

/// A target module invocation: module key plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleBody {
    /// Target module key (e.g. "package", "service", "debug")
    pub module: String,

    /// Module parameters, emission order preserved
    #[serde(default)]
    pub params: IndexMap<String, Value>,
}

impl ModuleBody {
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            params: IndexMap::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

// ============================================================================
// Task
// ============================================================================

/// A generated playbook task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Human-readable task name
    pub name: String,

    /// Target module key
    pub module: String,

    /// Module parameters
    #[serde(default)]
    pub params: IndexMap<String, Value>,

    /// Conditional expression (guard-derived)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    /// Handler names notified by this task
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notify: Vec<String>,

    /// Loop values (set by the optimizer when tasks collapse into a loop)
    #[serde(
        rename = "loop",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub loop_items: Option<Vec<Value>>,

    /// Task-scoped variables (carries guard metadata, among others)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<IndexMap<String, Value>>,
}

impl Task {
    /// Wrap a rule-produced module body into a bare task.
    pub fn from_body(name: &str, body: ModuleBody) -> Self {
        Self {
            name: name.to_string(),
            module: body.module,
            params: body.params,
            when: None,
            notify: Vec::new(),
            loop_items: None,
            vars: None,
        }
    }

    /// Render the downstream wire shape:
    /// `{name, <module>: {params}, when?, notify?, loop?, vars?}`.
    pub fn to_mapping(&self) -> Mapping {
        let mut map = Mapping::new();
        map.insert(
            Value::String("name".to_string()),
            Value::String(self.name.clone()),
        );

        let mut params = Mapping::new();
        for (k, v) in &self.params {
            params.insert(Value::String(k.clone()), v.clone());
        }
        map.insert(Value::String(self.module.clone()), Value::Mapping(params));

        if let Some(ref when) = self.when {
            map.insert(
                Value::String("when".to_string()),
                Value::String(when.clone()),
            );
        }
        if !self.notify.is_empty() {
            map.insert(
                Value::String("notify".to_string()),
                Value::Sequence(
                    self.notify
                        .iter()
                        .map(|n| Value::String(n.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(ref items) = self.loop_items {
            map.insert(
                Value::String("loop".to_string()),
                Value::Sequence(items.clone()),
            );
        }
        if let Some(ref vars) = self.vars {
            let mut vm = Mapping::new();
            for (k, v) in vars {
                vm.insert(Value::String(k.clone()), v.clone());
            }
            map.insert(Value::String("vars".to_string()), Value::Mapping(vm));
        }

        map
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Listen tag attached to handlers wired from immediate-timing notifications.
pub const IMMEDIATE_LISTEN: &str = "immediate_notify";

/// A generated playbook handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    /// Deterministic name — collisions across resources notifying the same
    /// target are intended and enable deduplication by name
    pub name: String,

    /// Best-effort handler body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ModuleBody>,

    /// Listen tag, set only for immediate-timing notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
}

impl Handler {
    /// The pure name function: `action type[name]`.
    pub fn name_for(resource_type: &str, resource_name: &str, action: &str) -> String {
        format!("{} {}[{}]", action, resource_type, resource_name)
    }

    /// Render the handler as a playbook mapping.
    pub fn to_mapping(&self) -> Mapping {
        let mut map = Mapping::new();
        map.insert(
            Value::String("name".to_string()),
            Value::String(self.name.clone()),
        );
        if let Some(ref body) = self.body {
            let mut params = Mapping::new();
            for (k, v) in &body.params {
                params.insert(Value::String(k.clone()), v.clone());
            }
            map.insert(Value::String(body.module.clone()), Value::Mapping(params));
        }
        if let Some(ref listen) = self.listen {
            map.insert(
                Value::String("listen".to_string()),
                Value::String(listen.clone()),
            );
        }
        map
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_label() {
        let r = ResourceRecord::new("service", "nginx", "enable", "");
        assert_eq!(r.label(), "service[nginx]");
    }

    #[test]
    fn test_resource_record_deserialize() {
        let yaml = r#"
type: package
name: curl
action: install
body: "package 'curl' do\n  action :install\nend"
"#;
        let r: ResourceRecord = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(r.resource_type, "package");
        assert_eq!(r.name, "curl");
        assert!(r.body.contains("action :install"));
    }

    #[test]
    fn test_module_body_builder() {
        let body = ModuleBody::new("package")
            .with_param("name", "curl")
            .with_param("state", "present");
        assert_eq!(body.module, "package");
        assert_eq!(body.params["name"], Value::String("curl".to_string()));
        assert_eq!(body.params.len(), 2);
    }

    #[test]
    fn test_task_to_mapping_shape() {
        let mut task = Task::from_body(
            "package curl",
            ModuleBody::new("package")
                .with_param("name", "curl")
                .with_param("state", "present"),
        );
        task.when = Some("command_result.rc == 0".to_string());
        task.notify = vec!["restart service[nginx]".to_string()];

        let map = task.to_mapping();
        let key = |s: &str| Value::String(s.to_string());
        assert_eq!(
            map.get(&key("name")),
            Some(&Value::String("package curl".to_string()))
        );
        assert!(map.get(&key("package")).is_some());
        assert!(map.get(&key("when")).is_some());
        assert!(map.get(&key("notify")).is_some());
        assert!(map.get(&key("loop")).is_none());
    }

    #[test]
    fn test_task_loop_serializes_as_loop_key() {
        let mut task = Task::from_body("pkgs", ModuleBody::new("package"));
        task.loop_items = Some(vec![Value::String("curl".to_string())]);
        let yaml = serde_yaml_ng::to_string(&task).unwrap();
        assert!(yaml.contains("loop:"));
        assert!(!yaml.contains("loop_items"));
    }

    #[test]
    fn test_handler_name_deterministic() {
        let a = Handler::name_for("service", "nginx", "restart");
        let b = Handler::name_for("service", "nginx", "restart");
        assert_eq!(a, b);
        assert_eq!(a, "restart service[nginx]");
    }

    #[test]
    fn test_handler_to_mapping_with_listen() {
        let h = Handler {
            name: "restart service[nginx]".to_string(),
            body: Some(
                ModuleBody::new("service")
                    .with_param("name", "nginx")
                    .with_param("state", "restarted"),
            ),
            listen: Some(IMMEDIATE_LISTEN.to_string()),
        };
        let map = h.to_mapping();
        let key = |s: &str| Value::String(s.to_string());
        assert!(map.get(&key("service")).is_some());
        assert_eq!(
            map.get(&key("listen")),
            Some(&Value::String("immediate_notify".to_string()))
        );
    }
}

//! Conversion rules — named, prioritized (predicate, transformation) pairs
//! deciding how one source resource becomes target configuration.

pub mod engine;
pub mod package;
pub mod service;

use crate::core::types::{ModuleBody, ResourceRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Setup-time rule errors. Conversion itself never fails; a misconfigured
/// rule set is a programmer error and fails at registration.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{0}' is already registered")]
    DuplicateRule(String),

    #[error("invalid rule pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// How a rule decides whether it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    PatternMatch,
    ResourceName,
    AttributeBased,
    Conditional,
    Custom,
}

/// Rule priority. Lower ordinal evaluates earlier; ties keep registration
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePriority {
    Critical,
    High,
    Normal,
    Low,
}

impl RulePriority {
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 10,
            Self::Normal => 50,
            Self::Low => 100,
        }
    }
}

impl fmt::Display for RulePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::High => write!(f, "HIGH"),
            Self::Normal => write!(f, "NORMAL"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// Per-rule match predicate over the full resource record.
pub type RulePredicate = Box<dyn Fn(&ResourceRecord) -> bool + Send + Sync>;

/// Per-rule transformation producing a target module body.
pub type RuleTransform = Box<dyn Fn(&ResourceRecord) -> ModuleBody + Send + Sync>;

/// One conversion rule. Created at setup and immutable thereafter except
/// for enable/disable and predicate/transformation attachment.
pub struct ConversionRule {
    pub name: String,
    pub rule_type: RuleType,
    pub priority: RulePriority,
    pattern: Option<Regex>,
    predicates: Vec<RulePredicate>,
    transform: Option<RuleTransform>,
    enabled: bool,
}

impl ConversionRule {
    pub fn new(name: &str, rule_type: RuleType, priority: RulePriority) -> Self {
        Self {
            name: name.to_string(),
            rule_type,
            priority,
            pattern: None,
            predicates: Vec::new(),
            transform: None,
            enabled: true,
        }
    }

    /// Attach a pattern, tested against the resource type. The pattern must
    /// match before any predicate is evaluated.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, RuleError> {
        self.pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Attach a match predicate. All predicates must pass.
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&ResourceRecord) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Attach the transformation invoked on a match.
    pub fn with_transform(
        mut self,
        transform: impl Fn(&ResourceRecord) -> ModuleBody + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether this rule applies to a resource. Disabled rules never match;
    /// a rule with no pattern and no predicates matches everything (used
    /// for catch-alls and the default rule).
    pub fn matches(&self, resource: &ResourceRecord) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(ref pattern) = self.pattern {
            if !pattern.is_match(&resource.resource_type) {
                return false;
            }
        }
        self.predicates.iter().all(|p| p(resource))
    }

    /// Run the transformation, if one is attached.
    pub fn apply(&self, resource: &ResourceRecord) -> Option<ModuleBody> {
        self.transform.as_ref().map(|t| t(resource))
    }
}

impl fmt::Debug for ConversionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRule")
            .field("name", &self.name)
            .field("rule_type", &self.rule_type)
            .field("priority", &self.priority)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .field("predicates", &self.predicates.len())
            .field("has_transform", &self.transform.is_some())
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// The LOW-priority catch-all: renders an explicit manual-conversion
/// placeholder so no resource is ever silently dropped.
pub fn fallback_rule() -> ConversionRule {
    ConversionRule::new("manual_conversion_fallback", RuleType::Custom, RulePriority::Low)
        .with_transform(|resource| {
            ModuleBody::new("debug").with_param(
                "msg",
                format!(
                    "TODO: resource '{}' (action '{}') requires manual conversion",
                    resource.label(),
                    resource.action
                ),
            )
        })
}

static ATTRIBUTE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w+)\s+['"]([^'"]+)['"]"#).expect("static regex"));

/// Best-effort lookup of a quoted attribute value in a raw resource body,
/// e.g. `version '1.2.3'`. First occurrence wins.
pub(crate) fn body_attribute(body: &str, attribute: &str) -> Option<String> {
    ATTRIBUTE_VALUE
        .captures_iter(body)
        .find(|c| &c[1] == attribute)
        .map(|c| c[2].to_string())
}

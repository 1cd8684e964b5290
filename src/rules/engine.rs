//! Rule engine — priority-ordered rule registry and dispatch.
//!
//! Built once per migration run (or per worker) and treated as read-only
//! during conversion; registration is a setup-time concern.

use super::{fallback_rule, ConversionRule, RuleError};
use crate::core::types::{ModuleBody, ResourceRecord};
use log::debug;
use std::collections::HashMap;

/// Priority-ordered rule registry.
///
/// The rule list is re-sorted (stably, ascending by priority ordinal) after
/// every registration, so matching is always a single in-order scan.
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: Vec<ConversionRule>,
    by_name: HashMap<String, usize>,
    default_rule: Option<ConversionRule>,
}

impl RuleEngine {
    /// An empty engine with no rules and no default.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine preloaded with the built-in `package`/`service` rules and
    /// the manual-conversion fallback as default.
    pub fn with_builtin_rules() -> Self {
        let mut engine = Self::new();
        // Built-in names are distinct; registration cannot fail here.
        let _ = engine.register(super::package::rule());
        let _ = engine.register(super::service::rule());
        engine.set_default_rule(fallback_rule());
        engine
    }

    /// Register a rule. Two rules under one name is a configuration error
    /// and fails at setup time.
    pub fn register(&mut self, rule: ConversionRule) -> Result<(), RuleError> {
        if self.by_name.contains_key(&rule.name) {
            return Err(RuleError::DuplicateRule(rule.name));
        }
        debug!("registering rule '{}' ({})", rule.name, rule.priority);
        self.rules.push(rule);
        self.rules.sort_by_key(|r| r.priority.ordinal());
        self.reindex();
        Ok(())
    }

    /// Remove a rule by name. Unregistering an absent name is a no-op
    /// returning false.
    pub fn unregister(&mut self, name: &str) -> bool {
        match self.by_name.remove(name) {
            Some(position) => {
                self.rules.remove(position);
                self.reindex();
                true
            }
            None => false,
        }
    }

    /// Set the rule consulted when nothing else matches.
    pub fn set_default_rule(&mut self, rule: ConversionRule) {
        self.default_rule = Some(rule);
    }

    pub fn get(&self, name: &str) -> Option<&ConversionRule> {
        self.by_name.get(name).map(|&i| &self.rules[i])
    }

    /// Flip a rule's enabled flag. Returns false for an unknown name.
    pub fn set_rule_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.by_name.get(name).copied() {
            Some(position) => {
                self.rules[position].set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// First rule in priority order whose match succeeds, else the default,
    /// else none.
    pub fn find_matching_rule(&self, resource: &ResourceRecord) -> Option<&ConversionRule> {
        self.rules
            .iter()
            .find(|rule| rule.matches(resource))
            .or_else(|| {
                self.default_rule
                    .as_ref()
                    .filter(|rule| rule.matches(resource))
            })
    }

    /// All matching rules in priority order. Excludes the default.
    pub fn find_all_matching_rules(&self, resource: &ResourceRecord) -> Vec<&ConversionRule> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(resource))
            .collect()
    }

    /// Match and transform in one step. Returns the produced module body
    /// with the rule that produced it, or nothing when no rule (and no
    /// default) matched or the matched rule has no transformation — the
    /// caller leaves the resource unconverted rather than failing.
    pub fn apply_rule(
        &self,
        resource: &ResourceRecord,
    ) -> Option<(ModuleBody, &ConversionRule)> {
        let rule = self.find_matching_rule(resource)?;
        let body = rule.apply(resource)?;
        debug!("rule '{}' converted {}", rule.name, resource.label());
        Some((body, rule))
    }

    /// Whether a matched rule is the engine's default.
    pub fn is_default(&self, rule: &ConversionRule) -> bool {
        self.default_rule
            .as_ref()
            .is_some_and(|d| d.name == rule.name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn reindex(&mut self) {
        self.by_name = self
            .rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RulePriority, RuleType};

    fn any_resource() -> ResourceRecord {
        ResourceRecord::new("cookbook_file", "motd", "create", "")
    }

    fn catch_all(name: &str, priority: RulePriority) -> ConversionRule {
        ConversionRule::new(name, RuleType::Custom, priority)
            .with_transform(|r| ModuleBody::new("debug").with_param("msg", r.label()))
    }

    #[test]
    fn test_higher_priority_wins() {
        let mut engine = RuleEngine::new();
        engine.register(catch_all("low", RulePriority::Low)).unwrap();
        engine
            .register(catch_all("critical", RulePriority::Critical))
            .unwrap();

        let matched = engine.find_matching_rule(&any_resource()).unwrap();
        assert_eq!(matched.name, "critical");
    }

    #[test]
    fn test_stable_order_on_priority_tie() {
        let mut engine = RuleEngine::new();
        engine.register(catch_all("first", RulePriority::Normal)).unwrap();
        engine.register(catch_all("second", RulePriority::Normal)).unwrap();

        let matched = engine.find_matching_rule(&any_resource()).unwrap();
        assert_eq!(matched.name, "first");
    }

    #[test]
    fn test_duplicate_name_fails_at_setup() {
        let mut engine = RuleEngine::new();
        engine.register(catch_all("dup", RulePriority::Normal)).unwrap();
        let result = engine.register(catch_all("dup", RulePriority::High));
        assert!(matches!(result, Err(RuleError::DuplicateRule(_))));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_unregister_absent_is_noop_false() {
        let mut engine = RuleEngine::new();
        assert!(!engine.unregister("ghost"));
    }

    #[test]
    fn test_unregister_then_rematch() {
        let mut engine = RuleEngine::new();
        engine.register(catch_all("a", RulePriority::High)).unwrap();
        engine.register(catch_all("b", RulePriority::Low)).unwrap();

        assert!(engine.unregister("a"));
        let matched = engine.find_matching_rule(&any_resource()).unwrap();
        assert_eq!(matched.name, "b");
        assert!(engine.get("a").is_none());
        assert!(engine.get("b").is_some());
    }

    #[test]
    fn test_no_match_no_default_returns_none() {
        let mut engine = RuleEngine::new();
        let never = ConversionRule::new("never", RuleType::Conditional, RulePriority::High)
            .with_predicate(|_| false);
        engine.register(never).unwrap();

        assert!(engine.find_matching_rule(&any_resource()).is_none());
        assert!(engine.apply_rule(&any_resource()).is_none());
    }

    #[test]
    fn test_default_rule_is_last_resort() {
        let mut engine = RuleEngine::new();
        engine.set_default_rule(catch_all("fallback", RulePriority::Low));

        let matched = engine.find_matching_rule(&any_resource()).unwrap();
        assert_eq!(matched.name, "fallback");
        assert!(engine.is_default(matched));
    }

    #[test]
    fn test_find_all_excludes_default() {
        let mut engine = RuleEngine::new();
        engine.register(catch_all("a", RulePriority::High)).unwrap();
        engine.register(catch_all("b", RulePriority::Low)).unwrap();
        engine.set_default_rule(catch_all("fallback", RulePriority::Low));

        let all = engine.find_all_matching_rules(&any_resource());
        let names: Vec<&str> = all.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_disabled_rule_skipped() {
        let mut engine = RuleEngine::new();
        engine.register(catch_all("a", RulePriority::High)).unwrap();
        engine.register(catch_all("b", RulePriority::Low)).unwrap();

        assert!(engine.set_rule_enabled("a", false));
        let matched = engine.find_matching_rule(&any_resource()).unwrap();
        assert_eq!(matched.name, "b");
        assert!(!engine.set_rule_enabled("ghost", false));
    }

    #[test]
    fn test_builtin_engine_converts_package_and_service() {
        let engine = RuleEngine::with_builtin_rules();

        let pkg = ResourceRecord::new("package", "curl", "install", "");
        let (body, rule) = engine.apply_rule(&pkg).unwrap();
        assert_eq!(body.module, "package");
        assert!(!engine.is_default(rule));

        let svc = ResourceRecord::new("service", "nginx", "start", "");
        let (body, _) = engine.apply_rule(&svc).unwrap();
        assert_eq!(body.module, "service");
    }

    #[test]
    fn test_builtin_engine_falls_back_for_unknown_type() {
        let engine = RuleEngine::with_builtin_rules();
        let lwrp = ResourceRecord::new("mysql_database", "app", "create", "");
        let (body, rule) = engine.apply_rule(&lwrp).unwrap();
        assert_eq!(body.module, "debug");
        assert!(engine.is_default(rule));
    }
}

//! Search-query translation.
//!
//! Chef search expresses a small boolean query language over
//! `attribute:value` pairs. This module classifies operators per condition,
//! decides between static and dynamically-generated inventory, and emits an
//! inventory skeleton for the external dynamic-inventory script generator.
//!
//! AND/OR order is captured as metadata only and never logically combined —
//! the generated inventory script evaluates it, not this translator. The
//! split is parenthesis-depth aware solely so the leading range pattern
//! `key:(>X AND <Y)` survives as a single fragment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Condition operator, derived deterministically from value syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOperator {
    Equal,
    NotEqual,
    Wildcard,
    Regex,
    Range,
    Contains,
    Unknown,
}

/// Logical join between adjacent conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

/// Query complexity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchComplexity {
    Simple,
    Intermediate,
    Complex,
}

/// One parsed `key:value` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCondition {
    pub key: String,
    pub value: String,
    pub operator: SearchOperator,
}

/// An inventory group: either one group per condition, or the synthetic
/// group aggregating all condition groups of a multi-condition query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InventoryGroup {
    Combined {
        groups: Vec<String>,
        operators: Vec<LogicalOperator>,
    },
    Condition {
        key: String,
        value: String,
        operator: SearchOperator,
    },
}

/// Name of the synthetic group added for multi-condition queries.
pub const COMBINED_GROUP: &str = "combined_search_results";

/// Inventory skeleton emitted for one query.
///
/// Once any condition requires wildcard/regex/range matching,
/// `dynamic_script_needed` is true for the whole query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryConfig {
    #[serde(default)]
    pub groups: IndexMap<String, InventoryGroup>,

    #[serde(default)]
    pub variables: IndexMap<String, String>,

    #[serde(default)]
    pub dynamic_script_needed: bool,
}

/// Full translation of one search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedSearch {
    pub conditions: Vec<SearchCondition>,
    pub operators: Vec<LogicalOperator>,
    pub complexity: SearchComplexity,
    pub inventory: InventoryConfig,
    /// True when any fragment was not shaped `key:value`.
    pub needs_manual_review: bool,
}

/// Translate a raw Chef search-query string. Total: a query with zero
/// recognizable conditions yields an empty inventory, never an error.
pub fn translate_query(query: &str) -> TranslatedSearch {
    let (fragments, operators) = split_query(query);
    let conditions: Vec<SearchCondition> = fragments.iter().map(|f| classify(f)).collect();

    let complexity = classify_complexity(&conditions, &operators);
    let needs_manual_review = conditions
        .iter()
        .any(|c| c.operator == SearchOperator::Unknown);

    let inventory = build_inventory(&conditions, &operators, complexity);

    TranslatedSearch {
        conditions,
        operators,
        complexity,
        inventory,
        needs_manual_review,
    }
}

/// Split a query on literal `AND`/`OR` tokens at parenthesis depth zero.
/// The operator sequence length is always (fragment count − 1).
fn split_query(query: &str) -> (Vec<String>, Vec<LogicalOperator>) {
    let mut fragments = Vec::new();
    let mut operators = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;

    for token in query.split_whitespace() {
        let is_join = depth == 0 && (token == "AND" || token == "OR");
        if is_join && !current.is_empty() {
            fragments.push(std::mem::take(&mut current));
            operators.push(if token == "AND" {
                LogicalOperator::And
            } else {
                LogicalOperator::Or
            });
            continue;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(token);
        depth += token.matches('(').count();
        depth = depth.saturating_sub(token.matches(')').count());
    }

    if !current.is_empty() {
        fragments.push(current);
    }

    // A trailing or dangling join has no right-hand side; keep the
    // invariant operators.len() == fragments.len().saturating_sub(1).
    operators.truncate(fragments.len().saturating_sub(1));

    (fragments, operators)
}

/// Classify one fragment. Applied in order: range, regex, not_equal,
/// wildcard, tags-contains, equal; fragments not shaped `key:value` are
/// unknown and flagged for manual review by the caller.
fn classify(fragment: &str) -> SearchCondition {
    let Some((key, value)) = fragment.split_once(':') else {
        return SearchCondition {
            key: fragment.trim().to_string(),
            value: String::new(),
            operator: SearchOperator::Unknown,
        };
    };
    let key = key.trim();
    let value = value.trim();

    let (value, operator) = if value.starts_with('(')
        && value.ends_with(')')
        && (value.contains('<') || value.contains('>'))
    {
        (value.to_string(), SearchOperator::Range)
    } else if let Some(v) = value.strip_prefix('~') {
        (v.to_string(), SearchOperator::Regex)
    } else if let Some(v) = value.strip_prefix('!') {
        (v.to_string(), SearchOperator::NotEqual)
    } else if value.contains('*') {
        (value.to_string(), SearchOperator::Wildcard)
    } else if key == "tags" {
        (value.to_string(), SearchOperator::Contains)
    } else {
        (value.to_string(), SearchOperator::Equal)
    };

    SearchCondition {
        key: key.to_string(),
        value,
        operator,
    }
}

fn classify_complexity(
    conditions: &[SearchCondition],
    operators: &[LogicalOperator],
) -> SearchComplexity {
    let all_basic = conditions.iter().all(|c| {
        matches!(
            c.operator,
            SearchOperator::Equal | SearchOperator::Contains
        )
    });
    if all_basic && operators.is_empty() {
        return SearchComplexity::Simple;
    }

    let any_pattern = conditions.iter().any(|c| {
        matches!(
            c.operator,
            SearchOperator::Regex | SearchOperator::NotEqual
        )
    });
    if any_pattern {
        return SearchComplexity::Intermediate;
    }

    SearchComplexity::Complex
}

fn needs_dynamic_matching(condition: &SearchCondition) -> bool {
    matches!(
        condition.operator,
        SearchOperator::Wildcard | SearchOperator::Regex | SearchOperator::Range
    )
}

/// Replace every non-alphanumeric character with an underscore.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn build_inventory(
    conditions: &[SearchCondition],
    operators: &[LogicalOperator],
    complexity: SearchComplexity,
) -> InventoryConfig {
    // Zero recognizable conditions: empty inventory, no dynamic script.
    if conditions
        .iter()
        .all(|c| c.operator == SearchOperator::Unknown)
    {
        return InventoryConfig::default();
    }

    let mut groups = IndexMap::new();
    let mut variables = IndexMap::new();
    let mut condition_groups = Vec::new();

    for (index, cond) in conditions.iter().enumerate() {
        if cond.operator == SearchOperator::Unknown {
            continue;
        }

        // The ordinal index avoids collisions on repeated keys.
        let mut group_name = format!("{}_{}", sanitize(&format!("{}_{}", cond.key, cond.value)), index);
        if cond.operator == SearchOperator::NotEqual {
            group_name = format!("not_{}", group_name);
        }

        groups.insert(
            group_name.clone(),
            InventoryGroup::Condition {
                key: cond.key.clone(),
                value: cond.value.clone(),
                operator: cond.operator,
            },
        );
        condition_groups.push(group_name);

        if matches!(
            cond.operator,
            SearchOperator::Equal | SearchOperator::NotEqual
        ) {
            variables.insert(format!("{}_{}", cond.key, index), cond.value.clone());
        }
    }

    if condition_groups.len() >= 2 {
        groups.insert(
            COMBINED_GROUP.to_string(),
            InventoryGroup::Combined {
                groups: condition_groups,
                operators: operators.to_vec(),
            },
        );
    }

    let dynamic_script_needed = complexity != SearchComplexity::Simple
        || conditions.iter().any(needs_dynamic_matching);

    InventoryConfig {
        groups,
        variables,
        dynamic_script_needed,
    }
}

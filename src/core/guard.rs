//! Guard extraction and translation.
//!
//! Pulls `only_if`/`not_if`/`ignore_failure` out of a raw resource body and
//! maps guard kinds to canonical conditional expressions. Extraction is a
//! single pass per guard kind; only the first occurrence of each kind is
//! kept (documented limitation). Never fails — a body without guards yields
//! an empty set.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ONLY_IF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"only_if\s+['"]([^'"]+)['"]"#).expect("static regex"));

static NOT_IF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"not_if\s+['"]([^'"]+)['"]"#).expect("static regex"));

static IGNORE_FAILURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bignore_failure\s+true\b").expect("static regex"));

/// Guard kinds understood by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    OnlyIf,
    NotIf,
    IgnoreFailure,
}

/// Guards extracted from one resource body. Condition strings are opaque
/// shell/ruby text with surrounding quotes stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_if: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_if: Option<String>,

    #[serde(default)]
    pub ignore_failure: bool,
}

impl GuardSet {
    /// Extract guards from a raw resource body. First occurrence per kind
    /// wins; `ignore_failure` is set only on the whole-word directive.
    pub fn extract(body: &str) -> Self {
        Self {
            only_if: ONLY_IF_RE
                .captures(body)
                .map(|c| c[1].trim().to_string()),
            not_if: NOT_IF_RE
                .captures(body)
                .map(|c| c[1].trim().to_string()),
            ignore_failure: IGNORE_FAILURE_RE.is_match(body),
        }
    }

    /// True when no guard of any kind was found.
    pub fn is_empty(&self) -> bool {
        self.only_if.is_none() && self.not_if.is_none() && !self.ignore_failure
    }

    /// The guard kind that drives the task conditional, `only_if` first.
    pub fn primary_kind(&self) -> Option<GuardKind> {
        if self.only_if.is_some() {
            Some(GuardKind::OnlyIf)
        } else if self.not_if.is_some() {
            Some(GuardKind::NotIf)
        } else {
            None
        }
    }

    /// The raw condition text of the primary guard, carried as metadata.
    pub fn primary_condition(&self) -> Option<&str> {
        self.only_if.as_deref().or(self.not_if.as_deref())
    }
}

/// Map a guard kind to its canonical conditional expression.
///
/// The guard's actual shell condition is not evaluated — the expression
/// assumes a prior command-execution step populated `command_result`. Any
/// kind without a conditional equivalent yields an empty string, signalling
/// the caller to flag the resource for manual handling.
pub fn guard_to_when(kind: GuardKind) -> &'static str {
    match kind {
        GuardKind::OnlyIf => "command_result.rc == 0",
        GuardKind::NotIf => "command_result.rc != 0",
        GuardKind::IgnoreFailure => "",
    }
}

//! Conversion audit trail.
//!
//! Records one decision per resource and computes a batch quality score.
//! The score is derived, never stored; its formula and the exported field
//! names are a stable external contract.

pub mod report;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-resource conversion outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionDecision {
    FullyConverted,
    PartiallyConverted,
    RequiresManualReview,
    NotApplicable,
    Error,
}

impl ConversionDecision {
    pub fn weight(self) -> f64 {
        match self {
            Self::FullyConverted => 1.0,
            Self::PartiallyConverted => 0.6,
            Self::RequiresManualReview => 0.3,
            Self::NotApplicable => 0.5,
            Self::Error => 0.0,
        }
    }
}

/// How involved the source resource was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceComplexity {
    Simple,
    Moderate,
    Complex,
}

impl ResourceComplexity {
    pub fn weight(self) -> f64 {
        match self {
            Self::Simple => 1.0,
            Self::Moderate => 0.8,
            Self::Complex => 0.6,
        }
    }
}

/// One decision record, appended per resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConversionRecord {
    pub resource_type: String,
    pub resource_name: String,
    pub decision: ConversionDecision,
    pub reason: String,
    pub complexity: ResourceComplexity,
    pub duration_seconds: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Timestamped free-text note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditNote {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Summary counts plus derived rates. Field names are a stable contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_resources: usize,
    pub fully_converted: usize,
    pub partially_converted: usize,
    pub requires_manual_review: usize,
    pub errors: usize,
    pub conversion_rate_percent: f64,
    pub quality_score: f64,
}

/// Ordered conversion records for one recipe/cookbook run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionAuditTrail {
    pub migration_id: String,
    pub cookbook_name: String,
    records: Vec<ResourceConversionRecord>,
    notes: Vec<AuditNote>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ConversionAuditTrail {
    pub fn new(cookbook_name: &str) -> Self {
        let started_at = Utc::now();
        Self {
            migration_id: generate_migration_id(started_at),
            cookbook_name: cookbook_name.to_string(),
            records: Vec::new(),
            notes: Vec::new(),
            started_at,
            ended_at: None,
        }
    }

    pub fn add_resource_record(&mut self, record: ResourceConversionRecord) {
        self.records.push(record);
    }

    pub fn add_note(&mut self, text: &str) {
        self.notes.push(AuditNote {
            timestamp: Utc::now(),
            text: text.to_string(),
        });
    }

    /// Stamp the end time. Finalizing twice keeps the first stamp.
    pub fn finalize(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
        }
    }

    pub fn records(&self) -> &[ResourceConversionRecord] {
        &self.records
    }

    pub fn notes(&self) -> &[AuditNote] {
        &self.notes
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Average of decision_weight × complexity_weight over all records,
    /// scaled ×100, two-decimal rounding. Vacuously perfect with zero
    /// records.
    pub fn quality_score(&self) -> f64 {
        if self.records.is_empty() {
            return 100.0;
        }
        let total: f64 = self
            .records
            .iter()
            .map(|r| r.decision.weight() * r.complexity.weight())
            .sum();
        round2(total / self.records.len() as f64 * 100.0)
    }

    pub fn summary(&self) -> AuditSummary {
        let count = |d: ConversionDecision| self.records.iter().filter(|r| r.decision == d).count();

        let total_resources = self.records.len();
        let fully_converted = count(ConversionDecision::FullyConverted);
        let partially_converted = count(ConversionDecision::PartiallyConverted);

        // Partial conversions produced usable output, so they count toward
        // the rate; the quality score already discounts them.
        let conversion_rate_percent = if total_resources == 0 {
            100.0
        } else {
            round2((fully_converted + partially_converted) as f64 / total_resources as f64 * 100.0)
        };

        AuditSummary {
            total_resources,
            fully_converted,
            partially_converted,
            requires_manual_review: count(ConversionDecision::RequiresManualReview),
            errors: count(ConversionDecision::Error),
            conversion_rate_percent,
            quality_score: self.quality_score(),
        }
    }
}

fn generate_migration_id(started_at: DateTime<Utc>) -> String {
    let nanos = started_at.timestamp_nanos_opt().unwrap_or_default();
    format!("mig-{:012x}", (nanos as u64) & 0xFFFF_FFFF_FFFF)
}

/// Convenience constructor for one record.
pub fn record(
    resource_type: &str,
    resource_name: &str,
    decision: ConversionDecision,
    reason: &str,
    complexity: ResourceComplexity,
    duration_seconds: f64,
) -> ResourceConversionRecord {
    ResourceConversionRecord {
        resource_type: resource_type.to_string(),
        resource_name: resource_name.to_string(),
        decision,
        reason: reason.to_string(),
        complexity,
        duration_seconds,
        warnings: Vec::new(),
        recommendations: Vec::new(),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_trail_is_vacuously_perfect() {
        let trail = ConversionAuditTrail::new("webserver");
        assert_eq!(trail.quality_score(), 100.0);
        let summary = trail.summary();
        assert_eq!(summary.total_resources, 0);
        assert_eq!(summary.conversion_rate_percent, 100.0);
    }

    #[test]
    fn test_single_fully_converted_simple() {
        let mut trail = ConversionAuditTrail::new("webserver");
        trail.add_resource_record(record(
            "package",
            "curl",
            ConversionDecision::FullyConverted,
            "matched rule 'builtin_package'",
            ResourceComplexity::Simple,
            0.001,
        ));
        assert_eq!(trail.quality_score(), 100.0);
    }

    #[test]
    fn test_single_error_scores_zero() {
        for complexity in [
            ResourceComplexity::Simple,
            ResourceComplexity::Moderate,
            ResourceComplexity::Complex,
        ] {
            let mut trail = ConversionAuditTrail::new("webserver");
            trail.add_resource_record(record(
                "ruby_block",
                "compute",
                ConversionDecision::Error,
                "conversion failed",
                complexity,
                0.0,
            ));
            assert_eq!(trail.quality_score(), 0.0);
        }
    }

    #[test]
    fn test_mixed_records_score() {
        let mut trail = ConversionAuditTrail::new("webserver");
        trail.add_resource_record(record(
            "package",
            "curl",
            ConversionDecision::FullyConverted,
            "ok",
            ResourceComplexity::Simple,
            0.0,
        ));
        trail.add_resource_record(record(
            "template",
            "/etc/a",
            ConversionDecision::PartiallyConverted,
            "warnings",
            ResourceComplexity::Moderate,
            0.0,
        ));
        // (1.0*1.0 + 0.6*0.8) / 2 * 100 = 74.0
        assert_eq!(trail.quality_score(), 74.0);
    }

    #[test]
    fn test_two_decimal_rounding() {
        let mut trail = ConversionAuditTrail::new("webserver");
        for _ in 0..3 {
            trail.add_resource_record(record(
                "x",
                "y",
                ConversionDecision::RequiresManualReview,
                "",
                ResourceComplexity::Simple,
                0.0,
            ));
        }
        trail.add_resource_record(record(
            "x",
            "y",
            ConversionDecision::FullyConverted,
            "",
            ResourceComplexity::Complex,
            0.0,
        ));
        // (0.3*3 + 0.6) / 4 * 100 = 37.5
        assert_eq!(trail.quality_score(), 37.5);
    }

    #[test]
    fn test_summary_counts() {
        let mut trail = ConversionAuditTrail::new("webserver");
        trail.add_resource_record(record(
            "package",
            "a",
            ConversionDecision::FullyConverted,
            "",
            ResourceComplexity::Simple,
            0.0,
        ));
        trail.add_resource_record(record(
            "service",
            "b",
            ConversionDecision::PartiallyConverted,
            "",
            ResourceComplexity::Simple,
            0.0,
        ));
        trail.add_resource_record(record(
            "lwrp",
            "c",
            ConversionDecision::RequiresManualReview,
            "",
            ResourceComplexity::Complex,
            0.0,
        ));
        trail.add_resource_record(record(
            "ruby_block",
            "d",
            ConversionDecision::Error,
            "",
            ResourceComplexity::Complex,
            0.0,
        ));

        let summary = trail.summary();
        assert_eq!(summary.total_resources, 4);
        assert_eq!(summary.fully_converted, 1);
        assert_eq!(summary.partially_converted, 1);
        assert_eq!(summary.requires_manual_review, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.conversion_rate_percent, 50.0);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut trail = ConversionAuditTrail::new("webserver");
        assert!(trail.ended_at().is_none());
        trail.finalize();
        let first = trail.ended_at().unwrap();
        trail.finalize();
        assert_eq!(trail.ended_at().unwrap(), first);
    }

    #[test]
    fn test_notes_are_timestamped_in_order() {
        let mut trail = ConversionAuditTrail::new("webserver");
        trail.add_note("starting conversion");
        trail.add_note("optimization pass complete");
        assert_eq!(trail.notes().len(), 2);
        assert_eq!(trail.notes()[0].text, "starting conversion");
        assert!(trail.notes()[0].timestamp <= trail.notes()[1].timestamp);
    }

    #[test]
    fn test_migration_id_shape() {
        let trail = ConversionAuditTrail::new("webserver");
        assert!(trail.migration_id.starts_with("mig-"));
        assert_eq!(trail.migration_id.len(), "mig-".len() + 12);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_decision() -> impl Strategy<Value = ConversionDecision> {
            prop_oneof![
                Just(ConversionDecision::FullyConverted),
                Just(ConversionDecision::PartiallyConverted),
                Just(ConversionDecision::RequiresManualReview),
                Just(ConversionDecision::NotApplicable),
                Just(ConversionDecision::Error),
            ]
        }

        fn arb_complexity() -> impl Strategy<Value = ResourceComplexity> {
            prop_oneof![
                Just(ResourceComplexity::Simple),
                Just(ResourceComplexity::Moderate),
                Just(ResourceComplexity::Complex),
            ]
        }

        proptest! {
            #[test]
            fn quality_score_stays_bounded(
                outcomes in proptest::collection::vec((arb_decision(), arb_complexity()), 0..32)
            ) {
                let mut trail = ConversionAuditTrail::new("prop");
                for (decision, complexity) in outcomes {
                    trail.add_resource_record(record("t", "n", decision, "", complexity, 0.0));
                }
                let score = trail.quality_score();
                prop_assert!((0.0..=100.0).contains(&score));

                let summary = trail.summary();
                prop_assert!(summary.fully_converted + summary.partially_converted
                    + summary.requires_manual_review + summary.errors
                    <= summary.total_resources);
                prop_assert!((0.0..=100.0).contains(&summary.conversion_rate_percent));
            }
        }
    }
}

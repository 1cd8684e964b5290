//! Audit export — pure formatting of a trail and its derived summary.

use super::{AuditNote, AuditSummary, ConversionAuditTrail, ResourceConversionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The exported audit document. Field names and the quality-score formula
/// are a stable external contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditDocument {
    pub migration_id: String,
    pub cookbook_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
    pub resource_records: Vec<ResourceConversionRecord>,
    pub notes: Vec<AuditNote>,
    pub summary: AuditSummary,
}

/// Build the audit document. An unfinalized trail exports with no end time
/// and zero duration.
pub fn to_document(trail: &ConversionAuditTrail) -> AuditDocument {
    let duration_seconds = trail
        .ended_at()
        .map(|end| (end - trail.started_at()).num_milliseconds() as f64 / 1000.0)
        .unwrap_or(0.0);

    AuditDocument {
        migration_id: trail.migration_id.clone(),
        cookbook_name: trail.cookbook_name.clone(),
        start_time: trail.started_at(),
        end_time: trail.ended_at(),
        duration_seconds,
        resource_records: trail.records().to_vec(),
        notes: trail.notes().to_vec(),
        summary: trail.summary(),
    }
}

/// Export the audit document as pretty JSON.
pub fn to_json(trail: &ConversionAuditTrail) -> Result<String, String> {
    serde_json::to_string_pretty(&to_document(trail))
        .map_err(|e| format!("JSON serialize error: {}", e))
}

/// Export the audit document as YAML.
pub fn to_yaml(trail: &ConversionAuditTrail) -> Result<String, String> {
    serde_yaml_ng::to_string(&to_document(trail))
        .map_err(|e| format!("YAML serialize error: {}", e))
}

/// Render a human-readable summary of the trail.
pub fn render_text(trail: &ConversionAuditTrail) -> String {
    let summary = trail.summary();
    let mut out = String::new();

    out.push_str(&format!(
        "Conversion audit — {} ({})\n",
        trail.cookbook_name, trail.migration_id
    ));
    out.push_str(&format!(
        "  resources: {}  fully: {}  partial: {}  manual: {}  errors: {}\n",
        summary.total_resources,
        summary.fully_converted,
        summary.partially_converted,
        summary.requires_manual_review,
        summary.errors
    ));
    out.push_str(&format!(
        "  conversion rate: {:.2}%  quality score: {:.2}\n",
        summary.conversion_rate_percent, summary.quality_score
    ));

    for record in trail.records() {
        out.push_str(&format!(
            "  {:<22} {}[{}] — {}\n",
            format!("{:?}", record.decision),
            record.resource_type,
            record.resource_name,
            record.reason
        ));
        for warning in &record.warnings {
            out.push_str(&format!("      warning: {}\n", warning));
        }
    }

    for note in trail.notes() {
        out.push_str(&format!("  note: {}\n", note.text));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{record, ConversionDecision, ResourceComplexity};

    fn sample_trail() -> ConversionAuditTrail {
        let mut trail = ConversionAuditTrail::new("webserver");
        trail.add_resource_record(record(
            "package",
            "curl",
            ConversionDecision::FullyConverted,
            "matched rule 'builtin_package'",
            ResourceComplexity::Simple,
            0.002,
        ));
        trail.add_resource_record(record(
            "mysql_database",
            "app",
            ConversionDecision::RequiresManualReview,
            "no conversion rule matched",
            ResourceComplexity::Complex,
            0.001,
        ));
        trail.add_note("conversion complete");
        trail.finalize();
        trail
    }

    #[test]
    fn test_document_fields() {
        let trail = sample_trail();
        let doc = to_document(&trail);
        assert_eq!(doc.cookbook_name, "webserver");
        assert_eq!(doc.resource_records.len(), 2);
        assert_eq!(doc.notes.len(), 1);
        assert!(doc.end_time.is_some());
        assert!(doc.duration_seconds >= 0.0);
        assert_eq!(doc.summary.total_resources, 2);
    }

    #[test]
    fn test_unfinalized_trail_exports_zero_duration() {
        let trail = ConversionAuditTrail::new("webserver");
        let doc = to_document(&trail);
        assert!(doc.end_time.is_none());
        assert_eq!(doc.duration_seconds, 0.0);
    }

    #[test]
    fn test_json_contract_field_names() {
        let trail = sample_trail();
        let json = to_json(&trail).unwrap();
        for field in [
            "migration_id",
            "cookbook_name",
            "start_time",
            "end_time",
            "duration_seconds",
            "resource_records",
            "notes",
            "summary",
            "total_resources",
            "fully_converted",
            "partially_converted",
            "requires_manual_review",
            "errors",
            "conversion_rate_percent",
            "quality_score",
        ] {
            assert!(json.contains(field), "missing contract field {}", field);
        }
    }

    #[test]
    fn test_json_decision_encoding() {
        let trail = sample_trail();
        let json = to_json(&trail).unwrap();
        assert!(json.contains("\"fully_converted\""));
        assert!(json.contains("\"requires_manual_review\""));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let trail = sample_trail();
        let yaml = to_yaml(&trail).unwrap();
        let doc: AuditDocument = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(doc.migration_id, trail.migration_id);
        assert_eq!(doc.summary.quality_score, trail.quality_score());
    }

    #[test]
    fn test_render_text_mentions_every_record() {
        let trail = sample_trail();
        let text = render_text(&trail);
        assert!(text.contains("webserver"));
        assert!(text.contains("package[curl]"));
        assert!(text.contains("mysql_database[app]"));
        assert!(text.contains("quality score"));
        assert!(text.contains("note: conversion complete"));
    }
}

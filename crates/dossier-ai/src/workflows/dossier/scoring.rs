//! Confidence and completeness scoring.
//!
//! Extraction confidence weighs field coverage against format validity and is
//! capped by the source kind's ceiling. Packet completeness is the
//! importance-weighted average of per-document extraction confidence, so an
//! unreadable scan drags the score even though the upload is present.

use serde::Serialize;

use super::blueprint::{self, weights};
use super::domain::{
    ApplicationStatus, ArtifactStatus, ExtractedRecord, GeneratedArtifact, SourceDocument,
    SourceDocumentKind,
};
use super::registry;
use super::resolution::ResolvedFieldSet;

/// Score an extraction result for one document kind, 0-100.
///
/// Coverage counts expected fields that arrived non-empty; validity counts how
/// many of those pass their format check. Nothing extracted scores zero.
pub fn extraction_confidence(
    kind: SourceDocumentKind,
    fields: &std::collections::BTreeMap<String, String>,
) -> u8 {
    let spec = blueprint::source_kind_spec(kind);
    if spec.expected_fields.is_empty() {
        return 0;
    }

    let mut covered = 0usize;
    let mut valid = 0usize;
    for expected in spec.expected_fields {
        let value = fields.iter().find_map(|(key, value)| {
            if registry::keys_match(key, expected) && !value.trim().is_empty() {
                Some(value.as_str())
            } else {
                None
            }
        });
        let Some(value) = value else { continue };

        covered += 1;
        let format = blueprint::field_spec(expected)
            .map(|field| field.format)
            .unwrap_or(blueprint::FieldFormat::FreeText);
        if blueprint::validate_format(format, value) {
            valid += 1;
        }
    }

    if covered == 0 {
        return 0;
    }

    let coverage = covered as f32 / spec.expected_fields.len() as f32;
    let validity = valid as f32 / covered as f32;
    let raw = (coverage * weights::FIELD_COVERAGE + validity * weights::FORMAT_VALIDITY) * 100.0;

    (raw.round() as u8).min(spec.confidence_ceiling)
}

/// Importance-weighted average of per-document extraction confidence, 0-100.
///
/// Each non-generic kind contributes its best-scoring document, scaled by the
/// kind's importance weight. A document's confidence is its latest extraction
/// record; a document that was never analyzed (or never produced a readable
/// extraction) contributes zero, as does a missing kind.
pub fn document_completeness(documents: &[SourceDocument], records: &[ExtractedRecord]) -> u8 {
    let specs = blueprint::source_kind_specs();
    let total: u32 = specs
        .iter()
        .filter(|spec| spec.kind != SourceDocumentKind::Generic)
        .map(|spec| u32::from(spec.importance))
        .sum();
    if total == 0 {
        return 0;
    }

    let mut weighted = 0.0f32;
    for spec in specs {
        if spec.kind == SourceDocumentKind::Generic {
            continue;
        }
        let confidence = documents
            .iter()
            .filter(|document| document.kind == spec.kind)
            .map(|document| latest_confidence(document, records))
            .max()
            .unwrap_or(0);
        weighted += f32::from(spec.importance) * f32::from(confidence) / 100.0;
    }

    ((weighted / total as f32) * 100.0).round().min(100.0) as u8
}

fn latest_confidence(document: &SourceDocument, records: &[ExtractedRecord]) -> u8 {
    records
        .iter()
        .filter(|record| record.source_document_id == document.id)
        .max_by_key(|record| record.created_at)
        .map(|record| record.confidence)
        .unwrap_or(0)
}

/// Share of the field catalog that resolved to a usable value, 0-100.
pub fn field_completeness(fields: &ResolvedFieldSet) -> u8 {
    if fields.is_empty() {
        return 0;
    }

    let resolved = fields.values().filter(|value| !value.is_missing()).count();
    ((resolved as f32 / fields.len() as f32) * 100.0).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessLevel {
    Ready,
    NeedsInput,
    Blocked,
}

impl ReadinessLevel {
    pub const fn label(self) -> &'static str {
        match self {
            ReadinessLevel::Ready => "ready",
            ReadinessLevel::NeedsInput => "needs input",
            ReadinessLevel::Blocked => "blocked",
        }
    }
}

/// Aggregate view served by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PacketInsights {
    pub status: ApplicationStatus,
    pub document_completeness: u8,
    pub field_completeness: u8,
    pub readiness: ReadinessLevel,
    pub missing_document_kinds: Vec<&'static str>,
    pub unresolved_fields: Vec<&'static str>,
    pub observations: Vec<String>,
}

pub(crate) fn generate_insights(
    status: ApplicationStatus,
    documents: &[SourceDocument],
    records: &[ExtractedRecord],
    fields: &ResolvedFieldSet,
    artifacts: &[GeneratedArtifact],
) -> PacketInsights {
    let doc_score = document_completeness(documents, records);
    let field_score = field_completeness(fields);

    let missing_document_kinds: Vec<&'static str> = blueprint::source_kind_specs()
        .iter()
        .filter(|spec| spec.kind != SourceDocumentKind::Generic)
        .filter(|spec| !documents.iter().any(|document| document.kind == spec.kind))
        .map(|spec| spec.kind.label())
        .collect();

    let unresolved_fields: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.is_missing())
        .map(|(key, _)| *key)
        .collect();

    let failed_artifacts = artifacts
        .iter()
        .filter(|artifact| artifact.status == ArtifactStatus::Failed)
        .count();

    let readiness = if status == ApplicationStatus::Failed || failed_artifacts > 0 {
        ReadinessLevel::Blocked
    } else if doc_score >= 70 && field_score >= 80 {
        ReadinessLevel::Ready
    } else {
        ReadinessLevel::NeedsInput
    };

    let mut observations = Vec::new();
    if !missing_document_kinds.is_empty() {
        observations.push(format!(
            "{} supporting document kind(s) not yet uploaded",
            missing_document_kinds.len()
        ));
    }
    if !unresolved_fields.is_empty() {
        observations.push(format!(
            "{} field(s) unresolved; generation will auto-fill them",
            unresolved_fields.len()
        ));
    }
    if failed_artifacts > 0 {
        observations.push(format!(
            "{} artifact(s) failed in the last generation run",
            failed_artifacts
        ));
    }
    if observations.is_empty() {
        observations.push("Packet is on track; no gaps detected".to_string());
    }

    PacketInsights {
        status,
        document_completeness: doc_score,
        field_completeness: field_score,
        readiness,
        missing_document_kinds,
        unresolved_fields,
        observations,
    }
}

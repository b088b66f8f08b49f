//! Layered data resolution: user answers beat extracted values, extracted
//! values beat nothing, and the synonym registry reconciles the key spellings
//! different producers invented over time.
//!
//! Resolution is a pure function over a snapshot loaded once per run, so two
//! calls without intervening writes always agree.

use std::collections::BTreeMap;

use serde::Serialize;

use super::blueprint::{self, FieldShape};
use super::domain::{
    Answer, AnswerValue, ApplicationId, ExtractedRecord, ExtractionOutcome,
};
use super::registry;
use super::repository::{PacketRepository, RepositoryError};

/// Final value for one canonical key after layering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    Text(String),
    Entries(Vec<BTreeMap<String, String>>),
    Missing,
}

impl ResolvedValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, ResolvedValue::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResolvedValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_entries(&self) -> Option<&[BTreeMap<String, String>]> {
        match self {
            ResolvedValue::Entries(entries) => Some(entries),
            _ => None,
        }
    }
}

/// Ephemeral per-run field set; never persisted.
pub type ResolvedFieldSet = BTreeMap<&'static str, ResolvedValue>;

/// Persisted state loaded once so resolution stays pure and cheap.
#[derive(Debug, Clone, Default)]
pub struct ResolutionSnapshot {
    answers: Vec<Answer>,
    records: Vec<ExtractedRecord>,
}

impl ResolutionSnapshot {
    pub fn new(answers: Vec<Answer>, records: Vec<ExtractedRecord>) -> Self {
        Self { answers, records }
    }

    pub fn load<R: PacketRepository>(
        repository: &R,
        application_id: &ApplicationId,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            answers: repository.answers_for(application_id)?,
            records: repository.records_for(application_id)?,
        })
    }

    /// Latest answer whose key refers to `canonical`, by recorded timestamp.
    fn latest_answer(&self, canonical: &str) -> Option<&Answer> {
        self.answers
            .iter()
            .filter(|answer| registry::keys_match(&answer.key, canonical))
            .max_by_key(|answer| answer.recorded_at)
    }

    /// Highest-confidence extracted value for `canonical`, ties broken by the
    /// most recent record.
    fn best_extracted(&self, canonical: &str) -> Option<String> {
        self.records
            .iter()
            .filter(|record| record.outcome == ExtractionOutcome::Extracted)
            .flat_map(|record| {
                record.fields.iter().filter_map(move |(key, value)| {
                    if registry::keys_match(key, canonical) && !value.trim().is_empty() {
                        Some((record.confidence, record.created_at, value))
                    } else {
                        None
                    }
                })
            })
            .max_by_key(|(confidence, created_at, _)| (*confidence, *created_at))
            .map(|(_, _, value)| value.clone())
    }
}

/// Resolve one canonical (or legacy) key against the snapshot.
///
/// Scalars: latest answer, then highest-confidence extracted value, then
/// missing. List keys resolve from the answer layer only — extraction results
/// are never merged element-by-element — and absence yields an empty list.
pub fn resolve(snapshot: &ResolutionSnapshot, key: &str) -> ResolvedValue {
    let canonical = registry::canonical_key_for(key);
    let spec = canonical.and_then(blueprint::field_spec);

    let shape = spec.map(|spec| spec.shape).unwrap_or(FieldShape::Scalar);
    let lookup_key = canonical.unwrap_or(key);

    match shape {
        FieldShape::List => match snapshot.latest_answer(lookup_key) {
            Some(answer) => entries_from_answer(&answer.value),
            None => ResolvedValue::Entries(Vec::new()),
        },
        FieldShape::Scalar => {
            if let Some(answer) = snapshot.latest_answer(lookup_key) {
                if let AnswerValue::Text(text) = &answer.value {
                    if !text.trim().is_empty() {
                        return ResolvedValue::Text(text.clone());
                    }
                }
            }

            match snapshot.best_extracted(lookup_key) {
                Some(value) => ResolvedValue::Text(value),
                None => ResolvedValue::Missing,
            }
        }
    }
}

/// Resolve every cataloged field into an ephemeral field set.
pub fn resolve_all(snapshot: &ResolutionSnapshot) -> ResolvedFieldSet {
    blueprint::field_catalog()
        .iter()
        .map(|spec| (spec.key, resolve(snapshot, spec.key)))
        .collect()
}

fn entries_from_answer(value: &AnswerValue) -> ResolvedValue {
    match value {
        AnswerValue::Entries(entries) => ResolvedValue::Entries(entries.clone()),
        // Legacy questionnaire rows serialized repeatable sections as JSON text.
        AnswerValue::Text(text) => {
            match serde_json::from_str::<Vec<BTreeMap<String, String>>>(text) {
                Ok(entries) => ResolvedValue::Entries(entries),
                Err(_) => ResolvedValue::Entries(Vec::new()),
            }
        }
    }
}

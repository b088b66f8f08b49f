//! Generative field extraction from uploaded document text.
//!
//! Extraction never fails the caller: every attempt produces an
//! [`ExtractedRecord`] whose outcome says how it went. Short inputs are
//! rejected before the model is called, transient model faults are retried
//! with bounded backoff, and unparseable model output is re-asked once before
//! being recorded as a failure.

mod prompt;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::workflows::dossier::blueprint;
use crate::workflows::dossier::domain::{
    ExtractedRecord, ExtractionOutcome, SourceDocument,
};
use crate::workflows::dossier::{registry, scoring};
use crate::workflows::genai::{GenerativeClient, GenerativeRequest};

/// Inputs shorter than this carry too little signal to be worth a model call.
const MIN_INPUT_LENGTH: usize = 20;
/// Additional attempts after the first, for transient faults and bad JSON.
const MAX_EXTRACTION_RETRIES: usize = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_record_id() -> String {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("rec-{id:06}")
}

/// Routes document text through the generative model and normalizes the
/// response into an append-only extraction record.
pub struct ExtractionRouter<G> {
    client: Arc<G>,
    extractor: String,
}

impl<G> ExtractionRouter<G>
where
    G: GenerativeClient,
{
    pub fn new(client: Arc<G>, model: &str) -> Self {
        Self {
            client,
            extractor: format!("genai:{model}"),
        }
    }

    /// Extract structured fields from one document. Always returns a record;
    /// the outcome distinguishes success from the two failure shapes.
    pub async fn extract(&self, document: &SourceDocument) -> ExtractedRecord {
        let mut record = ExtractedRecord {
            id: next_record_id(),
            source_document_id: document.id.clone(),
            application_id: document.application_id.clone(),
            kind: document.kind,
            fields: BTreeMap::new(),
            confidence: 0,
            extractor: self.extractor.clone(),
            outcome: ExtractionOutcome::Failed,
            failure_reason: None,
            created_at: Utc::now(),
        };

        if document.raw_text.trim().len() < MIN_INPUT_LENGTH {
            record.outcome = ExtractionOutcome::InsufficientInput;
            record.failure_reason = Some(format!(
                "document text shorter than {MIN_INPUT_LENGTH} characters"
            ));
            return record;
        }

        let spec = blueprint::source_kind_spec(document.kind);
        let request = GenerativeRequest {
            prompt: prompt::extraction_prompt(spec, &document.raw_text),
            system: prompt::EXTRACTION_SYSTEM.to_string(),
            // Extraction wants the most literal reading available.
            temperature: 0.0,
        };

        match self.call_with_retries(request, document).await {
            Ok(fields) => {
                record.confidence = scoring::extraction_confidence(document.kind, &fields);
                record.fields = fields;
                record.outcome = ExtractionOutcome::Extracted;
            }
            Err(reason) => {
                record.outcome = ExtractionOutcome::Failed;
                record.failure_reason = Some(reason);
            }
        }

        record
    }

    async fn call_with_retries(
        &self,
        request: GenerativeRequest,
        document: &SourceDocument,
    ) -> Result<BTreeMap<String, String>, String> {
        let mut last_failure = String::new();

        for attempt in 0..=MAX_EXTRACTION_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(RETRY_BACKOFF * attempt as u32).await;
            }

            match self.client.generate(request.clone()).await {
                Ok(raw) => match parse_field_object(&raw) {
                    Ok(fields) if !fields.is_empty() => return Ok(fields),
                    Ok(_) => {
                        last_failure = "model found none of the expected fields".to_string();
                    }
                    Err(reason) => {
                        tracing::warn!(
                            document_id = %document.id,
                            attempt,
                            reason,
                            "extraction response unparseable"
                        );
                        last_failure = reason;
                    }
                },
                Err(error) if error.is_retryable() => {
                    tracing::warn!(
                        document_id = %document.id,
                        attempt,
                        %error,
                        "generative call failed, retrying"
                    );
                    last_failure = error.to_string();
                }
                Err(error) => return Err(error.to_string()),
            }
        }

        Err(last_failure)
    }
}

/// Parse the model's reply into a flat string map, tolerating a fenced code
/// block around the JSON and numeric values inside it. Unknown keys survive;
/// the synonym registry reconciles them later.
fn parse_field_object(raw: &str) -> Result<BTreeMap<String, String>, String> {
    let body = strip_code_fences(raw);
    let parsed: serde_json::Value =
        serde_json::from_str(body).map_err(|err| format!("invalid JSON: {err}"))?;

    let object = parsed
        .as_object()
        .ok_or_else(|| "expected a JSON object".to_string())?;

    let mut fields = BTreeMap::new();
    for (key, value) in object {
        let text = match value {
            serde_json::Value::String(text) => text.trim().to_string(),
            serde_json::Value::Number(number) => number.to_string(),
            serde_json::Value::Bool(flag) => flag.to_string(),
            serde_json::Value::Null => continue,
            _ => continue,
        };
        if text.is_empty() || text.eq_ignore_ascii_case("null") {
            continue;
        }
        fields.insert(registry::normalize_key(key), text);
    }

    Ok(fields)
}

/// Models often wrap JSON in ``` fences despite instructions; take the first
/// fenced block when present, the raw text otherwise.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_tag = after_open
        .split_once('\n')
        .map(|(_, rest)| rest)
        .unwrap_or(after_open);
    after_tag
        .rsplit_once("```")
        .map(|(body, _)| body.trim())
        .unwrap_or_else(|| after_tag.trim())
}

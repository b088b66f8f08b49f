//! Artifact rendering: structured kinds come from deterministic templates,
//! narrative kinds come from the generative model with the resolved fields
//! inlined into the prompt.

use std::fmt::Write as _;

use async_trait::async_trait;

use super::blueprint::{self, ArtifactSpec, RenderStrategy};
use super::domain::Application;
use super::resolution::{ResolvedFieldSet, ResolvedValue};
use crate::workflows::genai::{GenerativeClient, GenerativeError, GenerativeRequest};

/// Narrative renders get one retry on transient model failures.
const MAX_RENDER_ATTEMPTS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Generative(#[from] GenerativeError),
}

/// Seam between the orchestrator and the concrete render strategies, so
/// failure handling can be exercised with a scripted renderer.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(
        &self,
        application: &Application,
        spec: &ArtifactSpec,
        fields: &ResolvedFieldSet,
    ) -> Result<Vec<u8>, RenderError>;
}

/// Production renderer delegating narrative kinds to a generative client.
pub struct PipelineRenderer<G> {
    client: G,
}

impl<G> PipelineRenderer<G> {
    pub fn new(client: G) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<G> ArtifactRenderer for PipelineRenderer<G>
where
    G: GenerativeClient,
{
    async fn render(
        &self,
        application: &Application,
        spec: &ArtifactSpec,
        fields: &ResolvedFieldSet,
    ) -> Result<Vec<u8>, RenderError> {
        match spec.strategy {
            RenderStrategy::StructuredTemplate => {
                Ok(render_structured(application, spec, fields).into_bytes())
            }
            RenderStrategy::GenerativeContent => {
                let text = self.render_narrative(application, spec, fields).await?;
                Ok(text.into_bytes())
            }
        }
    }
}

impl<G> PipelineRenderer<G>
where
    G: GenerativeClient,
{
    async fn render_narrative(
        &self,
        application: &Application,
        spec: &ArtifactSpec,
        fields: &ResolvedFieldSet,
    ) -> Result<String, RenderError> {
        let request = GenerativeRequest {
            prompt: narrative_prompt(application, spec, fields),
            system: NARRATIVE_SYSTEM.to_string(),
            temperature: 0.4,
        };

        let mut last_error = None;
        for attempt in 1..=MAX_RENDER_ATTEMPTS {
            match self.client.generate(request.clone()).await {
                Ok(text) if !text.trim().is_empty() => return Ok(text.trim().to_string()),
                Ok(_) => {
                    last_error = Some(GenerativeError::Malformed(
                        "model returned an empty draft".to_string(),
                    ));
                    break;
                }
                Err(error) if error.is_retryable() && attempt < MAX_RENDER_ATTEMPTS => {
                    tracing::warn!(
                        kind = spec.kind.label(),
                        attempt,
                        %error,
                        "narrative render attempt failed, retrying"
                    );
                    last_error = Some(error);
                }
                Err(error) => {
                    last_error = Some(error);
                    break;
                }
            }
        }

        Err(RenderError::Generative(last_error.unwrap_or(
            GenerativeError::Malformed("model produced no draft".to_string()),
        )))
    }
}

const NARRATIVE_SYSTEM: &str = "You draft formal supporting letters for visa application \
packets. Write in plain professional English, one page at most, no markdown, no \
placeholders, using only the facts provided.";

fn narrative_prompt(
    application: &Application,
    spec: &ArtifactSpec,
    fields: &ResolvedFieldSet,
) -> String {
    let mut prompt = String::new();
    writeln!(
        prompt,
        "Draft a {} for a {} visa applicant.",
        spec.title,
        application.category.label()
    )
    .expect("write prompt header");
    writeln!(prompt, "Known applicant facts:").expect("write prompt facts header");

    for key in spec.fields {
        let line = fields
            .get(key)
            .map(render_value)
            .filter(|value| !value.is_empty());
        if let Some(value) = line {
            let label = blueprint::field_spec(key).map(|f| f.label).unwrap_or(key);
            writeln!(prompt, "- {label}: {value}").expect("write prompt fact");
        }
    }

    writeln!(
        prompt,
        "Respond with the finished letter text only, addressed to the consular officer."
    )
    .expect("write prompt footer");
    prompt
}

/// Deterministic plain-text render for structured kinds.
fn render_structured(
    application: &Application,
    spec: &ArtifactSpec,
    fields: &ResolvedFieldSet,
) -> String {
    let mut body = String::new();
    writeln!(body, "{}", spec.title).expect("write title");
    writeln!(body, "{}", "=".repeat(spec.title.len())).expect("write rule");
    writeln!(body, "Application: {}", application.id.0).expect("write application line");
    writeln!(body, "Category: {}", application.category.label()).expect("write category line");
    writeln!(body).expect("write spacer");

    for key in spec.fields {
        let label = blueprint::field_spec(key).map(|f| f.label).unwrap_or(key);
        match fields.get(key) {
            Some(ResolvedValue::Entries(entries)) => {
                writeln!(body, "{label}:").expect("write section label");
                if entries.is_empty() {
                    writeln!(body, "  (none declared)").expect("write empty section");
                }
                for (index, entry) in entries.iter().enumerate() {
                    let row = entry
                        .iter()
                        .map(|(field, value)| format!("{field}={value}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    writeln!(body, "  {}. {row}", index + 1).expect("write section row");
                }
            }
            Some(ResolvedValue::Text(text)) if !text.trim().is_empty() => {
                writeln!(body, "{label}: {text}").expect("write field line");
            }
            _ => {
                writeln!(body, "{label}: -").expect("write blank field line");
            }
        }
    }

    body
}

fn render_value(value: &ResolvedValue) -> String {
    match value {
        ResolvedValue::Text(text) => text.clone(),
        ResolvedValue::Entries(entries) => entries
            .iter()
            .map(|entry| {
                entry
                    .iter()
                    .map(|(field, value)| format!("{field}={value}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect::<Vec<_>>()
            .join("; "),
        ResolvedValue::Missing => String::new(),
    }
}

//! Generation orchestrator: resolves the field set once, auto-fills the gaps,
//! then renders the target artifact kinds concurrently with per-kind failure
//! isolation. Only orchestration-level faults (storage, synthesis) fail the
//! batch; a kind that cannot render is marked failed and the rest proceed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;

use super::blueprint;
use super::domain::{
    Answer, AnswerOrigin, AnswerValue, Application, ApplicationId, ApplicationStatus,
    ArtifactKind, ArtifactOutput, ArtifactStatus, GeneratedArtifact,
};
use super::rendering::ArtifactRenderer;
use super::repository::{PacketRepository, RepositoryError};
use super::resolution::{self, ResolutionSnapshot, ResolvedFieldSet, ResolvedValue};
use super::synthesis::{self, SynthesisError};
use crate::config::PipelineConfig;

/// Progress checkpoints persisted per kind; the sequence never moves backwards.
const PROGRESS_RESOLVED: u8 = 30;
const PROGRESS_RENDERED: u8 = 80;
const PROGRESS_PERSISTED: u8 = 100;

/// Cooperative stop signal. Kinds that have not started rendering when the
/// flag flips are failed immediately; an in-flight render runs to completion
/// and stores its output.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("application {0} not found")]
    UnknownApplication(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error("generation worker panicked")]
    WorkerPanic,
}

/// Drives one generation run end to end.
pub struct GenerationOrchestrator<R, A> {
    repository: Arc<R>,
    renderer: Arc<A>,
    render_concurrency: usize,
    persist_synthesized: bool,
}

impl<R, A> GenerationOrchestrator<R, A>
where
    R: PacketRepository + 'static,
    A: ArtifactRenderer + 'static,
{
    pub fn new(repository: Arc<R>, renderer: Arc<A>, config: &PipelineConfig) -> Self {
        Self {
            repository,
            renderer,
            render_concurrency: config.render_concurrency.max(1),
            persist_synthesized: config.persist_synthesized,
        }
    }

    /// Generate the given kinds, or the full category target list when `kinds`
    /// is empty. Returns the final per-kind rows in target order.
    pub async fn run(
        &self,
        application_id: &ApplicationId,
        kinds: Vec<ArtifactKind>,
        cancel: CancellationFlag,
    ) -> Result<Vec<GeneratedArtifact>, OrchestrationError> {
        let mut application = self
            .repository
            .fetch_application(application_id)?
            .ok_or_else(|| OrchestrationError::UnknownApplication(application_id.0.clone()))?;

        let kinds = if kinds.is_empty() {
            blueprint::target_kinds(application.category)
        } else {
            kinds
        };

        self.reopen_for_generation(&mut application)?;

        let snapshot = ResolutionSnapshot::load(self.repository.as_ref(), application_id)?;
        let mut fields = resolution::resolve_all(&snapshot);
        let synthesized = synthesis::fill_unresolved(application_id, &mut fields)?;
        if self.persist_synthesized {
            self.persist_synthesized_answers(application_id, &fields, &synthesized)?;
        }

        // Every kind gets a fresh pending row before any rendering starts, so
        // status polls see the full batch immediately.
        for kind in &kinds {
            self.repository
                .upsert_artifact(GeneratedArtifact::pending(application_id.clone(), *kind))?;
        }

        let fields = Arc::new(fields);
        let application = Arc::new(application);
        let semaphore = Arc::new(Semaphore::new(self.render_concurrency));

        let mut handles = Vec::with_capacity(kinds.len());
        for kind in &kinds {
            let kind = *kind;
            let repository = Arc::clone(&self.repository);
            let renderer = Arc::clone(&self.renderer);
            let fields = Arc::clone(&fields);
            let application = Arc::clone(&application);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                render_one(repository, renderer, application, fields, kind, semaphore, cancel)
                    .await
            }));
        }

        // Await in target order so the returned rows are deterministic.
        let mut artifacts = Vec::with_capacity(handles.len());
        for handle in handles {
            let artifact = handle
                .await
                .map_err(|_| OrchestrationError::WorkerPanic)??;
            artifacts.push(artifact);
        }

        self.close_run(application_id, &artifacts)?;
        Ok(artifacts)
    }

    /// Generating reopens a completed packet; otherwise the ladder advances
    /// normally and never regresses.
    fn reopen_for_generation(&self, application: &mut Application) -> Result<(), RepositoryError> {
        application.status = if application.status == ApplicationStatus::Completed {
            ApplicationStatus::Generating
        } else {
            application.status.advanced_to(ApplicationStatus::Generating)
        };
        application.updated_at = Utc::now();
        self.repository.update_application(application.clone())
    }

    fn persist_synthesized_answers(
        &self,
        application_id: &ApplicationId,
        fields: &ResolvedFieldSet,
        synthesized: &[&'static str],
    ) -> Result<(), RepositoryError> {
        for key in synthesized {
            let Some(value) = fields.get(key) else { continue };
            let value = match value {
                ResolvedValue::Text(text) => AnswerValue::Text(text.clone()),
                ResolvedValue::Entries(entries) => AnswerValue::Entries(entries.clone()),
                ResolvedValue::Missing => continue,
            };
            self.repository.upsert_answer(Answer {
                application_id: application_id.clone(),
                key: (*key).to_string(),
                origin: AnswerOrigin::Synthesized,
                value,
                recorded_at: Utc::now(),
            })?;
        }
        Ok(())
    }

    /// The packet completes once at least one artifact rendered; an all-failed
    /// run leaves the application generating so a retry can finish the job.
    fn close_run(
        &self,
        application_id: &ApplicationId,
        artifacts: &[GeneratedArtifact],
    ) -> Result<(), OrchestrationError> {
        let any_completed = artifacts
            .iter()
            .any(|artifact| artifact.status == ArtifactStatus::Completed);
        if !any_completed {
            return Ok(());
        }

        let mut application = self
            .repository
            .fetch_application(application_id)?
            .ok_or_else(|| OrchestrationError::UnknownApplication(application_id.0.clone()))?;
        application.status = application.status.advanced_to(ApplicationStatus::Completed);
        application.updated_at = Utc::now();
        self.repository.update_application(application)?;
        Ok(())
    }
}

async fn render_one<R, A>(
    repository: Arc<R>,
    renderer: Arc<A>,
    application: Arc<Application>,
    fields: Arc<ResolvedFieldSet>,
    kind: ArtifactKind,
    semaphore: Arc<Semaphore>,
    cancel: CancellationFlag,
) -> Result<GeneratedArtifact, OrchestrationError>
where
    R: PacketRepository,
    A: ArtifactRenderer,
{
    let permit = semaphore
        .acquire_owned()
        .await
        .map_err(|_| OrchestrationError::WorkerPanic)?;

    let mut artifact = GeneratedArtifact::pending(application.id.clone(), kind);
    if cancel.is_cancelled() {
        return fail_artifact(
            repository.as_ref(),
            artifact,
            "cancelled before rendering started",
        );
    }

    artifact.status = ArtifactStatus::Generating;
    advance_progress(repository.as_ref(), &mut artifact, PROGRESS_RESOLVED)?;

    let spec = blueprint::artifact_spec(kind);
    let rendered = renderer.render(&application, spec, &fields).await;
    drop(permit);

    let bytes = match rendered {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(
                application_id = %application.id.0,
                kind = kind.label(),
                %error,
                "artifact render failed"
            );
            return fail_artifact(repository.as_ref(), artifact, &error.to_string());
        }
    };

    advance_progress(repository.as_ref(), &mut artifact, PROGRESS_RENDERED)?;

    let handle = format!("{}/{}.txt", application.id.0, kind.label());
    let byte_len = bytes.len();
    repository.store_output(&handle, bytes)?;

    artifact.status = ArtifactStatus::Completed;
    artifact.output = Some(ArtifactOutput { handle, byte_len });
    artifact.failure_reason = None;
    advance_progress(repository.as_ref(), &mut artifact, PROGRESS_PERSISTED)?;

    tracing::info!(
        application_id = %application.id.0,
        kind = kind.label(),
        byte_len,
        "artifact rendered"
    );
    Ok(artifact)
}

/// Persist a progress checkpoint without ever regressing a higher value.
fn advance_progress<R: PacketRepository>(
    repository: &R,
    artifact: &mut GeneratedArtifact,
    to: u8,
) -> Result<(), RepositoryError> {
    if to > artifact.progress {
        artifact.progress = to;
    }
    artifact.updated_at = Utc::now();
    repository.upsert_artifact(artifact.clone())
}

fn fail_artifact<R: PacketRepository>(
    repository: &R,
    mut artifact: GeneratedArtifact,
    reason: &str,
) -> Result<GeneratedArtifact, OrchestrationError> {
    artifact.status = ArtifactStatus::Failed;
    artifact.failure_reason = Some(reason.to_string());
    artifact.updated_at = Utc::now();
    repository.upsert_artifact(artifact.clone())?;
    Ok(artifact)
}

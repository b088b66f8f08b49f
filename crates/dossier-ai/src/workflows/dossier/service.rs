//! Service composing the repository, extraction router, and generation
//! orchestrator behind one API surface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::domain::{
    Answer, AnswerOrigin, AnswerValue, ApplicantCategory, Application, ApplicationId,
    ApplicationStatus, ArtifactKind, ExtractedRecord, GeneratedArtifact, SourceDocument,
    SourceDocumentKind,
};
use super::orchestrator::{
    CancellationFlag, GenerationOrchestrator, OrchestrationError,
};
use super::rendering::{ArtifactRenderer, PipelineRenderer};
use super::repository::{PacketRepository, RepositoryError};
use super::resolution::{self, ResolutionSnapshot, ResolvedFieldSet};
use super::scoring::{self, PacketInsights};
use crate::config::PipelineConfig;
use crate::workflows::extraction::ExtractionRouter;
use crate::workflows::genai::GenerativeClient;

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_document_id() -> String {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("doc-{id:06}")
}

/// Error raised by the packet service.
#[derive(Debug, thiserror::Error)]
pub enum PacketServiceError {
    #[error("application {0} not found")]
    ApplicationNotFound(String),
    #[error("no {kind} artifact generated yet for application {application_id}")]
    ArtifactNotFound {
        application_id: String,
        kind: &'static str,
    },
    #[error("document text must not be empty")]
    EmptyDocument,
    #[error("answer key must not be empty")]
    EmptyAnswerKey,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),
    #[error("extraction worker panicked")]
    WorkerPanic,
}

/// Front door for the document intelligence pipeline.
pub struct PacketService<R, G, A> {
    repository: Arc<R>,
    extraction: Arc<ExtractionRouter<G>>,
    orchestrator: GenerationOrchestrator<R, A>,
    extraction_concurrency: usize,
    active_runs: Mutex<HashMap<String, CancellationFlag>>,
}

impl<R, G> PacketService<R, G, PipelineRenderer<Arc<G>>>
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
{
    /// Production wiring: the generative client is shared between extraction
    /// and narrative rendering.
    pub fn new(repository: Arc<R>, client: Arc<G>, model: &str, config: &PipelineConfig) -> Self {
        let renderer = Arc::new(PipelineRenderer::new(Arc::clone(&client)));
        Self::with_renderer(repository, client, renderer, model, config)
    }
}

impl<R, G, A> PacketService<R, G, A>
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    pub fn with_renderer(
        repository: Arc<R>,
        client: Arc<G>,
        renderer: Arc<A>,
        model: &str,
        config: &PipelineConfig,
    ) -> Self {
        let extraction = Arc::new(ExtractionRouter::new(client, model));
        let orchestrator =
            GenerationOrchestrator::new(Arc::clone(&repository), renderer, config);
        Self {
            repository,
            extraction,
            orchestrator,
            extraction_concurrency: config.render_concurrency.max(1),
            active_runs: Mutex::new(HashMap::new()),
        }
    }

    /// Open a new draft packet for an applicant category.
    pub fn create_application(
        &self,
        category: ApplicantCategory,
    ) -> Result<Application, PacketServiceError> {
        let now = Utc::now();
        let application = Application {
            id: next_application_id(),
            category,
            status: ApplicationStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        let stored = self.repository.insert_application(application)?;
        tracing::info!(
            application_id = %stored.id.0,
            category = stored.category.label(),
            "application created"
        );
        Ok(stored)
    }

    pub fn application(&self, id: &ApplicationId) -> Result<Application, PacketServiceError> {
        self.repository
            .fetch_application(id)?
            .ok_or_else(|| PacketServiceError::ApplicationNotFound(id.0.clone()))
    }

    /// Attach one uploaded document's raw text to the packet.
    pub fn upload_document(
        &self,
        id: &ApplicationId,
        kind: SourceDocumentKind,
        raw_text: String,
    ) -> Result<SourceDocument, PacketServiceError> {
        if raw_text.trim().is_empty() {
            return Err(PacketServiceError::EmptyDocument);
        }
        let mut application = self.application(id)?;

        let document = SourceDocument {
            id: next_document_id(),
            application_id: id.clone(),
            kind,
            raw_text,
            uploaded_at: Utc::now(),
        };
        let stored = self.repository.insert_document(document)?;

        application.status = application
            .status
            .advanced_to(ApplicationStatus::DocumentsUploaded);
        application.updated_at = Utc::now();
        self.repository.update_application(application)?;

        Ok(stored)
    }

    /// Run extraction over every uploaded document, appending one record per
    /// document in upload order. A document that cannot be extracted produces
    /// a failure record; it never aborts the rest.
    pub async fn analyze(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<ExtractedRecord>, PacketServiceError> {
        let mut application = self.application(id)?;
        let documents = self.repository.documents_for(id)?;

        application.status = application.status.advanced_to(ApplicationStatus::Analyzing);
        application.updated_at = Utc::now();
        self.repository.update_application(application)?;

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.extraction_concurrency));
        let mut handles = Vec::with_capacity(documents.len());
        for document in documents {
            let extraction = Arc::clone(&self.extraction);
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| PacketServiceError::WorkerPanic)?;
                Ok::<_, PacketServiceError>(extraction.extract(&document).await)
            }));
        }

        // Await in upload order so records append deterministically.
        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            let record = handle.await.map_err(|_| PacketServiceError::WorkerPanic)??;
            self.repository.append_record(record.clone())?;
            records.push(record);
        }

        Ok(records)
    }

    /// Record a questionnaire answer; the latest write per key wins.
    pub fn record_answer(
        &self,
        id: &ApplicationId,
        key: &str,
        value: AnswerValue,
    ) -> Result<Answer, PacketServiceError> {
        if key.trim().is_empty() {
            return Err(PacketServiceError::EmptyAnswerKey);
        }
        self.application(id)?;

        let answer = Answer {
            application_id: id.clone(),
            key: key.trim().to_string(),
            origin: AnswerOrigin::Questionnaire,
            value,
            recorded_at: Utc::now(),
        };
        self.repository.upsert_answer(answer.clone())?;
        Ok(answer)
    }

    /// Current resolved view of the field catalog, without synthesis.
    pub fn resolved_fields(
        &self,
        id: &ApplicationId,
    ) -> Result<ResolvedFieldSet, PacketServiceError> {
        self.application(id)?;
        let snapshot = ResolutionSnapshot::load(self.repository.as_ref(), id)?;
        Ok(resolution::resolve_all(&snapshot))
    }

    /// Generate the requested artifact kinds, or the category's full target
    /// list when `kinds` is empty.
    pub async fn generate(
        &self,
        id: &ApplicationId,
        kinds: Vec<ArtifactKind>,
    ) -> Result<Vec<GeneratedArtifact>, PacketServiceError> {
        let flag = CancellationFlag::new();
        {
            let mut active = self.active_runs.lock().expect("active runs mutex poisoned");
            active.insert(id.0.clone(), flag.clone());
        }

        let result = self.orchestrator.run(id, kinds, flag).await;

        {
            let mut active = self.active_runs.lock().expect("active runs mutex poisoned");
            active.remove(&id.0);
        }

        match result {
            Ok(artifacts) => Ok(artifacts),
            Err(error) => {
                // A batch-wide fault leaves the packet unusable without
                // intervention; park it in the terminal state.
                if let Ok(Some(mut application)) = self.repository.fetch_application(id) {
                    application.status = ApplicationStatus::Failed;
                    application.updated_at = Utc::now();
                    let _ = self.repository.update_application(application);
                }
                Err(error.into())
            }
        }
    }

    /// Request cooperative cancellation of a running generation. Returns
    /// whether a run was active to receive the signal.
    pub fn cancel_generation(&self, id: &ApplicationId) -> bool {
        let active = self.active_runs.lock().expect("active runs mutex poisoned");
        match active.get(&id.0) {
            Some(flag) => {
                flag.cancel();
                true
            }
            None => false,
        }
    }

    pub fn artifacts(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<GeneratedArtifact>, PacketServiceError> {
        self.application(id)?;
        Ok(self.repository.artifacts_for(id)?)
    }

    pub fn artifact(
        &self,
        id: &ApplicationId,
        kind: ArtifactKind,
    ) -> Result<GeneratedArtifact, PacketServiceError> {
        self.application(id)?;
        self.repository
            .fetch_artifact(id, kind)?
            .ok_or_else(|| PacketServiceError::ArtifactNotFound {
                application_id: id.0.clone(),
                kind: kind.label(),
            })
    }

    /// Aggregate readiness view for the status endpoint.
    pub fn insights(&self, id: &ApplicationId) -> Result<PacketInsights, PacketServiceError> {
        let application = self.application(id)?;
        let documents = self.repository.documents_for(id)?;
        let records = self.repository.records_for(id)?;
        let fields = self.resolved_fields(id)?;
        let artifacts = self.repository.artifacts_for(id)?;
        Ok(scoring::generate_insights(
            application.status,
            &documents,
            &records,
            &fields,
            &artifacts,
        ))
    }
}

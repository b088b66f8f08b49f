use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::PipelineConfig;
use crate::workflows::dossier::blueprint::ArtifactSpec;
use crate::workflows::dossier::domain::{
    Answer, AnswerOrigin, AnswerValue, Application, ApplicationId, ArtifactKind, ExtractedRecord,
    ExtractionOutcome, GeneratedArtifact, SourceDocument, SourceDocumentKind,
};
use crate::workflows::dossier::orchestrator::CancellationFlag;
use crate::workflows::dossier::rendering::{ArtifactRenderer, PipelineRenderer, RenderError};
use crate::workflows::dossier::repository::{PacketRepository, RepositoryError};
use crate::workflows::dossier::resolution::ResolvedFieldSet;
use crate::workflows::dossier::service::PacketService;
use crate::workflows::genai::{GenerativeError, ScriptedGenerativeClient};

pub(super) fn ts(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_750_000_000 + seconds, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn answer(
    application_id: &ApplicationId,
    key: &str,
    value: AnswerValue,
    at: DateTime<Utc>,
) -> Answer {
    Answer {
        application_id: application_id.clone(),
        key: key.to_string(),
        origin: AnswerOrigin::Questionnaire,
        value,
        recorded_at: at,
    }
}

pub(super) fn extracted_record(
    application_id: &ApplicationId,
    document_id: &str,
    kind: SourceDocumentKind,
    fields: &[(&str, &str)],
    confidence: u8,
    at: DateTime<Utc>,
) -> ExtractedRecord {
    ExtractedRecord {
        id: format!("{document_id}-record"),
        source_document_id: document_id.to_string(),
        application_id: application_id.clone(),
        kind,
        fields: fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        confidence,
        extractor: "genai:test".to_string(),
        outcome: ExtractionOutcome::Extracted,
        failure_reason: None,
        created_at: at,
    }
}

pub(super) fn source_document(
    application_id: &ApplicationId,
    id: &str,
    kind: SourceDocumentKind,
    text: &str,
) -> SourceDocument {
    SourceDocument {
        id: id.to_string(),
        application_id: application_id.clone(),
        kind,
        raw_text: text.to_string(),
        uploaded_at: ts(0),
    }
}

/// In-memory repository fake; every artifact upsert is also logged so tests
/// can assert on the persisted progress sequence.
#[derive(Default)]
pub(super) struct MemoryPacketRepository {
    applications: Mutex<HashMap<String, Application>>,
    documents: Mutex<Vec<SourceDocument>>,
    records: Mutex<Vec<ExtractedRecord>>,
    answers: Mutex<HashMap<(String, String), Answer>>,
    artifacts: Mutex<HashMap<(String, ArtifactKind), GeneratedArtifact>>,
    outputs: Mutex<HashMap<String, Vec<u8>>>,
    artifact_events: Mutex<Vec<GeneratedArtifact>>,
}

impl MemoryPacketRepository {
    pub(super) fn output(&self, handle: &str) -> Option<Vec<u8>> {
        self.outputs
            .lock()
            .expect("outputs mutex poisoned")
            .get(handle)
            .cloned()
    }

    pub(super) fn artifact_events_for(&self, kind: ArtifactKind) -> Vec<GeneratedArtifact> {
        self.artifact_events
            .lock()
            .expect("events mutex poisoned")
            .iter()
            .filter(|artifact| artifact.kind == kind)
            .cloned()
            .collect()
    }

    pub(super) fn stored_answers(&self, id: &ApplicationId) -> Vec<Answer> {
        let mut answers: Vec<Answer> = self
            .answers
            .lock()
            .expect("answers mutex poisoned")
            .values()
            .filter(|answer| answer.application_id == *id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| a.key.cmp(&b.key));
        answers
    }
}

impl PacketRepository for MemoryPacketRepository {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.applications.lock().expect("applications mutex poisoned");
        if guard.contains_key(&application.id.0) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.0.clone(), application.clone());
        Ok(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.applications.lock().expect("applications mutex poisoned");
        guard.insert(application.id.0.clone(), application);
        Ok(())
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("applications mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn insert_document(&self, document: SourceDocument) -> Result<SourceDocument, RepositoryError> {
        let mut guard = self.documents.lock().expect("documents mutex poisoned");
        guard.push(document.clone());
        Ok(document)
    }

    fn documents_for(&self, id: &ApplicationId) -> Result<Vec<SourceDocument>, RepositoryError> {
        let guard = self.documents.lock().expect("documents mutex poisoned");
        Ok(guard
            .iter()
            .filter(|document| document.application_id == *id)
            .cloned()
            .collect())
    }

    fn append_record(&self, record: ExtractedRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("records mutex poisoned");
        guard.push(record);
        Ok(())
    }

    fn records_for(&self, id: &ApplicationId) -> Result<Vec<ExtractedRecord>, RepositoryError> {
        let guard = self.records.lock().expect("records mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| record.application_id == *id)
            .cloned()
            .collect())
    }

    fn upsert_answer(&self, answer: Answer) -> Result<(), RepositoryError> {
        let mut guard = self.answers.lock().expect("answers mutex poisoned");
        guard.insert(
            (answer.application_id.0.clone(), answer.key.clone()),
            answer,
        );
        Ok(())
    }

    fn answers_for(&self, id: &ApplicationId) -> Result<Vec<Answer>, RepositoryError> {
        let guard = self.answers.lock().expect("answers mutex poisoned");
        Ok(guard
            .values()
            .filter(|answer| answer.application_id == *id)
            .cloned()
            .collect())
    }

    fn upsert_artifact(&self, artifact: GeneratedArtifact) -> Result<(), RepositoryError> {
        self.artifact_events
            .lock()
            .expect("events mutex poisoned")
            .push(artifact.clone());
        let mut guard = self.artifacts.lock().expect("artifacts mutex poisoned");
        guard.insert((artifact.application_id.0.clone(), artifact.kind), artifact);
        Ok(())
    }

    fn fetch_artifact(
        &self,
        id: &ApplicationId,
        kind: ArtifactKind,
    ) -> Result<Option<GeneratedArtifact>, RepositoryError> {
        let guard = self.artifacts.lock().expect("artifacts mutex poisoned");
        Ok(guard.get(&(id.0.clone(), kind)).cloned())
    }

    fn artifacts_for(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<GeneratedArtifact>, RepositoryError> {
        let guard = self.artifacts.lock().expect("artifacts mutex poisoned");
        let mut artifacts: Vec<GeneratedArtifact> = guard
            .values()
            .filter(|artifact| artifact.application_id == *id)
            .cloned()
            .collect();
        artifacts.sort_by_key(|artifact| artifact.kind);
        Ok(artifacts)
    }

    fn store_output(&self, handle: &str, bytes: Vec<u8>) -> Result<(), RepositoryError> {
        let mut guard = self.outputs.lock().expect("outputs mutex poisoned");
        guard.insert(handle.to_string(), bytes);
        Ok(())
    }
}

/// Repository whose answer writes always fail, for exercising batch-wide
/// orchestration faults. Everything else delegates to the in-memory fake.
#[derive(Default)]
pub(super) struct PoisonedAnswerRepository(MemoryPacketRepository);

impl PacketRepository for PoisonedAnswerRepository {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        self.0.insert_application(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        self.0.update_application(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.0.fetch_application(id)
    }

    fn insert_document(&self, document: SourceDocument) -> Result<SourceDocument, RepositoryError> {
        self.0.insert_document(document)
    }

    fn documents_for(&self, id: &ApplicationId) -> Result<Vec<SourceDocument>, RepositoryError> {
        self.0.documents_for(id)
    }

    fn append_record(&self, record: ExtractedRecord) -> Result<(), RepositoryError> {
        self.0.append_record(record)
    }

    fn records_for(&self, id: &ApplicationId) -> Result<Vec<ExtractedRecord>, RepositoryError> {
        self.0.records_for(id)
    }

    fn upsert_answer(&self, _answer: Answer) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("answer store offline".to_string()))
    }

    fn answers_for(&self, id: &ApplicationId) -> Result<Vec<Answer>, RepositoryError> {
        self.0.answers_for(id)
    }

    fn upsert_artifact(&self, artifact: GeneratedArtifact) -> Result<(), RepositoryError> {
        self.0.upsert_artifact(artifact)
    }

    fn fetch_artifact(
        &self,
        id: &ApplicationId,
        kind: ArtifactKind,
    ) -> Result<Option<GeneratedArtifact>, RepositoryError> {
        self.0.fetch_artifact(id, kind)
    }

    fn artifacts_for(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<GeneratedArtifact>, RepositoryError> {
        self.0.artifacts_for(id)
    }

    fn store_output(&self, handle: &str, bytes: Vec<u8>) -> Result<(), RepositoryError> {
        self.0.store_output(handle, bytes)
    }
}

/// Renderer that fails a chosen set of kinds and renders the rest through the
/// production path.
pub(super) struct SelectiveFailRenderer {
    inner: PipelineRenderer<Arc<ScriptedGenerativeClient>>,
    failing: HashSet<ArtifactKind>,
}

impl SelectiveFailRenderer {
    pub(super) fn new(client: Arc<ScriptedGenerativeClient>, failing: &[ArtifactKind]) -> Self {
        Self {
            inner: PipelineRenderer::new(client),
            failing: failing.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl ArtifactRenderer for SelectiveFailRenderer {
    async fn render(
        &self,
        application: &Application,
        spec: &ArtifactSpec,
        fields: &ResolvedFieldSet,
    ) -> Result<Vec<u8>, RenderError> {
        if self.failing.contains(&spec.kind) {
            return Err(RenderError::Generative(GenerativeError::Service {
                status: 500,
                body: "template engine exploded".to_string(),
            }));
        }
        self.inner.render(application, spec, fields).await
    }
}

/// Renderer that trips the shared cancellation flag as a render starts, then
/// renders through the production path anyway.
pub(super) struct CancelDuringRender {
    inner: PipelineRenderer<Arc<ScriptedGenerativeClient>>,
    flag: CancellationFlag,
}

impl CancelDuringRender {
    pub(super) fn new(client: Arc<ScriptedGenerativeClient>, flag: CancellationFlag) -> Self {
        Self {
            inner: PipelineRenderer::new(client),
            flag,
        }
    }
}

#[async_trait]
impl ArtifactRenderer for CancelDuringRender {
    async fn render(
        &self,
        application: &Application,
        spec: &ArtifactSpec,
        fields: &ResolvedFieldSet,
    ) -> Result<Vec<u8>, RenderError> {
        self.flag.cancel();
        self.inner.render(application, spec, fields).await
    }
}

pub(super) type TestService = PacketService<
    MemoryPacketRepository,
    ScriptedGenerativeClient,
    PipelineRenderer<Arc<ScriptedGenerativeClient>>,
>;

pub(super) const LETTER_TEXT: &str =
    "Dear Consular Officer, I respectfully submit this application for your consideration.";

pub(super) fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        render_concurrency: 2,
        persist_synthesized: true,
    }
}

/// Service wired with in-memory storage and a scripted model whose default
/// reply is a plausible letter, so narrative renders succeed unless a test
/// scripts otherwise.
pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<MemoryPacketRepository>,
    Arc<ScriptedGenerativeClient>,
) {
    let repository = Arc::new(MemoryPacketRepository::default());
    let client = Arc::new(ScriptedGenerativeClient::new(LETTER_TEXT));
    let service = Arc::new(PacketService::new(
        Arc::clone(&repository),
        Arc::clone(&client),
        "llama3:8b",
        &pipeline_config(),
    ));
    (service, repository, client)
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn scalar(text: &str) -> AnswerValue {
    AnswerValue::Text(text.to_string())
}

pub(super) fn entries(rows: &[&[(&str, &str)]]) -> AnswerValue {
    AnswerValue::Entries(
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect::<BTreeMap<String, String>>()
            })
            .collect(),
    )
}

use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use dossier_ai::workflows::dossier::{
    Answer, ApplicantCategory, Application, ApplicationId, ArtifactKind, ExtractedRecord,
    GeneratedArtifact, PacketRepository, RepositoryError, SourceDocument,
};

pub(crate) fn parse_category(raw: &str) -> Result<ApplicantCategory, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "salaried" => Ok(ApplicantCategory::Salaried),
        "self_employed" | "self-employed" => Ok(ApplicantCategory::SelfEmployed),
        "student" => Ok(ApplicantCategory::Student),
        other => Err(format!(
            "unknown category '{other}' (expected salaried, self_employed, or student)"
        )),
    }
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory persistence used by the serve and demo commands. Answers are
/// keyed per (application, key) so the latest write wins; extraction records
/// are append-only.
#[derive(Default, Clone)]
pub(crate) struct InMemoryPacketRepository {
    applications: Arc<Mutex<HashMap<String, Application>>>,
    documents: Arc<Mutex<Vec<SourceDocument>>>,
    records: Arc<Mutex<Vec<ExtractedRecord>>>,
    answers: Arc<Mutex<HashMap<(String, String), Answer>>>,
    artifacts: Arc<Mutex<HashMap<(String, ArtifactKind), GeneratedArtifact>>>,
    outputs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryPacketRepository {
    pub(crate) fn output(&self, handle: &str) -> Option<Vec<u8>> {
        self.outputs
            .lock()
            .expect("outputs mutex poisoned")
            .get(handle)
            .cloned()
    }
}

impl PacketRepository for InMemoryPacketRepository {
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
        if !guard.contains_key(&application.id.0) {
            return Err(RepositoryError::NotFound);
        }
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

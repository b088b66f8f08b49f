//! Shared fixtures for the integration specifications: an in-memory
//! repository over the public trait and a service wired to the scripted
//! generative client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dossier_ai::config::PipelineConfig;
use dossier_ai::workflows::dossier::{
    Answer, Application, ApplicationId, ArtifactKind, ExtractedRecord, GeneratedArtifact,
    PacketRepository, PacketService, PipelineRenderer, RepositoryError, SourceDocument,
};
use dossier_ai::workflows::genai::ScriptedGenerativeClient;

pub const PASSPORT_TEXT: &str = "REPUBLIC OF INDONESIA PASSPORT\n\
    Surname: WIJAYA Given names: SARI\n\
    Passport No: C2204817 Nationality: INDONESIAN\n\
    Date of birth: 03 FEB 1994";

pub const PASSPORT_EXTRACTION: &str = r#"{
    "full_name": "Sari Wijaya",
    "passport_number": "C2204817",
    "nationality": "Indonesian",
    "birth_date": "1994-02-03"
}"#;

#[derive(Default, Clone)]
pub struct MemoryRepository {
    applications: Arc<Mutex<HashMap<String, Application>>>,
    documents: Arc<Mutex<Vec<SourceDocument>>>,
    records: Arc<Mutex<Vec<ExtractedRecord>>>,
    answers: Arc<Mutex<HashMap<(String, String), Answer>>>,
    artifacts: Arc<Mutex<HashMap<(String, ArtifactKind), GeneratedArtifact>>>,
    outputs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryRepository {
    pub fn output(&self, handle: &str) -> Option<Vec<u8>> {
        self.outputs.lock().expect("lock").get(handle).cloned()
    }

    pub fn stored_answers(&self, id: &ApplicationId) -> Vec<Answer> {
        self.answers
            .lock()
            .expect("lock")
            .values()
            .filter(|answer| answer.application_id == *id)
            .cloned()
            .collect()
    }
}

impl PacketRepository for MemoryRepository {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.applications.lock().expect("lock");
        if guard.contains_key(&application.id.0) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.0.clone(), application.clone());
        Ok(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.applications.lock().expect("lock");
        if !guard.contains_key(&application.id.0) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(application.id.0.clone(), application);
        Ok(())
    }

    fn fetch_application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.applications.lock().expect("lock").get(&id.0).cloned())
    }

    fn insert_document(&self, document: SourceDocument) -> Result<SourceDocument, RepositoryError> {
        self.documents.lock().expect("lock").push(document.clone());
        Ok(document)
    }

    fn documents_for(&self, id: &ApplicationId) -> Result<Vec<SourceDocument>, RepositoryError> {
        Ok(self
            .documents
            .lock()
            .expect("lock")
            .iter()
            .filter(|document| document.application_id == *id)
            .cloned()
            .collect())
    }

    fn append_record(&self, record: ExtractedRecord) -> Result<(), RepositoryError> {
        self.records.lock().expect("lock").push(record);
        Ok(())
    }

    fn records_for(&self, id: &ApplicationId) -> Result<Vec<ExtractedRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .iter()
            .filter(|record| record.application_id == *id)
            .cloned()
            .collect())
    }

    fn upsert_answer(&self, answer: Answer) -> Result<(), RepositoryError> {
        self.answers.lock().expect("lock").insert(
            (answer.application_id.0.clone(), answer.key.clone()),
            answer,
        );
        Ok(())
    }

    fn answers_for(&self, id: &ApplicationId) -> Result<Vec<Answer>, RepositoryError> {
        Ok(self.stored_answers(id))
    }

    fn upsert_artifact(&self, artifact: GeneratedArtifact) -> Result<(), RepositoryError> {
        self.artifacts
            .lock()
            .expect("lock")
            .insert((artifact.application_id.0.clone(), artifact.kind), artifact);
        Ok(())
    }

    fn fetch_artifact(
        &self,
        id: &ApplicationId,
        kind: ArtifactKind,
    ) -> Result<Option<GeneratedArtifact>, RepositoryError> {
        Ok(self
            .artifacts
            .lock()
            .expect("lock")
            .get(&(id.0.clone(), kind))
            .cloned())
    }

    fn artifacts_for(&self, id: &ApplicationId) -> Result<Vec<GeneratedArtifact>, RepositoryError> {
        let mut artifacts: Vec<GeneratedArtifact> = self
            .artifacts
            .lock()
            .expect("lock")
            .values()
            .filter(|artifact| artifact.application_id == *id)
            .cloned()
            .collect();
        artifacts.sort_by_key(|artifact| artifact.kind);
        Ok(artifacts)
    }

    fn store_output(&self, handle: &str, bytes: Vec<u8>) -> Result<(), RepositoryError> {
        self.outputs
            .lock()
            .expect("lock")
            .insert(handle.to_string(), bytes);
        Ok(())
    }
}

pub type TestService = PacketService<
    MemoryRepository,
    ScriptedGenerativeClient,
    PipelineRenderer<Arc<ScriptedGenerativeClient>>,
>;

pub fn build_service() -> (
    Arc<TestService>,
    Arc<MemoryRepository>,
    Arc<ScriptedGenerativeClient>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let client = Arc::new(ScriptedGenerativeClient::new(
        "I confirm the enclosed details are accurate and complete.",
    ));
    // Single render lane keeps scripted responses aligned with documents.
    let config = PipelineConfig {
        render_concurrency: 1,
        persist_synthesized: true,
    };
    let service = Arc::new(TestService::new(
        repository.clone(),
        client.clone(),
        "scripted-test",
        &config,
    ));
    (service, repository, client)
}

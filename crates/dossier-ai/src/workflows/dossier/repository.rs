use super::domain::{
    Answer, Application, ApplicationId, ArtifactKind, ExtractedRecord, GeneratedArtifact,
    SourceDocument,
};

/// Storage abstraction so the pipeline can run against any persistence
/// collaborator. Adapters live with the service binary; tests use in-memory
/// fakes.
pub trait PacketRepository: Send + Sync {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError>;
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;

    fn insert_document(&self, document: SourceDocument) -> Result<SourceDocument, RepositoryError>;
    fn documents_for(&self, id: &ApplicationId) -> Result<Vec<SourceDocument>, RepositoryError>;

    /// Extracted records are append-only; conflicting values coexist.
    fn append_record(&self, record: ExtractedRecord) -> Result<(), RepositoryError>;
    fn records_for(&self, id: &ApplicationId) -> Result<Vec<ExtractedRecord>, RepositoryError>;

    /// Latest write per key wins; no answer history is kept.
    fn upsert_answer(&self, answer: Answer) -> Result<(), RepositoryError>;
    fn answers_for(&self, id: &ApplicationId) -> Result<Vec<Answer>, RepositoryError>;

    /// One artifact row per (application, kind); writes replace the row.
    fn upsert_artifact(&self, artifact: GeneratedArtifact) -> Result<(), RepositoryError>;
    fn fetch_artifact(
        &self,
        id: &ApplicationId,
        kind: ArtifactKind,
    ) -> Result<Option<GeneratedArtifact>, RepositoryError>;
    fn artifacts_for(&self, id: &ApplicationId)
        -> Result<Vec<GeneratedArtifact>, RepositoryError>;

    fn store_output(&self, handle: &str, bytes: Vec<u8>) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

//! Visa packet pipeline: layered field resolution, deterministic auto-fill,
//! artifact generation, and scoring over uploaded document extractions.

pub mod blueprint;
pub mod domain;
pub mod orchestrator;
pub mod registry;
pub mod rendering;
pub mod repository;
pub mod resolution;
pub mod router;
pub mod scoring;
pub mod service;
pub mod synthesis;

#[cfg(test)]
mod tests;

pub use domain::{
    Answer, AnswerOrigin, AnswerValue, ApplicantCategory, Application, ApplicationId,
    ApplicationStatus, ArtifactKind, ArtifactOutput, ArtifactStatus, ExtractedRecord,
    ExtractionOutcome, GeneratedArtifact, SourceDocument, SourceDocumentKind,
};
pub use orchestrator::{CancellationFlag, GenerationOrchestrator, OrchestrationError};
pub use rendering::{ArtifactRenderer, PipelineRenderer, RenderError};
pub use repository::{PacketRepository, RepositoryError};
pub use resolution::{ResolutionSnapshot, ResolvedFieldSet, ResolvedValue};
pub use router::packet_router;
pub use scoring::{PacketInsights, ReadinessLevel};
pub use service::{PacketService, PacketServiceError};
pub use synthesis::SynthesisError;

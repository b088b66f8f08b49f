use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for packet applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Applicant category driving which artifact kinds are targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantCategory {
    Salaried,
    SelfEmployed,
    Student,
}

impl ApplicantCategory {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicantCategory::Salaried => "salaried",
            ApplicantCategory::SelfEmployed => "self_employed",
            ApplicantCategory::Student => "student",
        }
    }
}

/// Aggregate status tracked across the packet lifecycle.
///
/// The ladder is monotonic: a status never steps backwards except when an
/// explicit regeneration reopens a completed packet, and `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    DocumentsUploaded,
    Analyzing,
    Generating,
    Completed,
    Failed,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::DocumentsUploaded => "documents_uploaded",
            ApplicationStatus::Analyzing => "analyzing",
            ApplicationStatus::Generating => "generating",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Failed)
    }

    const fn rank(self) -> u8 {
        match self {
            ApplicationStatus::Draft => 0,
            ApplicationStatus::DocumentsUploaded => 1,
            ApplicationStatus::Analyzing => 2,
            ApplicationStatus::Generating => 3,
            ApplicationStatus::Completed => 4,
            ApplicationStatus::Failed => 5,
        }
    }

    /// Advance along the monotonic ladder, never regressing.
    pub fn advanced_to(self, proposed: ApplicationStatus) -> ApplicationStatus {
        if self.is_terminal() || proposed.rank() <= self.rank() {
            self
        } else {
            proposed
        }
    }
}

/// Top-level entity owning every document, answer, record, and artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub category: ApplicantCategory,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Closed enumeration of uploaded document kinds, with a generic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDocumentKind {
    Passport,
    NationalId,
    BankStatement,
    PayStub,
    TaxReturn,
    Generic,
}

impl SourceDocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            SourceDocumentKind::Passport => "passport",
            SourceDocumentKind::NationalId => "national_id",
            SourceDocumentKind::BankStatement => "bank_statement",
            SourceDocumentKind::PayStub => "pay_stub",
            SourceDocumentKind::TaxReturn => "tax_return",
            SourceDocumentKind::Generic => "generic",
        }
    }
}

/// One uploaded document with its externally extracted raw text.
///
/// Immutable after creation; re-uploads create new documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub application_id: ApplicationId,
    pub kind: SourceDocumentKind,
    pub raw_text: String,
    pub uploaded_at: DateTime<Utc>,
}

/// How an extraction attempt concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Extracted,
    InsufficientInput,
    Failed,
}

/// Structured facts pulled from one source document. Append-only; an
/// application may hold several records that conflict on the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub id: String,
    pub source_document_id: String,
    pub application_id: ApplicationId,
    pub kind: SourceDocumentKind,
    pub fields: BTreeMap<String, String>,
    pub confidence: u8,
    pub extractor: String,
    pub outcome: ExtractionOutcome,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Provenance of an answer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOrigin {
    Questionnaire,
    Synthesized,
}

/// Scalar text or an ordered list of structured sub-records for repeatable
/// sections (bank accounts, prior trips, owned assets, multi-year income).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Entries(Vec<BTreeMap<String, String>>),
}

impl AnswerValue {
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::Entries(entries) => entries.is_empty(),
        }
    }
}

/// User- or synthesis-supplied value for one field key. Latest write per key
/// wins; no history is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub application_id: ApplicationId,
    pub key: String,
    pub origin: AnswerOrigin,
    pub value: AnswerValue,
    pub recorded_at: DateTime<Utc>,
}

/// Generated output document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ApplicationForm,
    CoverLetter,
    FinancialSummary,
    EmploymentLetter,
    BusinessProfile,
    VisitingCard,
    EnrollmentSummary,
}

impl ArtifactKind {
    pub const fn label(self) -> &'static str {
        match self {
            ArtifactKind::ApplicationForm => "application_form",
            ArtifactKind::CoverLetter => "cover_letter",
            ArtifactKind::FinancialSummary => "financial_summary",
            ArtifactKind::EmploymentLetter => "employment_letter",
            ArtifactKind::BusinessProfile => "business_profile",
            ArtifactKind::VisitingCard => "visiting_card",
            ArtifactKind::EnrollmentSummary => "enrollment_summary",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "application_form" => Some(ArtifactKind::ApplicationForm),
            "cover_letter" => Some(ArtifactKind::CoverLetter),
            "financial_summary" => Some(ArtifactKind::FinancialSummary),
            "employment_letter" => Some(ArtifactKind::EmploymentLetter),
            "business_profile" => Some(ArtifactKind::BusinessProfile),
            "visiting_card" => Some(ArtifactKind::VisitingCard),
            "enrollment_summary" => Some(ArtifactKind::EnrollmentSummary),
            _ => None,
        }
    }
}

/// Per-kind render state machine: Pending → Generating → {Completed | Failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl ArtifactStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::Generating => "generating",
            ArtifactStatus::Completed => "completed",
            ArtifactStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ArtifactStatus::Completed | ArtifactStatus::Failed)
    }
}

/// Handle to rendered bytes stored through the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactOutput {
    pub handle: String,
    pub byte_len: usize,
}

/// One row per (application, kind); regeneration overwrites the row in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub application_id: ApplicationId,
    pub kind: ArtifactKind,
    pub status: ArtifactStatus,
    pub progress: u8,
    pub output: Option<ArtifactOutput>,
    pub failure_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl GeneratedArtifact {
    /// Fresh pending row for a generation run.
    pub fn pending(application_id: ApplicationId, kind: ArtifactKind) -> Self {
        Self {
            application_id,
            kind,
            status: ArtifactStatus::Pending,
            progress: 0,
            output: None,
            failure_reason: None,
            updated_at: Utc::now(),
        }
    }
}

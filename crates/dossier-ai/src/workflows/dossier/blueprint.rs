//! Declarative tables shared by extraction, resolution, synthesis, scoring,
//! and rendering: the canonical field catalog, per-source-kind schemas and
//! importance weights, per-artifact render specs, and the category-dependent
//! target list.

use chrono::NaiveDate;

use super::domain::{ApplicantCategory, ArtifactKind, SourceDocumentKind};

/// Whether a canonical field holds one value or a repeatable section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Scalar,
    List,
}

/// Format class used by the per-field validators and the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    FreeText,
    PersonName,
    Date,
    Phone,
    Email,
    Money,
    PassportNumber,
    NationalIdNumber,
    TaxIdNumber,
    BankAccountNumber,
    CountryName,
}

/// One canonical field the pipeline knows how to extract, resolve, synthesize,
/// and render.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub shape: FieldShape,
    pub format: FieldFormat,
    /// For lists, the minimum entry count synthesis must guarantee.
    pub min_entries: usize,
}

const FIELD_CATALOG: &[FieldSpec] = &[
    FieldSpec {
        key: "full_name",
        label: "Full name",
        shape: FieldShape::Scalar,
        format: FieldFormat::PersonName,
        min_entries: 0,
    },
    FieldSpec {
        key: "birth_date",
        label: "Date of birth",
        shape: FieldShape::Scalar,
        format: FieldFormat::Date,
        min_entries: 0,
    },
    FieldSpec {
        key: "nationality",
        label: "Nationality",
        shape: FieldShape::Scalar,
        format: FieldFormat::CountryName,
        min_entries: 0,
    },
    FieldSpec {
        key: "passport_number",
        label: "Passport number",
        shape: FieldShape::Scalar,
        format: FieldFormat::PassportNumber,
        min_entries: 0,
    },
    FieldSpec {
        key: "passport_issue_date",
        label: "Passport issue date",
        shape: FieldShape::Scalar,
        format: FieldFormat::Date,
        min_entries: 0,
    },
    FieldSpec {
        key: "passport_expiry_date",
        label: "Passport expiry date",
        shape: FieldShape::Scalar,
        format: FieldFormat::Date,
        min_entries: 0,
    },
    FieldSpec {
        key: "national_id_number",
        label: "National ID number",
        shape: FieldShape::Scalar,
        format: FieldFormat::NationalIdNumber,
        min_entries: 0,
    },
    FieldSpec {
        key: "tax_id_number",
        label: "Tax ID number",
        shape: FieldShape::Scalar,
        format: FieldFormat::TaxIdNumber,
        min_entries: 0,
    },
    FieldSpec {
        key: "phone",
        label: "Phone",
        shape: FieldShape::Scalar,
        format: FieldFormat::Phone,
        min_entries: 0,
    },
    FieldSpec {
        key: "email",
        label: "Email",
        shape: FieldShape::Scalar,
        format: FieldFormat::Email,
        min_entries: 0,
    },
    FieldSpec {
        key: "home_address",
        label: "Home address",
        shape: FieldShape::Scalar,
        format: FieldFormat::FreeText,
        min_entries: 0,
    },
    FieldSpec {
        key: "occupation",
        label: "Occupation",
        shape: FieldShape::Scalar,
        format: FieldFormat::FreeText,
        min_entries: 0,
    },
    FieldSpec {
        key: "employer_name",
        label: "Employer",
        shape: FieldShape::Scalar,
        format: FieldFormat::FreeText,
        min_entries: 0,
    },
    FieldSpec {
        key: "monthly_income",
        label: "Monthly income",
        shape: FieldShape::Scalar,
        format: FieldFormat::Money,
        min_entries: 0,
    },
    FieldSpec {
        key: "bank_balance",
        label: "Bank balance",
        shape: FieldShape::Scalar,
        format: FieldFormat::Money,
        min_entries: 0,
    },
    FieldSpec {
        key: "trip_purpose",
        label: "Purpose of trip",
        shape: FieldShape::Scalar,
        format: FieldFormat::FreeText,
        min_entries: 0,
    },
    FieldSpec {
        key: "bank_accounts",
        label: "Bank accounts",
        shape: FieldShape::List,
        format: FieldFormat::BankAccountNumber,
        min_entries: 1,
    },
    FieldSpec {
        key: "yearly_incomes",
        label: "Yearly income history",
        shape: FieldShape::List,
        format: FieldFormat::Money,
        min_entries: 1,
    },
    FieldSpec {
        key: "prior_trips",
        label: "Prior trips",
        shape: FieldShape::List,
        format: FieldFormat::FreeText,
        min_entries: 0,
    },
    FieldSpec {
        key: "owned_assets",
        label: "Owned assets",
        shape: FieldShape::List,
        format: FieldFormat::FreeText,
        min_entries: 0,
    },
];

pub fn field_catalog() -> &'static [FieldSpec] {
    FIELD_CATALOG
}

pub fn field_spec(key: &str) -> Option<&'static FieldSpec> {
    FIELD_CATALOG.iter().find(|spec| spec.key == key)
}

/// Confidence weighting shared by the extraction router and scoring.
pub mod weights {
    /// Fraction of expected fields populated.
    pub const FIELD_COVERAGE: f32 = 0.6;
    /// Fraction of populated fields passing their format validator.
    pub const FORMAT_VALIDITY: f32 = 0.4;
}

/// Expected schema and importance weight for one uploaded document kind.
#[derive(Debug, Clone, Copy)]
pub struct SourceKindSpec {
    pub kind: SourceDocumentKind,
    /// Importance weight for completeness scoring; mandatory kinds weigh more.
    pub importance: u8,
    pub expected_fields: &'static [&'static str],
    /// Ceiling applied to extraction confidence for this kind.
    pub confidence_ceiling: u8,
}

const SOURCE_KIND_SPECS: &[SourceKindSpec] = &[
    SourceKindSpec {
        kind: SourceDocumentKind::Passport,
        importance: 5,
        expected_fields: &[
            "full_name",
            "passport_number",
            "birth_date",
            "nationality",
            "passport_issue_date",
            "passport_expiry_date",
        ],
        confidence_ceiling: 100,
    },
    SourceKindSpec {
        kind: SourceDocumentKind::NationalId,
        importance: 4,
        expected_fields: &["full_name", "national_id_number", "birth_date", "home_address"],
        confidence_ceiling: 100,
    },
    SourceKindSpec {
        kind: SourceDocumentKind::BankStatement,
        importance: 4,
        expected_fields: &["full_name", "bank_balance"],
        confidence_ceiling: 100,
    },
    SourceKindSpec {
        kind: SourceDocumentKind::PayStub,
        importance: 3,
        expected_fields: &["full_name", "employer_name", "monthly_income"],
        confidence_ceiling: 100,
    },
    SourceKindSpec {
        kind: SourceDocumentKind::TaxReturn,
        importance: 3,
        expected_fields: &["full_name", "tax_id_number", "monthly_income"],
        confidence_ceiling: 100,
    },
    SourceKindSpec {
        kind: SourceDocumentKind::Generic,
        importance: 1,
        expected_fields: &["full_name", "birth_date", "phone", "email"],
        confidence_ceiling: 60,
    },
];

pub fn source_kind_specs() -> &'static [SourceKindSpec] {
    SOURCE_KIND_SPECS
}

pub fn source_kind_spec(kind: SourceDocumentKind) -> &'static SourceKindSpec {
    SOURCE_KIND_SPECS
        .iter()
        .find(|spec| spec.kind == kind)
        .unwrap_or(&SOURCE_KIND_SPECS[SOURCE_KIND_SPECS.len() - 1])
}

/// Render strategy selected per artifact kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    StructuredTemplate,
    GenerativeContent,
}

/// What one generated artifact needs: its strategy, title, and the canonical
/// fields it references.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactSpec {
    pub kind: ArtifactKind,
    pub title: &'static str,
    pub strategy: RenderStrategy,
    pub fields: &'static [&'static str],
}

const ARTIFACT_SPECS: &[ArtifactSpec] = &[
    ArtifactSpec {
        kind: ArtifactKind::ApplicationForm,
        title: "Visa Application Form",
        strategy: RenderStrategy::StructuredTemplate,
        fields: &[
            "full_name",
            "birth_date",
            "nationality",
            "passport_number",
            "passport_issue_date",
            "passport_expiry_date",
            "phone",
            "email",
            "home_address",
            "occupation",
            "trip_purpose",
        ],
    },
    ArtifactSpec {
        kind: ArtifactKind::CoverLetter,
        title: "Cover Letter",
        strategy: RenderStrategy::GenerativeContent,
        fields: &["full_name", "nationality", "occupation", "trip_purpose"],
    },
    ArtifactSpec {
        kind: ArtifactKind::FinancialSummary,
        title: "Financial Summary",
        strategy: RenderStrategy::StructuredTemplate,
        fields: &[
            "full_name",
            "monthly_income",
            "bank_balance",
            "bank_accounts",
            "yearly_incomes",
            "owned_assets",
        ],
    },
    ArtifactSpec {
        kind: ArtifactKind::EmploymentLetter,
        title: "Employment Verification Letter",
        strategy: RenderStrategy::GenerativeContent,
        fields: &["full_name", "employer_name", "occupation", "monthly_income"],
    },
    ArtifactSpec {
        kind: ArtifactKind::BusinessProfile,
        title: "Business Profile",
        strategy: RenderStrategy::GenerativeContent,
        fields: &["full_name", "occupation", "tax_id_number", "monthly_income"],
    },
    ArtifactSpec {
        kind: ArtifactKind::VisitingCard,
        title: "Visiting Card",
        strategy: RenderStrategy::StructuredTemplate,
        fields: &["full_name", "occupation", "phone", "email"],
    },
    ArtifactSpec {
        kind: ArtifactKind::EnrollmentSummary,
        title: "Enrollment Summary",
        strategy: RenderStrategy::StructuredTemplate,
        fields: &["full_name", "birth_date", "home_address", "prior_trips"],
    },
];

pub fn artifact_specs() -> &'static [ArtifactSpec] {
    ARTIFACT_SPECS
}

pub fn artifact_spec(kind: ArtifactKind) -> &'static ArtifactSpec {
    ARTIFACT_SPECS
        .iter()
        .find(|spec| spec.kind == kind)
        .expect("artifact spec table covers every kind")
}

/// Shared base kinds every applicant category receives.
const BASE_TARGET_KINDS: &[ArtifactKind] = &[
    ArtifactKind::ApplicationForm,
    ArtifactKind::CoverLetter,
    ArtifactKind::FinancialSummary,
    ArtifactKind::VisitingCard,
];

/// Target document-kind list: shared base plus a category-specific delta.
pub fn target_kinds(category: ApplicantCategory) -> Vec<ArtifactKind> {
    let delta = match category {
        ApplicantCategory::Salaried => ArtifactKind::EmploymentLetter,
        ApplicantCategory::SelfEmployed => ArtifactKind::BusinessProfile,
        ApplicantCategory::Student => ArtifactKind::EnrollmentSummary,
    };

    let mut kinds = BASE_TARGET_KINDS.to_vec();
    kinds.push(delta);
    kinds
}

/// Per-field format validation used by extraction confidence and synthesis
/// self-checks. Lenient on punctuation, strict on shape.
pub fn validate_format(format: FieldFormat, value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }

    match format {
        FieldFormat::FreeText => true,
        FieldFormat::PersonName => {
            trimmed.split_whitespace().count() >= 2
                && trimmed
                    .chars()
                    .all(|c| c.is_alphabetic() || c.is_whitespace() || matches!(c, '.' | '\'' | '-'))
        }
        FieldFormat::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok(),
        FieldFormat::Phone => {
            let digits = trimmed.chars().filter(char::is_ascii_digit).count();
            let allowed = trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
            allowed && (9..=15).contains(&digits)
        }
        FieldFormat::Email => {
            let mut parts = trimmed.splitn(2, '@');
            let local = parts.next().unwrap_or_default();
            let domain = parts.next().unwrap_or_default();
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        FieldFormat::Money => {
            let digits: String = trimmed
                .chars()
                .filter(|c| !matches!(*c, ',' | '.' | ' '))
                .collect();
            !digits.is_empty()
                && digits.len() <= 12
                && digits.chars().all(|c| c.is_ascii_digit())
        }
        FieldFormat::PassportNumber => {
            trimmed.len() >= 7
                && trimmed.len() <= 9
                && trimmed.chars().next().is_some_and(|c| c.is_ascii_uppercase())
                && trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        }
        FieldFormat::NationalIdNumber => {
            (10..=16).contains(&trimmed.len()) && trimmed.chars().all(|c| c.is_ascii_digit())
        }
        FieldFormat::TaxIdNumber => {
            let digits = trimmed.chars().filter(char::is_ascii_digit).count();
            (9..=15).contains(&digits)
                && trimmed
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        }
        FieldFormat::BankAccountNumber => {
            (8..=16).contains(&trimmed.len()) && trimmed.chars().all(|c| c.is_ascii_digit())
        }
        FieldFormat::CountryName => trimmed
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace()),
    }
}

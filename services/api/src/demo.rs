use crate::infra::{parse_category, InMemoryPacketRepository};
use clap::Args;
use std::sync::Arc;

use dossier_ai::config::PipelineConfig;
use dossier_ai::error::AppError;
use dossier_ai::workflows::dossier::{
    AnswerValue, ApplicantCategory, PacketService, ResolvedValue, SourceDocumentKind,
};
use dossier_ai::workflows::genai::ScriptedGenerativeClient;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Applicant category: salaried, self_employed, or student.
    #[arg(long, default_value = "salaried", value_parser = parse_category)]
    pub(crate) category: ApplicantCategory,
    /// Record questionnaire answers before generating the packet.
    #[arg(long)]
    pub(crate) with_answers: bool,
    /// Print the rendered body of every completed artifact.
    #[arg(long)]
    pub(crate) show_artifacts: bool,
}

const PASSPORT_TEXT: &str = "REPUBLIC OF INDONESIA\nPASSPORT\n\
Surname: PRATAMA  Given names: RIZKY\n\
Passport No: C1438056  Nationality: INDONESIAN\n\
Date of birth: 12 APR 1991  Date of issue: 02 JUN 2022\n\
Date of expiry: 02 JUN 2032";

const BANK_STATEMENT_TEXT: &str = "BANK MANDIRI - ACCOUNT STATEMENT\n\
Account holder: RIZKY PRATAMA\n\
Account number: 1370012345678\n\
Statement period: 01 May 2026 - 31 Jul 2026\n\
Closing balance: IDR 86,400,000";

const PAY_STUB_TEXT: &str = "PT NUSANTARA DIGITAL - PAYROLL SLIP\n\
Employee: RIZKY PRATAMA  Title: Software Engineer\n\
Pay period: July 2026\n\
Net pay: IDR 14,400,000";

const PASSPORT_EXTRACTION: &str = r#"{
  "full_name": "Rizky Pratama",
  "passport_number": "C1438056",
  "nationality": "Indonesian",
  "birth_date": "1991-04-12",
  "passport_issue_date": "2022-06-02",
  "passport_expiry_date": "2032-06-02"
}"#;

const BANK_EXTRACTION: &str = r#"{
  "bank_balance": "86400000",
  "full_name": "Rizky Pratama"
}"#;

const PAY_STUB_EXTRACTION: &str = r#"{
  "employer_name": "PT Nusantara Digital",
  "occupation": "Software Engineer",
  "monthly_income": "14400000"
}"#;

const DEFAULT_NARRATIVE: &str = "To the Honorable Consul,\n\n\
I am writing in support of this travel document application. The applicant \
holds stable employment, maintains sufficient funds for the planned stay, and \
intends to return home at the end of the trip. All supporting documents are \
enclosed with this packet.\n\nRespectfully submitted.";

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        category,
        with_answers,
        show_artifacts,
    } = args;

    println!("Document packet pipeline demo");
    println!("Category: {}", category.label());

    let repository = Arc::new(InMemoryPacketRepository::default());
    let client = Arc::new(ScriptedGenerativeClient::new(DEFAULT_NARRATIVE));
    // Single-lane pipeline so the scripted responses line up with the
    // documents in upload order.
    let config = PipelineConfig {
        render_concurrency: 1,
        persist_synthesized: true,
    };
    let service = Arc::new(PacketService::new(
        repository.clone(),
        client.clone(),
        "scripted-demo",
        &config,
    ));

    let application = match service.create_application(category) {
        Ok(application) => application,
        Err(err) => {
            println!("  Could not open application: {err}");
            return Ok(());
        }
    };
    let id = application.id.clone();
    println!(
        "- Opened application {} -> status {}",
        id.0,
        application.status.label()
    );

    let mut uploads = vec![
        (SourceDocumentKind::Passport, PASSPORT_TEXT, PASSPORT_EXTRACTION),
        (
            SourceDocumentKind::BankStatement,
            BANK_STATEMENT_TEXT,
            BANK_EXTRACTION,
        ),
    ];
    if category != ApplicantCategory::Student {
        uploads.push((SourceDocumentKind::PayStub, PAY_STUB_TEXT, PAY_STUB_EXTRACTION));
    }
    for (kind, raw_text, extraction) in uploads {
        match service.upload_document(&id, kind, raw_text.to_string()) {
            Ok(document) => println!("- Uploaded {} ({})", document.kind.label(), document.id),
            Err(err) => {
                println!("  Upload rejected: {err}");
                return Ok(());
            }
        }
        client.push_response(extraction);
    }

    println!("\nExtraction");
    let records = match service.analyze(&id).await {
        Ok(records) => records,
        Err(err) => {
            println!("  Analysis unavailable: {err}");
            return Ok(());
        }
    };
    for record in &records {
        println!(
            "- {}: {:?} | confidence {} | {} fields",
            record.kind.label(),
            record.outcome,
            record.confidence,
            record.fields.len()
        );
    }

    if with_answers {
        println!("\nQuestionnaire answers");
        let answers = [
            ("trip_purpose", "Tourism and visiting relatives"),
            ("home_address", "Jl. Melati 14, Jakarta Selatan"),
            ("email", "rizky.pratama@example.com"),
        ];
        for (key, value) in answers {
            match service.record_answer(&id, key, AnswerValue::Text(value.to_string())) {
                Ok(answer) => println!("- {} = {}", answer.key, value),
                Err(err) => println!("  Answer rejected: {err}"),
            }
        }
    }

    let fields = match service.resolved_fields(&id) {
        Ok(fields) => fields,
        Err(err) => {
            println!("  Field resolution unavailable: {err}");
            return Ok(());
        }
    };
    let resolved = fields.values().filter(|value| !value.is_missing()).count();
    println!(
        "\nResolved fields before synthesis: {}/{}",
        resolved,
        fields.len()
    );
    for (key, value) in &fields {
        match value {
            ResolvedValue::Text(text) => println!("- {key}: {text}"),
            ResolvedValue::Entries(entries) => {
                println!("- {key}: {} entries", entries.len())
            }
            ResolvedValue::Missing => {}
        }
    }

    println!("\nGenerating packet (gaps auto-filled deterministically)");
    let artifacts = match service.generate(&id, Vec::new()).await {
        Ok(artifacts) => artifacts,
        Err(err) => {
            println!("  Generation unavailable: {err}");
            return Ok(());
        }
    };
    for artifact in &artifacts {
        match (&artifact.output, &artifact.failure_reason) {
            (Some(output), _) => println!(
                "- {}: {} | progress {}% | {} bytes -> {}",
                artifact.kind.label(),
                artifact.status.label(),
                artifact.progress,
                output.byte_len,
                output.handle
            ),
            (None, Some(reason)) => println!(
                "- {}: {} | {}",
                artifact.kind.label(),
                artifact.status.label(),
                reason
            ),
            (None, None) => println!(
                "- {}: {} | progress {}%",
                artifact.kind.label(),
                artifact.status.label(),
                artifact.progress
            ),
        }
    }

    if show_artifacts {
        for artifact in &artifacts {
            let Some(output) = &artifact.output else {
                continue;
            };
            match repository.output(&output.handle) {
                Some(bytes) => {
                    println!("\n--- {} ---", artifact.kind.label());
                    println!("{}", String::from_utf8_lossy(&bytes));
                }
                None => println!("  Stored output missing for {}", output.handle),
            }
        }
    }

    let insights = match service.insights(&id) {
        Ok(insights) => insights,
        Err(err) => {
            println!("  Insights unavailable: {err}");
            return Ok(());
        }
    };
    println!("\nPacket insights");
    println!("- Status: {}", insights.status.label());
    println!(
        "- Documents {}% | fields {}% | readiness {}",
        insights.document_completeness,
        insights.field_completeness,
        insights.readiness.label()
    );
    if !insights.missing_document_kinds.is_empty() {
        println!(
            "- Missing documents: {}",
            insights.missing_document_kinds.join(", ")
        );
    }
    for note in &insights.observations {
        println!("- {note}");
    }

    Ok(())
}

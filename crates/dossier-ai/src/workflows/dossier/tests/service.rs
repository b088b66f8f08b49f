use super::common::*;
use crate::workflows::dossier::domain::{
    ApplicantCategory, ApplicationId, ApplicationStatus, ArtifactKind, ExtractionOutcome,
    SourceDocumentKind,
};
use crate::workflows::dossier::service::PacketServiceError;

#[test]
fn create_assigns_sequential_draft_applications() {
    let (service, _repository, _client) = build_service();
    let first = service
        .create_application(ApplicantCategory::Salaried)
        .expect("create");
    let second = service
        .create_application(ApplicantCategory::Student)
        .expect("create");

    assert_ne!(first.id, second.id);
    assert_eq!(first.status, ApplicationStatus::Draft);
    assert!(first.id.0.starts_with("app-"));
}

#[test]
fn upload_requires_text_and_advances_status() {
    let (service, _repository, _client) = build_service();
    let application = service
        .create_application(ApplicantCategory::Salaried)
        .expect("create");

    let error = service
        .upload_document(&application.id, SourceDocumentKind::Passport, "  ".to_string())
        .expect_err("blank upload rejected");
    assert!(matches!(error, PacketServiceError::EmptyDocument));

    service
        .upload_document(
            &application.id,
            SourceDocumentKind::Passport,
            "REPUBLIC OF INDONESIA PASSPORT C1042788".to_string(),
        )
        .expect("upload accepted");
    let application = service.application(&application.id).expect("reload");
    assert_eq!(application.status, ApplicationStatus::DocumentsUploaded);
}

#[test]
fn unknown_application_is_not_found() {
    let (service, _repository, _client) = build_service();
    let missing = ApplicationId("app-999999".to_string());
    let error = service.application(&missing).expect_err("missing");
    assert!(matches!(error, PacketServiceError::ApplicationNotFound(_)));
}

#[tokio::test]
async fn analyze_appends_one_record_per_document() {
    let (service, _repository, client) = build_service();
    let application = service
        .create_application(ApplicantCategory::Salaried)
        .expect("create");

    service
        .upload_document(
            &application.id,
            SourceDocumentKind::Passport,
            "REPUBLIC OF INDONESIA PASSPORT C1042788 NUGRAHA ARIF".to_string(),
        )
        .expect("upload passport");
    service
        .upload_document(&application.id, SourceDocumentKind::PayStub, "short".to_string())
        .expect("upload stub");

    client.push_response(
        r#"{"full_name": "Arif Nugraha", "passport_number": "C1042788",
            "birth_date": "1991-04-17", "nationality": "Indonesian",
            "passport_issue_date": "2021-02-01", "passport_expiry_date": "2031-02-01"}"#,
    );

    let records = service.analyze(&application.id).await.expect("analyze");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].outcome, ExtractionOutcome::Extracted);
    // Five characters of pay stub text is below the extraction gate.
    assert_eq!(records[1].outcome, ExtractionOutcome::InsufficientInput);

    let application = service.application(&application.id).expect("reload");
    assert_eq!(application.status, ApplicationStatus::Analyzing);
}

#[test]
fn record_answer_rejects_blank_keys() {
    let (service, _repository, _client) = build_service();
    let application = service
        .create_application(ApplicantCategory::Salaried)
        .expect("create");

    let error = service
        .record_answer(&application.id, "  ", scalar("value"))
        .expect_err("blank key rejected");
    assert!(matches!(error, PacketServiceError::EmptyAnswerKey));
}

#[test]
fn answers_overwrite_per_key() {
    let (service, repository, _client) = build_service();
    let application = service
        .create_application(ApplicantCategory::Salaried)
        .expect("create");

    service
        .record_answer(&application.id, "phone", scalar("+62 812 1111 1111"))
        .expect("first write");
    service
        .record_answer(&application.id, "phone", scalar("+62 812 2222 2222"))
        .expect("second write");

    let answers = repository.stored_answers(&application.id);
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].value, scalar("+62 812 2222 2222"));
}

#[test]
fn artifact_lookup_before_generation_is_not_found() {
    let (service, _repository, _client) = build_service();
    let application = service
        .create_application(ApplicantCategory::Salaried)
        .expect("create");

    let error = service
        .artifact(&application.id, ArtifactKind::CoverLetter)
        .expect_err("nothing generated yet");
    assert!(matches!(error, PacketServiceError::ArtifactNotFound { .. }));
}

#[test]
fn cancel_without_active_run_reports_false() {
    let (service, _repository, _client) = build_service();
    let application = service
        .create_application(ApplicantCategory::Salaried)
        .expect("create");
    assert!(!service.cancel_generation(&application.id));
}

#[tokio::test]
async fn insights_reflect_generation_progress() {
    let (service, _repository, _client) = build_service();
    let application = service
        .create_application(ApplicantCategory::Salaried)
        .expect("create");

    let before = service.insights(&application.id).expect("insights");
    assert_eq!(before.status, ApplicationStatus::Draft);
    assert_eq!(before.document_completeness, 0);

    service
        .generate(&application.id, Vec::new())
        .await
        .expect("generation run");

    let after = service.insights(&application.id).expect("insights");
    assert_eq!(after.status, ApplicationStatus::Completed);
    // Synthesis persisted answers for every scalar, so the resolved view is full.
    assert_eq!(after.field_completeness, 100);
    assert!(after.unresolved_fields.is_empty());
}

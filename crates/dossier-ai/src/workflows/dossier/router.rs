use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    AnswerValue, ApplicantCategory, ApplicationId, ArtifactKind, SourceDocumentKind,
};
use super::rendering::ArtifactRenderer;
use super::repository::{PacketRepository, RepositoryError};
use super::service::{PacketService, PacketServiceError};
use crate::workflows::genai::GenerativeClient;

/// Router builder exposing the packet pipeline endpoints.
pub fn packet_router<R, G, A>(service: Arc<PacketService<R, G, A>>) -> Router
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    Router::new()
        .route("/api/v1/packet/applications", post(create_handler::<R, G, A>))
        .route(
            "/api/v1/packet/applications/:application_id",
            get(application_handler::<R, G, A>),
        )
        .route(
            "/api/v1/packet/applications/:application_id/documents",
            post(upload_handler::<R, G, A>),
        )
        .route(
            "/api/v1/packet/applications/:application_id/analyze",
            post(analyze_handler::<R, G, A>),
        )
        .route(
            "/api/v1/packet/applications/:application_id/answers",
            put(answer_handler::<R, G, A>),
        )
        .route(
            "/api/v1/packet/applications/:application_id/fields",
            get(fields_handler::<R, G, A>),
        )
        .route(
            "/api/v1/packet/applications/:application_id/generate",
            post(generate_handler::<R, G, A>),
        )
        .route(
            "/api/v1/packet/applications/:application_id/generate/cancel",
            post(cancel_handler::<R, G, A>),
        )
        .route(
            "/api/v1/packet/applications/:application_id/artifacts",
            get(artifacts_handler::<R, G, A>),
        )
        .route(
            "/api/v1/packet/applications/:application_id/artifacts/:kind",
            get(artifact_handler::<R, G, A>),
        )
        .route(
            "/api/v1/packet/applications/:application_id/status",
            get(status_handler::<R, G, A>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateApplicationRequest {
    category: ApplicantCategory,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadDocumentRequest {
    kind: SourceDocumentKind,
    raw_text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerRequest {
    key: String,
    value: AnswerValue,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct GenerateRequest {
    #[serde(default)]
    kinds: Vec<String>,
}

fn error_response(error: PacketServiceError) -> Response {
    let status = match &error {
        PacketServiceError::ApplicationNotFound(_)
        | PacketServiceError::ArtifactNotFound { .. } => StatusCode::NOT_FOUND,
        PacketServiceError::EmptyDocument | PacketServiceError::EmptyAnswerKey => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PacketServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn unknown_kind_response(kind: &str) -> Response {
    let payload = json!({ "error": format!("unknown artifact kind '{kind}'") });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

pub(crate) async fn create_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    axum::Json(request): axum::Json<CreateApplicationRequest>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    match service.create_application(request.category) {
        Ok(application) => (StatusCode::CREATED, axum::Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    match service.application(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn upload_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<UploadDocumentRequest>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    let id = ApplicationId(application_id);
    match service.upload_document(&id, request.kind, request.raw_text) {
        Ok(document) => (StatusCode::ACCEPTED, axum::Json(document)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn analyze_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    let id = ApplicationId(application_id);
    match service.analyze(&id).await {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn answer_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    let id = ApplicationId(application_id);
    match service.record_answer(&id, &request.key, request.value) {
        Ok(answer) => (StatusCode::OK, axum::Json(answer)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fields_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    let id = ApplicationId(application_id);
    match service.resolved_fields(&id) {
        Ok(fields) => (StatusCode::OK, axum::Json(fields)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn generate_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<GenerateRequest>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    let mut kinds = Vec::with_capacity(request.kinds.len());
    for label in &request.kinds {
        match ArtifactKind::from_label(label) {
            Some(kind) => kinds.push(kind),
            None => return unknown_kind_response(label),
        }
    }

    let id = ApplicationId(application_id);
    match service.generate(&id, kinds).await {
        Ok(artifacts) => (StatusCode::OK, axum::Json(artifacts)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    let id = ApplicationId(application_id);
    let cancelled = service.cancel_generation(&id);
    let payload = json!({ "application_id": id.0, "cancelled": cancelled });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn artifacts_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    let id = ApplicationId(application_id);
    match service.artifacts(&id) {
        Ok(artifacts) => (StatusCode::OK, axum::Json(artifacts)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn artifact_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    Path((application_id, kind)): Path<(String, String)>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    let Some(kind) = ArtifactKind::from_label(&kind) else {
        return unknown_kind_response(&kind);
    };
    let id = ApplicationId(application_id);
    match service.artifact(&id, kind) {
        Ok(artifact) => (StatusCode::OK, axum::Json(artifact)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, G, A>(
    State(service): State<Arc<PacketService<R, G, A>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: PacketRepository + 'static,
    G: GenerativeClient + 'static,
    A: ArtifactRenderer + 'static,
{
    let id = ApplicationId(application_id);
    match service.insights(&id) {
        Ok(insights) => (StatusCode::OK, axum::Json(insights)).into_response(),
        Err(error) => error_response(error),
    }
}

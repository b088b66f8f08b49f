use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryPacketRepository};
use crate::routes::with_packet_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dossier_ai::config::AppConfig;
use dossier_ai::error::AppError;
use dossier_ai::telemetry;
use dossier_ai::workflows::dossier::PacketService;
use dossier_ai::workflows::genai::HttpGenerativeClient;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryPacketRepository::default());
    let client = Arc::new(HttpGenerativeClient::new(&config.genai));
    let packet_service = Arc::new(PacketService::new(
        repository,
        client,
        &config.genai.model,
        &config.pipeline,
    ));

    let app = with_packet_routes(packet_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "packet assembly service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

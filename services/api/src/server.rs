use crate::cli::ServeArgs;
use crate::infra::{AppContext, AppState, InMemoryApplicationRepository};
use crate::routes::{router, with_operational_routes};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use onboard::config::AppConfig;
use onboard::error::AppError;
use onboard::telemetry;
use onboard::workflows::intake::FsDocumentStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
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

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let documents = Arc::new(FsDocumentStore::create(&config.storage.upload_dir)?);
    let ctx = Arc::new(AppContext::new(
        repository,
        documents,
        config.admin.clone(),
        config.storage.upload_dir.clone(),
    ));

    let app = with_operational_routes(router(ctx))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "business onboarding intake ready");

    axum::serve(listener, app).await?;
    Ok(())
}

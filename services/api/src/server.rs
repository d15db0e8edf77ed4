use crate::cli::ServeArgs;
use crate::infra::{build_service, seed_accounts, AppState};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use volunteer_match::config::AppConfig;
use volunteer_match::error::AppError;
use volunteer_match::telemetry;
use volunteer_match::workflows::matching::{InMemoryMatchingStore, MatchingServiceError};

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

    let store = Arc::new(InMemoryMatchingStore::new());
    let accounts = seed_accounts(&store, Utc::now()).map_err(MatchingServiceError::from)?;
    let matching_service = Arc::new(build_service(&config.matching, store));

    let app = with_matching_routes(matching_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        accounts = accounts.len(),
        "volunteer matching service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

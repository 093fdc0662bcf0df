use crate::cli::ServeArgs;
use crate::infra::{
    sample_trades, AppState, InMemoryJobRepository, InMemoryTradeRepository,
    LoggingNotificationSender,
};
use crate::routes::with_job_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tradesos::config::{AppConfig, AppEnvironment};
use tradesos::error::AppError;
use tradesos::telemetry;
use tradesos::workflows::jobs::JobMatchingService;
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

    let trades = if config.environment == AppEnvironment::Production {
        InMemoryTradeRepository::default()
    } else {
        InMemoryTradeRepository::with_trades(sample_trades())
    };
    let sender = LoggingNotificationSender::new(config.matching.base_url.clone());
    let job_service = Arc::new(JobMatchingService::new(
        Arc::new(InMemoryJobRepository::default()),
        Arc::new(trades),
        Arc::new(sender),
        config.matching.clone(),
    ));

    let app = with_job_routes(job_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        premium_first_access_secs = config.matching.premium_first_access.as_secs(),
        radius_filter = config.matching.radius_filter,
        "job matching service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

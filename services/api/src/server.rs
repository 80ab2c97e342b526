use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryFeedbackRepository};
use crate::routes::with_feedback_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use brewscore::config::AppConfig;
use brewscore::error::AppError;
use brewscore::feedback::FeedbackScoringService;
use brewscore::telemetry;
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

    let rubric = Arc::new(config.scoring.load_rubric()?);
    info!(
        version = rubric.version(),
        fingerprint = rubric.fingerprint(),
        max_total = rubric.max_total(),
        "rubric loaded"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryFeedbackRepository::default());
    let feedback_service = Arc::new(FeedbackScoringService::with_options(
        repository,
        rubric,
        config.scoring.summary_options(),
    ));

    let app = with_feedback_routes(feedback_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "brewery feedback scorer ready");

    axum::serve(listener, app).await?;
    Ok(())
}

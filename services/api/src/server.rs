use crate::cli::ServeArgs;
use crate::infra::{AppState, Services};
use crate::routes::recruitment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use recruit_ai::config::AppConfig;
use recruit_ai::error::{run_blocking, AppError};
use recruit_ai::telemetry;
use recruit_ai::workflows::engagement::{MonitorSettings, TickOptions};
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

    let services = {
        let config = config.clone();
        run_blocking(move || Services::from_config(&config)).await?
    };
    let monitor = MonitorSettings {
        interval: config.monitor.tick_interval,
        max_ticks: config.monitor.max_ticks,
        options: TickOptions::default(),
    };

    let app = recruitment_routes(&services, monitor)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        smtp = config.mail.is_some(),
        drive_sheet = config.storage.drive.is_some(),
        authoring = services.engagement.has_author(),
        "recruitment orchestrator ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::monitor::{run_monitor, MonitorSettings, MonitorSwitch};
use super::notify::{Mailer, ReplyProbe};
use super::service::{EngagementService, TickOptions};
use crate::error::{run_blocking, AppError};
use crate::workflows::pipeline::CandidateStore;

/// Shared state for the engagement routes: the service plus the periodic monitor toggle.
pub struct EngagementApi<S, M, P> {
    pub service: Arc<EngagementService<S, M, P>>,
    pub switch: MonitorSwitch,
    pub settings: MonitorSettings,
}

/// Router builder for notice-period engagement and the periodic monitor.
pub fn engagement_router<S, M, P>(api: Arc<EngagementApi<S, M, P>>) -> Router
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    Router::new()
        .route(
            "/api/v1/engagement/candidates",
            get(notice_period_handler::<S, M, P>),
        )
        .route("/api/v1/engagement/contact", post(contact_handler::<S, M, P>))
        .route("/api/v1/engagement/tick", post(tick_handler::<S, M, P>))
        .route(
            "/api/v1/engagement/tracking/reset",
            post(reset_tracking_handler::<S, M, P>),
        )
        .route(
            "/api/v1/engagement/monitor",
            get(monitor_status_handler::<S, M, P>).post(monitor_handler::<S, M, P>),
        )
        .route("/api/v1/engagement/:email", get(overview_handler::<S, M, P>))
        .route(
            "/api/v1/engagement/:email/send",
            post(send_handler::<S, M, P>),
        )
        .route(
            "/api/v1/engagement/:email/reply",
            get(reply_handler::<S, M, P>),
        )
        .with_state(api)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DaysQuery {
    #[serde(default)]
    days: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendRequest {
    #[serde(default)]
    days: u32,
    #[serde(default)]
    use_ai: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplyQuery {
    window_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MonitorRequest {
    enabled: bool,
    #[serde(default)]
    alerts_paused: bool,
}

pub(crate) async fn notice_period_handler<S, M, P>(
    State(api): State<Arc<EngagementApi<S, M, P>>>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    let service = Arc::clone(&api.service);
    let candidates = run_blocking(move || service.notice_period()).await?;
    Ok(Json(json!({ "count": candidates.len(), "candidates": candidates })).into_response())
}

pub(crate) async fn overview_handler<S, M, P>(
    State(api): State<Arc<EngagementApi<S, M, P>>>,
    Path(email): Path<String>,
    Query(query): Query<DaysQuery>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    let service = Arc::clone(&api.service);
    let overview = run_blocking(move || service.overview(&email, query.days)).await?;
    Ok(Json(overview).into_response())
}

pub(crate) async fn send_handler<S, M, P>(
    State(api): State<Arc<EngagementApi<S, M, P>>>,
    Path(email): Path<String>,
    Json(request): Json<SendRequest>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    let service = Arc::clone(&api.service);
    let composed =
        run_blocking(move || service.send_engagement(&email, request.days, request.use_ai))
            .await?;
    Ok(Json(composed).into_response())
}

pub(crate) async fn reply_handler<S, M, P>(
    State(api): State<Arc<EngagementApi<S, M, P>>>,
    Path(email): Path<String>,
    Query(query): Query<ReplyQuery>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    let service = Arc::clone(&api.service);
    let check = run_blocking(move || service.check_reply(&email, query.window_minutes)).await?;
    Ok(Json(check).into_response())
}

pub(crate) async fn contact_handler<S, M, P>(
    State(api): State<Arc<EngagementApi<S, M, P>>>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    let service = Arc::clone(&api.service);
    let report = run_blocking(move || service.contact_pending()).await?;
    Ok(Json(report).into_response())
}

pub(crate) async fn tick_handler<S, M, P>(
    State(api): State<Arc<EngagementApi<S, M, P>>>,
    options: Option<Json<TickOptions>>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    let options = options.map(|Json(options)| options).unwrap_or_default();
    let service = Arc::clone(&api.service);
    let report = run_blocking(move || service.tick(options)).await?;
    Ok(Json(report).into_response())
}

pub(crate) async fn reset_tracking_handler<S, M, P>(
    State(api): State<Arc<EngagementApi<S, M, P>>>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    let service = Arc::clone(&api.service);
    let report = run_blocking(move || service.reset_tracking()).await?;
    Ok(Json(report).into_response())
}

pub(crate) async fn monitor_status_handler<S, M, P>(
    State(api): State<Arc<EngagementApi<S, M, P>>>,
) -> Response
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    Json(json!({
        "enabled": api.switch.is_enabled(),
        "interval_secs": api.settings.interval.as_secs(),
        "max_ticks": api.settings.max_ticks,
    }))
    .into_response()
}

/// Turning the monitor on spawns the tick loop unless one is already running.
/// Turning it off stops the loop after the tick in progress.
pub(crate) async fn monitor_handler<S, M, P>(
    State(api): State<Arc<EngagementApi<S, M, P>>>,
    Json(request): Json<MonitorRequest>,
) -> Response
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    if !request.enabled {
        api.switch.disable();
        return Json(json!({ "enabled": false })).into_response();
    }

    let Some(lease) = api.switch.enable() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "enabled": true, "error": "monitor already running" })),
        )
            .into_response();
    };

    let mut settings = api.settings;
    settings.options.alerts_paused = request.alerts_paused;
    tokio::spawn(run_monitor(Arc::clone(&api.service), settings, lease));

    (StatusCode::ACCEPTED, Json(json!({ "enabled": true }))).into_response()
}

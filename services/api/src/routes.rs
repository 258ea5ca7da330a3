use crate::infra::{AppState, InboundReply, InboxReplyProbe, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use recruit_ai::error::AppError;
use recruit_ai::workflows::engagement::{
    engagement_router, EngagementApi, MonitorSettings, MonitorSwitch,
};
use recruit_ai::workflows::pipeline::pipeline_router;
use recruit_ai::workflows::scheduling::scheduling_router;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn recruitment_routes(services: &Services, monitor: MonitorSettings) -> Router {
    let engagement = Arc::new(EngagementApi {
        service: Arc::clone(&services.engagement),
        switch: MonitorSwitch::default(),
        settings: monitor,
    });

    pipeline_router(Arc::clone(&services.pipeline))
        .merge(scheduling_router(Arc::clone(&services.scheduler)))
        .merge(engagement_router(engagement))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/engagement/replies", post(reply_webhook))
        .layer(Extension(services.inbox.clone()))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Inbound-mail hook: records that a candidate replied so the next tick sees it.
pub(crate) async fn reply_webhook(
    Extension(inbox): Extension<InboxReplyProbe>,
    Json(reply): Json<InboundReply>,
) -> Result<impl IntoResponse, AppError> {
    let from = reply.from.trim();
    if !from.contains('@') {
        return Err(AppError::BadRequest(format!(
            "'{from}' is not an email address"
        )));
    }

    let received_at = reply.received_at.unwrap_or_else(Utc::now);
    inbox.record_reply(from, received_at);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "recorded": from, "received_at": received_at })),
    ))
}

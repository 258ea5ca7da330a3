use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::service::InterviewScheduler;
use crate::error::{run_blocking, AppError};
use crate::workflows::pipeline::{CandidateStore, Round};

/// Router builder for interview auto-scheduling and the per-day agenda.
pub fn scheduling_router<S>(scheduler: Arc<InterviewScheduler<S>>) -> Router
where
    S: CandidateStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/interviews/:round/schedule",
            post(schedule_handler::<S>),
        )
        .route(
            "/api/v1/interviews/:round/preview",
            post(preview_handler::<S>),
        )
        .route("/api/v1/interviews/:round/agenda", get(agenda_handler::<S>))
        .with_state(scheduler)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleRequest {
    start_date: NaiveDate,
    #[serde(default)]
    start_time_slot: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AgendaQuery {
    date: NaiveDate,
}

fn parse_round(raw: &str) -> Result<Round, AppError> {
    raw.parse::<Round>().map_err(AppError::BadRequest)
}

pub(crate) async fn schedule_handler<S>(
    State(scheduler): State<Arc<InterviewScheduler<S>>>,
    Path(round): Path<String>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let round = parse_round(&round)?;
    let report = run_blocking(move || {
        scheduler.schedule(
            round,
            request.start_date,
            request.start_time_slot.as_deref(),
        )
    })
    .await?;

    Ok(Json(json!({
        "round": report.round,
        "scheduled_count": report.scheduled_count(),
        "scheduled": report.scheduled,
        "failures": report.failures,
    }))
    .into_response())
}

pub(crate) async fn preview_handler<S>(
    State(scheduler): State<Arc<InterviewScheduler<S>>>,
    Path(round): Path<String>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let round = parse_round(&round)?;
    let plan = run_blocking(move || {
        scheduler.preview(
            round,
            request.start_date,
            request.start_time_slot.as_deref(),
        )
    })
    .await?;
    Ok(Json(json!({ "round": round, "assignments": plan })).into_response())
}

pub(crate) async fn agenda_handler<S>(
    State(scheduler): State<Arc<InterviewScheduler<S>>>,
    Path(round): Path<String>,
    Query(query): Query<AgendaQuery>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let round = parse_round(&round)?;
    let agenda = run_blocking(move || scheduler.day_agenda(round, query.date)).await?;
    Ok(Json(agenda).into_response())
}

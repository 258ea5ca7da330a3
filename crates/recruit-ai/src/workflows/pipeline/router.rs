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

use super::domain::{CandidateStatus, Round};
use super::repository::CandidateStore;
use super::service::{CandidateFilter, NewCandidate, PipelineService};
use crate::error::{run_blocking, AppError};

/// Router builder exposing candidate listing, status edits, results, and demo resets.
pub fn pipeline_router<S>(service: Arc<PipelineService<S>>) -> Router
where
    S: CandidateStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/candidates",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route("/api/v1/candidates/:email", get(get_handler::<S>))
        .route("/api/v1/candidates/:email/status", post(status_handler::<S>))
        .route("/api/v1/candidates/:email/reset", post(reset_one_handler::<S>))
        .route("/api/v1/pipeline/summary", get(summary_handler::<S>))
        .route("/api/v1/pipeline/reset", post(reset_all_handler::<S>))
        .route(
            "/api/v1/interviews/:round/result",
            post(round_result_handler::<S>),
        )
        .route("/api/v1/offers/:email/response", post(offer_handler::<S>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    status: Option<String>,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoundResultRequest {
    email: String,
    passed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OfferResponseRequest {
    accepted: bool,
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let status = query
        .status
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(str::parse::<CandidateStatus>)
        .transpose()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;
    let filter = CandidateFilter {
        status,
        role: query.role,
    };

    let candidates = run_blocking(move || service.list(&filter)).await?;
    Ok(Json(json!({ "count": candidates.len(), "candidates": candidates })).into_response())
}

pub(crate) async fn create_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    Json(new): Json<NewCandidate>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let candidate = run_blocking(move || service.add_candidate(new)).await?;
    Ok((StatusCode::CREATED, Json(candidate)).into_response())
}

pub(crate) async fn get_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    Path(email): Path<String>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let candidate = run_blocking(move || service.get(&email)).await?;
    Ok(Json(candidate).into_response())
}

pub(crate) async fn status_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    Path(email): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let status = request
        .status
        .parse::<CandidateStatus>()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;
    let candidate = run_blocking(move || service.update_status(&email, status)).await?;
    Ok(Json(candidate).into_response())
}

pub(crate) async fn reset_one_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    Path(email): Path<String>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let candidate = run_blocking(move || service.reset_candidate(&email)).await?;
    Ok(Json(candidate).into_response())
}

pub(crate) async fn summary_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let summary = run_blocking(move || service.summary()).await?;
    Ok(Json(summary).into_response())
}

pub(crate) async fn reset_all_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let report = run_blocking(move || service.reset_all()).await?;
    Ok(Json(report).into_response())
}

pub(crate) async fn round_result_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    Path(round): Path<String>,
    Json(request): Json<RoundResultRequest>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let round = round.parse::<Round>().map_err(AppError::BadRequest)?;
    let outcome =
        run_blocking(move || service.record_round_result(round, &request.email, request.passed))
            .await?;
    Ok(Json(outcome).into_response())
}

pub(crate) async fn offer_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    Path(email): Path<String>,
    Json(request): Json<OfferResponseRequest>,
) -> Result<Response, AppError>
where
    S: CandidateStore + 'static,
{
    let candidate =
        run_blocking(move || service.record_offer_response(&email, request.accepted)).await?;
    Ok(Json(candidate).into_response())
}

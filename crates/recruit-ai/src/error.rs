use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::engagement::{EngagementError, NotifyError};
use crate::workflows::pipeline::{PipelineError, StoreError};
use crate::workflows::scheduling::SchedulingError;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Task(tokio::task::JoinError),
    Pipeline(PipelineError),
    Scheduling(SchedulingError),
    Engagement(EngagementError),
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Pipeline(PipelineError::Store(err))
            | AppError::Scheduling(SchedulingError::Store(err))
            | AppError::Engagement(EngagementError::Store(err)) => store_status(err),
            AppError::Pipeline(PipelineError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            AppError::Pipeline(PipelineError::InvalidInput(_))
            | AppError::Scheduling(SchedulingError::InvalidSlot(_))
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Engagement(EngagementError::NotInNoticePeriod(_)) => StatusCode::CONFLICT,
            AppError::Engagement(EngagementError::Notify(NotifyError::InvalidAddress(_))) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Engagement(EngagementError::Notify(_)) => StatusCode::BAD_GATEWAY,
            AppError::Scheduling(SchedulingError::CalendarExhausted)
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        StoreError::Malformed(_) | StoreError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Task(err) => write!(f, "background task failed: {}", err),
            AppError::Pipeline(err) => write!(f, "{}", err),
            AppError::Scheduling(err) => write!(f, "{}", err),
            AppError::Engagement(err) => write!(f, "{}", err),
            AppError::BadRequest(message) => write!(f, "bad request: {}", message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Task(err) => Some(err),
            AppError::Pipeline(err) => Some(err),
            AppError::Scheduling(err) => Some(err),
            AppError::Engagement(err) => Some(err),
            AppError::BadRequest(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Task(value)
    }
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl From<SchedulingError> for AppError {
    fn from(value: SchedulingError) -> Self {
        Self::Scheduling(value)
    }
}

impl From<EngagementError> for AppError {
    fn from(value: EngagementError) -> Self {
        Self::Engagement(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Pipeline(PipelineError::Store(value))
    }
}

/// Run a synchronous workflow call off the async executor. Store writes are paced and
/// mail or HTTP collaborators block.
pub async fn run_blocking<T, E, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?.map_err(Into::into)
}

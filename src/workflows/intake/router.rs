use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{EngagementSignal, Submission};
use super::repository::WorkspaceStore;
use super::service::IntakeService;

/// Router builder exposing HTTP endpoints for routing, batch triage, and
/// ad-hoc scoring.
pub fn intake_router<S>(service: Arc<IntakeService<S>>) -> Router
where
    S: WorkspaceStore + 'static,
{
    Router::new()
        .route("/health", get(healthcheck))
        .route("/api/v1/intake/route", post(route_handler::<S>))
        .route("/api/v1/intake/process", post(process_handler::<S>))
        .route("/api/v1/leads/score", post(score_handler::<S>))
        .with_state(service)
}

async fn healthcheck() -> axum::Json<serde_json::Value> {
    axum::Json(json!({ "status": "ok" }))
}

pub(crate) async fn route_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    axum::Json(submission): axum::Json<Submission>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    let result = service.route_submission(&submission);
    (StatusCode::OK, axum::Json(result)).into_response()
}

pub(crate) async fn process_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.process_new_submissions() {
        Ok(results) => (StatusCode::OK, axum::Json(results)).into_response(),
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    pub contact_id: String,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub signals: Vec<EngagementSignal>,
    #[serde(default)]
    pub reference_time: Option<DateTime<Utc>>,
}

pub(crate) async fn score_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    axum::Json(request): axum::Json<ScoreRequest>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    let score = service.score_signals(
        &request.contact_id,
        &request.signals,
        request.org_id.as_deref(),
        request.reference_time,
    );
    (StatusCode::OK, axum::Json(score)).into_response()
}

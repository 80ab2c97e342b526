use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::repository::{FeedbackRepository, RepositoryError};
use super::rubric::{Category, RubricDocument};
use super::scoring::{RatingDiagnostic, ScoringError};
use super::service::{FeedbackScoringService, FeedbackServiceError, ScoringReport};
use super::submission::{BatchId, FeedbackId};

/// Router builder exposing intake, trigger replay and dashboard endpoints.
pub fn feedback_router<R>(service: Arc<FeedbackScoringService<R>>) -> Router
where
    R: FeedbackRepository + 'static,
{
    Router::new()
        .route("/api/v1/feedback", post(submit_handler::<R>))
        .route("/api/v1/feedback/:feedback_id", get(status_handler::<R>))
        .route(
            "/api/v1/feedback/:feedback_id/score",
            post(rescore_handler::<R>),
        )
        .route("/api/v1/rubric", get(rubric_handler::<R>))
        .route(
            "/api/v1/batches/:batch_id/summary",
            get(batch_summary_handler::<R>),
        )
        .route(
            "/api/v1/batches/:batch_id/scores.csv",
            get(batch_export_handler::<R>),
        )
        .with_state(service)
}

/// Score view returned after a trigger run.
#[derive(Debug, Serialize)]
pub struct FeedbackScoreView {
    pub feedback_id: FeedbackId,
    pub status: &'static str,
    pub calculated_score: f64,
    pub scaled_category_scores: BTreeMap<Category, f64>,
    pub rubric_skew: bool,
    pub diagnostics: Vec<RatingDiagnostic>,
}

impl From<ScoringReport> for FeedbackScoreView {
    fn from(report: ScoringReport) -> Self {
        Self {
            feedback_id: report.feedback_id,
            status: report.write_back.score_calculation_status.label(),
            calculated_score: report.write_back.calculated_score,
            scaled_category_scores: report.write_back.scaled_category_scores,
            rubric_skew: report.rubric_skew,
            diagnostics: report.result.diagnostics,
        }
    }
}

#[derive(Debug, Serialize)]
struct RubricView<'a> {
    version: &'a str,
    fingerprint: &'a str,
    max_total: u32,
    rubric: &'a RubricDocument,
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<FeedbackScoringService<R>>>,
    axum::Json(document): axum::Json<Value>,
) -> Response
where
    R: FeedbackRepository + 'static,
{
    let record = match service.submit(&document) {
        Ok(record) => record,
        Err(FeedbackServiceError::Submission(error)) => {
            let payload = json!({ "error": error.to_string() });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
        Err(FeedbackServiceError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({ "error": "feedback already exists" });
            return (StatusCode::CONFLICT, axum::Json(payload)).into_response();
        }
        Err(other) => return internal_error(other),
    };

    match service.handle_created(&record.id) {
        Ok(report) => {
            let view = FeedbackScoreView::from(report);
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(FeedbackServiceError::Scoring(error @ ScoringError::MissingRatings)) => {
            let payload = json!({
                "feedback_id": record.id.0,
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn rescore_handler<R>(
    State(service): State<Arc<FeedbackScoringService<R>>>,
    Path(feedback_id): Path<String>,
) -> Response
where
    R: FeedbackRepository + 'static,
{
    let id = FeedbackId(feedback_id);
    match service.handle_created(&id) {
        Ok(report) => {
            let view = FeedbackScoreView::from(report);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(FeedbackServiceError::Repository(RepositoryError::NotFound)) => not_found(&id),
        Err(FeedbackServiceError::Scoring(error)) => {
            let payload = json!({
                "feedback_id": id.0,
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<FeedbackScoringService<R>>>,
    Path(feedback_id): Path<String>,
) -> Response
where
    R: FeedbackRepository + 'static,
{
    let id = FeedbackId(feedback_id);
    match service.get(&id) {
        Ok(record) => {
            let view = record.status_view();
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(FeedbackServiceError::Repository(RepositoryError::NotFound)) => not_found(&id),
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn rubric_handler<R>(
    State(service): State<Arc<FeedbackScoringService<R>>>,
) -> Response
where
    R: FeedbackRepository + 'static,
{
    let rubric = service.rubric();
    let view = RubricView {
        version: rubric.version(),
        fingerprint: rubric.fingerprint(),
        max_total: rubric.max_total(),
        rubric: rubric.document(),
    };
    (StatusCode::OK, axum::Json(view)).into_response()
}

pub(crate) async fn batch_summary_handler<R>(
    State(service): State<Arc<FeedbackScoringService<R>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    R: FeedbackRepository + 'static,
{
    match service.batch_summary(&BatchId(batch_id)) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn batch_export_handler<R>(
    State(service): State<Arc<FeedbackScoringService<R>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    R: FeedbackRepository + 'static,
{
    match service.export_batch_csv(&BatchId(batch_id)) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(other) => internal_error(other),
    }
}

fn not_found(id: &FeedbackId) -> Response {
    let payload = json!({
        "feedback_id": id.0,
        "error": "feedback not found",
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn internal_error(error: FeedbackServiceError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}

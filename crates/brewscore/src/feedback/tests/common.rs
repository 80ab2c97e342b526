use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use crate::feedback::repository::{
    FeedbackRecord, FeedbackRepository, RepositoryError, ScoreWriteBack,
};
use crate::feedback::rubric::Rubric;
use crate::feedback::submission::{
    BatchId, FeedbackId, FeedbackSubmission, OverallEnjoyment, RatingEntry,
};
use crate::feedback::{feedback_router, FeedbackScoringService, SummaryOptions};

pub(super) fn rubric() -> Rubric {
    Rubric::reference().expect("reference rubric loads")
}

pub(super) fn shared_rubric() -> Arc<Rubric> {
    Arc::new(rubric())
}

pub(super) fn submission_with(
    ratings: Vec<RatingEntry>,
    overall_enjoyment: OverallEnjoyment,
) -> FeedbackSubmission {
    FeedbackSubmission {
        batch_id: BatchId("batch-hazy-ipa".to_string()),
        brewery_id: Some("brewery-north-fork".to_string()),
        ratings: Some(ratings),
        overall_enjoyment,
        comment: None,
        submitted_at: None,
        rubric_fingerprint: None,
        flavor_selections: Default::default(),
    }
}

/// Every rubric metric answered with its top label.
pub(super) fn top_marks(rubric: &Rubric) -> Vec<RatingEntry> {
    rubric
        .metrics()
        .iter()
        .map(|metric| {
            RatingEntry::standard(
                metric.category.label(),
                &metric.id,
                &metric.scale_labels[4],
            )
        })
        .collect()
}

pub(super) fn feedback_document(batch: &str) -> Value {
    json!({
        "batchId": batch,
        "breweryId": "brewery-north-fork",
        "ratings": [
            {"category": "appearance", "metricValue": "clarity", "selectedAnswer": "Crystal Clear"},
            {"category": "aroma", "metricValue": "hop_intensity", "selectedAnswer": "Intense / Pungent"},
            {"questionId": "q-label-art", "ratingValue": 1, "isCustom": true}
        ],
        "overallEnjoyment": 3,
        "comment": "Bright and juicy",
        "timestamp": "2025-06-01T18:30:00Z"
    })
}

pub(super) fn custom_only_document(batch: &str) -> Value {
    json!({
        "batchId": batch,
        "ratings": [
            {"questionId": "q-label-art", "ratingValue": 5, "isCustom": true}
        ]
    })
}

pub(super) fn build_service() -> (
    FeedbackScoringService<MemoryRepository>,
    Arc<MemoryRepository>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let service = FeedbackScoringService::new(repository.clone(), shared_rubric());
    (service, repository)
}

pub(super) fn build_service_with(
    options: SummaryOptions,
) -> (
    FeedbackScoringService<MemoryRepository>,
    Arc<MemoryRepository>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let service =
        FeedbackScoringService::with_options(repository.clone(), shared_rubric(), options);
    (service, repository)
}

pub(super) fn scored_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<FeedbackId, FeedbackRecord>>>,
    pub(super) writes: Arc<Mutex<usize>>,
}

impl MemoryRepository {
    pub(super) fn write_count(&self) -> usize {
        *self.writes.lock().expect("write counter poisoned")
    }
}

impl FeedbackRepository for MemoryRepository {
    fn insert(&self, record: FeedbackRecord) -> Result<FeedbackRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &FeedbackId) -> Result<Option<FeedbackRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn write_score(&self, id: &FeedbackId, score: ScoreWriteBack) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.score = Some(score);
        *self.writes.lock().expect("write counter poisoned") += 1;
        Ok(())
    }

    fn for_batch(&self, batch_id: &BatchId) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<FeedbackRecord> = guard
            .values()
            .filter(|record| &record.submission.batch_id == batch_id)
            .cloned()
            .collect();
        records.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(records)
    }
}

/// Accepts inserts and reads but refuses score write-backs.
#[derive(Default, Clone)]
pub(super) struct ReadOnlyScoresRepository {
    pub(super) inner: MemoryRepository,
}

impl FeedbackRepository for ReadOnlyScoresRepository {
    fn insert(&self, record: FeedbackRecord) -> Result<FeedbackRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: &FeedbackId) -> Result<Option<FeedbackRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn write_score(&self, _id: &FeedbackId, _score: ScoreWriteBack) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }

    fn for_batch(&self, batch_id: &BatchId) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        self.inner.for_batch(batch_id)
    }
}

pub(super) struct ConflictRepository;

impl FeedbackRepository for ConflictRepository {
    fn insert(&self, _record: FeedbackRecord) -> Result<FeedbackRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _id: &FeedbackId) -> Result<Option<FeedbackRecord>, RepositoryError> {
        Ok(None)
    }

    fn write_score(&self, _id: &FeedbackId, _score: ScoreWriteBack) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn for_batch(&self, _batch_id: &BatchId) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl FeedbackRepository for UnavailableRepository {
    fn insert(&self, _record: FeedbackRecord) -> Result<FeedbackRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &FeedbackId) -> Result<Option<FeedbackRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn write_score(&self, _id: &FeedbackId, _score: ScoreWriteBack) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_batch(&self, _batch_id: &BatchId) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

pub(super) fn router_with_service(
    service: FeedbackScoringService<MemoryRepository>,
) -> axum::Router {
    feedback_router(Arc::new(service))
}

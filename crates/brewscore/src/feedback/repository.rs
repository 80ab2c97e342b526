use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::rubric::Category;
use super::scoring::ScoreResult;
use super::submission::{BatchId, FeedbackId, FeedbackSubmission};

/// Stored feedback document plus the score fields written back by the trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRecord {
    pub id: FeedbackId,
    pub submission: FeedbackSubmission,
    pub score: Option<ScoreWriteBack>,
}

impl FeedbackRecord {
    pub fn status_view(&self) -> FeedbackStatusView {
        FeedbackStatusView {
            feedback_id: self.id.clone(),
            batch_id: self.submission.batch_id.clone(),
            status: self
                .score
                .as_ref()
                .map(|score| score.score_calculation_status.label())
                .unwrap_or("pending"),
            calculated_score: self.score.as_ref().map(|score| score.calculated_score),
            scaled_category_scores: self
                .score
                .as_ref()
                .map(|score| score.scaled_category_scores.clone()),
            scored_at: self
                .score
                .as_ref()
                .map(|score| score.score_calculation_timestamp),
        }
    }
}

/// The four fields persisted onto a feedback record after scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWriteBack {
    pub calculated_score: f64,
    pub scaled_category_scores: BTreeMap<Category, f64>,
    pub score_calculation_timestamp: DateTime<Utc>,
    pub score_calculation_status: ScoreCalculationStatus,
}

impl ScoreWriteBack {
    pub fn from_result(result: &ScoreResult, scored_at: DateTime<Utc>) -> Self {
        Self {
            calculated_score: result.calculated_score,
            scaled_category_scores: result.scaled_category_scores.clone(),
            score_calculation_timestamp: scored_at,
            score_calculation_status: ScoreCalculationStatus::Success,
        }
    }

    /// Whether the stored breakdown reflects any rated answer or enjoyment rating.
    ///
    /// Rubric weights are positive and ranks start at one, so any counted input leaves a
    /// positive category score behind.
    pub fn has_signal(&self) -> bool {
        self.scaled_category_scores.values().any(|points| *points > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCalculationStatus {
    Success,
}

impl ScoreCalculationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreCalculationStatus::Success => "success",
        }
    }
}

/// Storage abstraction over the external document store.
pub trait FeedbackRepository: Send + Sync {
    fn insert(&self, record: FeedbackRecord) -> Result<FeedbackRecord, RepositoryError>;
    fn fetch(&self, id: &FeedbackId) -> Result<Option<FeedbackRecord>, RepositoryError>;
    /// Overwrite the score fields of an existing record. Must never accumulate.
    fn write_score(&self, id: &FeedbackId, score: ScoreWriteBack) -> Result<(), RepositoryError>;
    fn for_batch(&self, batch_id: &BatchId) -> Result<Vec<FeedbackRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Brewery-facing view of a feedback record's score state.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStatusView {
    pub feedback_id: FeedbackId,
    pub batch_id: BatchId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled_category_scores: Option<BTreeMap<Category, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scored_at: Option<DateTime<Utc>>,
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::export::{scores_csv_string, ExportError};
use super::repository::{FeedbackRecord, FeedbackRepository, RepositoryError, ScoreWriteBack};
use super::rubric::Rubric;
use super::scoring::{FeedbackScorer, ScoreResult, ScoringError};
use super::submission::{BatchId, FeedbackId, FeedbackSubmission, SubmissionError};
use super::summary::{summarize_batch, BatchFeedbackSummary, SummaryOptions};

/// Service composing the scorer with the feedback store.
pub struct FeedbackScoringService<R> {
    repository: Arc<R>,
    scorer: FeedbackScorer,
    summary_options: SummaryOptions,
}

static FEEDBACK_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_feedback_id() -> FeedbackId {
    let id = FEEDBACK_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FeedbackId(format!("fb-{id:06}"))
}

impl<R> FeedbackScoringService<R>
where
    R: FeedbackRepository + 'static,
{
    pub fn new(repository: Arc<R>, rubric: Arc<Rubric>) -> Self {
        Self::with_options(repository, rubric, SummaryOptions::default())
    }

    pub fn with_options(
        repository: Arc<R>,
        rubric: Arc<Rubric>,
        summary_options: SummaryOptions,
    ) -> Self {
        Self {
            repository,
            scorer: FeedbackScorer::new(rubric),
            summary_options,
        }
    }

    pub fn rubric(&self) -> &Rubric {
        self.scorer.rubric()
    }

    /// Store a patron's feedback document. Scoring happens in [`Self::handle_created`].
    pub fn submit(&self, document: &Value) -> Result<FeedbackRecord, FeedbackServiceError> {
        let submission = FeedbackSubmission::from_value(document)?;
        let record = FeedbackRecord {
            id: next_feedback_id(),
            submission,
            score: None,
        };

        let stored = self.repository.insert(record)?;
        info!(feedback_id = %stored.id.0, batch_id = %stored.submission.batch_id.0, "feedback stored");
        Ok(stored)
    }

    /// Creation trigger: score the stored record and overwrite its score fields.
    ///
    /// Safe to redeliver. Nothing is written when the record has no ratings sequence,
    /// and a failed write is reported rather than retried.
    pub fn handle_created(
        &self,
        feedback_id: &FeedbackId,
    ) -> Result<ScoringReport, FeedbackServiceError> {
        let record = self
            .repository
            .fetch(feedback_id)?
            .ok_or(RepositoryError::NotFound)?;

        let result = self.scorer.score(&record.submission).map_err(|err| {
            error!(feedback_id = %feedback_id.0, error = %err, "score calculation aborted");
            err
        })?;

        for skipped in result.skipped() {
            warn!(
                feedback_id = %feedback_id.0,
                index = skipped.index,
                metric = ?skipped.metric,
                outcome = skipped.outcome.label(),
                "rating did not contribute to score"
            );
        }

        let rubric_skew = match record.submission.rubric_fingerprint.as_deref() {
            Some(submitted) => {
                let skewed = self.rubric().verify_fingerprint(submitted).is_err();
                if skewed {
                    warn!(
                        feedback_id = %feedback_id.0,
                        submitted,
                        scorer = self.rubric().fingerprint(),
                        "survey form and scorer rubrics differ"
                    );
                }
                skewed
            }
            None => false,
        };

        let write_back = ScoreWriteBack::from_result(&result, Utc::now());
        self.repository
            .write_score(feedback_id, write_back.clone())
            .map_err(|err| {
                error!(feedback_id = %feedback_id.0, error = %err, "failed to write score back");
                err
            })?;

        info!(
            feedback_id = %feedback_id.0,
            calculated_score = result.calculated_score,
            max_total = self.rubric().max_total(),
            "feedback scored"
        );

        Ok(ScoringReport {
            feedback_id: feedback_id.clone(),
            result,
            write_back,
            rubric_skew,
        })
    }

    pub fn get(&self, feedback_id: &FeedbackId) -> Result<FeedbackRecord, FeedbackServiceError> {
        let record = self
            .repository
            .fetch(feedback_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn batch_summary(
        &self,
        batch_id: &BatchId,
    ) -> Result<BatchFeedbackSummary, FeedbackServiceError> {
        let records = self.repository.for_batch(batch_id)?;
        Ok(summarize_batch(
            batch_id,
            &records,
            self.rubric(),
            self.summary_options,
        ))
    }

    pub fn export_batch_csv(&self, batch_id: &BatchId) -> Result<String, FeedbackServiceError> {
        let records = self.repository.for_batch(batch_id)?;
        Ok(scores_csv_string(&records)?)
    }
}

/// Outcome of one trigger invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ScoringReport {
    pub feedback_id: FeedbackId,
    pub result: ScoreResult,
    pub write_back: ScoreWriteBack,
    pub rubric_skew: bool,
}

/// Error raised by the feedback service.
#[derive(Debug, thiserror::Error)]
pub enum FeedbackServiceError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

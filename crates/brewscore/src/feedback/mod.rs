//! Tasting feedback intake, rubric scoring, and brewery-facing aggregation.
//!
//! A submission is scored once per creation trigger against a versioned rubric. The
//! scorer is a pure function; the service owns the fetch and the idempotent write-back.

pub mod export;
pub mod repository;
pub mod router;
pub mod rubric;
pub mod scoring;
pub mod service;
pub mod submission;
pub mod summary;

#[cfg(test)]
mod tests;

pub use export::{scores_csv_string, write_scores_csv, ExportError};
pub use repository::{
    FeedbackRecord, FeedbackRepository, FeedbackStatusView, RepositoryError,
    ScoreCalculationStatus, ScoreWriteBack,
};
pub use router::{feedback_router, FeedbackScoreView};
pub use rubric::{Category, MetricDefinition, Rubric, RubricDocument, RubricError};
pub use scoring::{
    round1, round2, score_submission, FeedbackScorer, RatingDiagnostic, RatingOutcome,
    ScoreResult, ScoringError,
};
pub use service::{FeedbackScoringService, FeedbackServiceError, ScoringReport};
pub use submission::{
    BatchId, CustomRating, FeedbackId, FeedbackSubmission, FlavorSelections, OverallEnjoyment,
    RatingEntry, StandardRating, SubmissionError,
};
pub use summary::{summarize_batch, BatchFeedbackSummary, CommentView, SummaryOptions};

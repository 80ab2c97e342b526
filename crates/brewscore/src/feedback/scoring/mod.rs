mod rounding;
mod rules;

pub use rounding::{round1, round2};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use super::rubric::{Category, Rubric};
use super::submission::{FeedbackSubmission, OverallEnjoyment};
use rules::CategoryTally;

/// Stateless scorer that applies a shared rubric to submissions.
#[derive(Debug, Clone)]
pub struct FeedbackScorer {
    rubric: Arc<Rubric>,
}

impl FeedbackScorer {
    pub fn new(rubric: Arc<Rubric>) -> Self {
        Self { rubric }
    }

    pub fn rubric(&self) -> &Arc<Rubric> {
        &self.rubric
    }

    pub fn score(&self, submission: &FeedbackSubmission) -> Result<ScoreResult, ScoringError> {
        score_submission(&self.rubric, submission)
    }
}

/// Score one submission against the rubric.
///
/// Fails only when the submission carries no ratings sequence. Every other defect
/// (unknown metric, unmatched answer, missing fields, invalid enjoyment) degrades to a
/// diagnostic and a zero contribution.
pub fn score_submission(
    rubric: &Rubric,
    submission: &FeedbackSubmission,
) -> Result<ScoreResult, ScoringError> {
    let ratings = submission
        .ratings
        .as_deref()
        .ok_or(ScoringError::MissingRatings)?;

    let (tallies, diagnostics) = rules::tally_ratings(ratings, rubric);

    let mut scaled_category_scores = BTreeMap::new();
    for category in Category::ALL {
        let weight = f64::from(rubric.weight(category));
        let points = if category.is_rated() {
            tallies
                .get(&category)
                .and_then(CategoryTally::average)
                .map(|average| (average / 5.0) * weight)
                .unwrap_or(0.0)
        } else {
            match &submission.overall_enjoyment {
                OverallEnjoyment::Rated(rating) => (f64::from(*rating) / 5.0) * weight,
                other => {
                    warn!(enjoyment = ?other, "overall enjoyment missing or invalid; scoring 0");
                    0.0
                }
            }
        };
        scaled_category_scores.insert(category, round2(points));
    }

    let calculated_score = round2(scaled_category_scores.values().sum());

    Ok(ScoreResult {
        scaled_category_scores,
        calculated_score,
        overall_enjoyment: submission.overall_enjoyment.clone(),
        diagnostics,
    })
}

/// Category breakdown, total and per-rating trail for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub scaled_category_scores: BTreeMap<Category, f64>,
    pub calculated_score: f64,
    pub overall_enjoyment: OverallEnjoyment,
    pub diagnostics: Vec<RatingDiagnostic>,
}

impl ScoreResult {
    pub fn category_score(&self, category: Category) -> f64 {
        self.scaled_category_scores
            .get(&category)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn scored_rating_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.outcome.is_scored())
            .count()
    }

    /// Whether anything in the submission contributed to the score.
    pub fn has_signal(&self) -> bool {
        self.scored_rating_count() > 0 || self.overall_enjoyment.rating().is_some()
    }

    /// Ratings that did not count, excluding custom questions.
    pub fn skipped(&self) -> impl Iterator<Item = &RatingDiagnostic> {
        self.diagnostics.iter().filter(|diagnostic| {
            !diagnostic.outcome.is_scored() && diagnostic.outcome != RatingOutcome::Custom
        })
    }
}

/// Why a rating did or did not count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingDiagnostic {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    pub outcome: RatingOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RatingOutcome {
    Scored { category: Category, rank: u8 },
    JokeAnswer,
    UnknownMetric,
    UnmatchedAnswer { answer: String },
    Custom,
    Incomplete { missing: Vec<String> },
}

impl RatingOutcome {
    pub fn is_scored(&self) -> bool {
        matches!(self, RatingOutcome::Scored { .. })
    }

    pub const fn label(&self) -> &'static str {
        match self {
            RatingOutcome::Scored { .. } => "scored",
            RatingOutcome::JokeAnswer => "joke_answer",
            RatingOutcome::UnknownMetric => "unknown_metric",
            RatingOutcome::UnmatchedAnswer { .. } => "unmatched_answer",
            RatingOutcome::Custom => "custom",
            RatingOutcome::Incomplete { .. } => "incomplete",
        }
    }
}

/// The one fatal scoring precondition.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("feedback has no ratings sequence")]
    MissingRatings,
}

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::super::rubric::{Category, Rubric};
use super::super::submission::{RatingEntry, StandardRating};
use super::{RatingDiagnostic, RatingOutcome};

/// Running rank total for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CategoryTally {
    pub sum: u32,
    pub count: u32,
}

impl CategoryTally {
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(f64::from(self.sum) / f64::from(self.count))
        }
    }
}

/// Map every rating to a diagnostic and tally the ranks that count.
pub(crate) fn tally_ratings(
    ratings: &[RatingEntry],
    rubric: &Rubric,
) -> (BTreeMap<Category, CategoryTally>, Vec<RatingDiagnostic>) {
    let mut tallies: BTreeMap<Category, CategoryTally> = Category::ALL
        .into_iter()
        .filter(|category| category.is_rated())
        .map(|category| (category, CategoryTally::default()))
        .collect();
    let mut diagnostics = Vec::with_capacity(ratings.len());

    for (index, entry) in ratings.iter().enumerate() {
        let diagnostic = classify(index, entry, rubric);

        if let RatingOutcome::Scored { category, rank } = &diagnostic.outcome {
            let tally = tallies.entry(*category).or_default();
            tally.sum += u32::from(*rank);
            tally.count += 1;
        }

        diagnostics.push(diagnostic);
    }

    (tallies, diagnostics)
}

fn classify(index: usize, entry: &RatingEntry, rubric: &Rubric) -> RatingDiagnostic {
    match entry {
        RatingEntry::Custom(custom) => {
            debug!(index, question_id = ?custom.question_id, "custom rating excluded from scoring");
            RatingDiagnostic {
                index,
                metric: None,
                outcome: RatingOutcome::Custom,
            }
        }
        RatingEntry::Incomplete { missing } => {
            warn!(index, ?missing, "skipping rating with missing fields");
            RatingDiagnostic {
                index,
                metric: None,
                outcome: RatingOutcome::Incomplete {
                    missing: missing.clone(),
                },
            }
        }
        RatingEntry::Standard(rating) => RatingDiagnostic {
            index,
            metric: Some(rating.metric_value.clone()),
            outcome: rank_standard(index, rating, rubric),
        },
    }
}

fn rank_standard(index: usize, rating: &StandardRating, rubric: &Rubric) -> RatingOutcome {
    let Some(metric) = rubric.metric(&rating.metric_value) else {
        warn!(index, metric = %rating.metric_value, "skipping rating for unknown metric");
        return RatingOutcome::UnknownMetric;
    };

    if metric.is_joke(&rating.selected_answer) {
        debug!(index, metric = %metric.id, "joke answer withheld from scoring");
        return RatingOutcome::JokeAnswer;
    }

    let Some(rank) = metric.rank_of(&rating.selected_answer) else {
        warn!(
            index,
            metric = %metric.id,
            answer = %rating.selected_answer,
            "selected answer not found on metric scale"
        );
        return RatingOutcome::UnmatchedAnswer {
            answer: rating.selected_answer.clone(),
        };
    };

    if Category::from_label(&rating.category) != Some(metric.category) {
        warn!(
            index,
            metric = %metric.id,
            submitted = %rating.category,
            rubric = metric.category.label(),
            "submitted category disagrees with rubric; using rubric assignment"
        );
    }

    RatingOutcome::Scored {
        category: metric.category,
        rank,
    }
}

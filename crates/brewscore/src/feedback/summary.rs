use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::repository::FeedbackRecord;
use super::rubric::{Category, Rubric};
use super::scoring::{round1, round2};
use super::submission::BatchId;

/// Aggregation dials for the brewery dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Leave scored records with no signal (custom-only answers, no enjoyment) out of averages.
    pub exclude_unrated: bool,
}

/// Per-batch roll-up of stored feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFeedbackSummary {
    pub batch_id: BatchId,
    pub feedback_count: usize,
    pub scored_count: usize,
    pub pending_count: usize,
    pub unrated_count: usize,
    pub averaged_count: usize,
    pub average_calculated_score: Option<f64>,
    pub average_category_scores: BTreeMap<Category, f64>,
    pub average_overall_enjoyment: Option<f64>,
    /// Mean slider intensity per flavor descriptor, pending records included.
    pub flavor_averages: BTreeMap<String, BTreeMap<String, f64>>,
    pub max_total: u32,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Roll stored records of one batch into dashboard figures.
///
/// Signal is read from each record's stored breakdown, so records scored under an older
/// rubric keep the classification they were written with.
pub fn summarize_batch(
    batch_id: &BatchId,
    records: &[FeedbackRecord],
    rubric: &Rubric,
    options: SummaryOptions,
) -> BatchFeedbackSummary {
    let batch_records: Vec<&FeedbackRecord> = records
        .iter()
        .filter(|record| &record.submission.batch_id == batch_id)
        .collect();

    let mut scored_count = 0;
    let mut unrated_count = 0;
    let mut averaged = Vec::new();

    for record in &batch_records {
        let Some(score) = &record.score else {
            continue;
        };
        scored_count += 1;

        if !score.has_signal() {
            unrated_count += 1;
            if options.exclude_unrated {
                continue;
            }
        }

        averaged.push(score);
    }

    let average_calculated_score = mean(averaged.iter().map(|score| score.calculated_score));
    let average_category_scores = Category::ALL
        .into_iter()
        .map(|category| {
            let average = mean(averaged.iter().map(|score| {
                score
                    .scaled_category_scores
                    .get(&category)
                    .copied()
                    .unwrap_or(0.0)
            }));
            (category, average.unwrap_or(0.0))
        })
        .collect();

    let average_overall_enjoyment = {
        let ratings: Vec<f64> = batch_records
            .iter()
            .filter_map(|record| record.submission.overall_enjoyment.rating())
            .map(f64::from)
            .collect();
        if ratings.is_empty() {
            None
        } else {
            let average = ratings.iter().sum::<f64>() / ratings.len() as f64;
            Some(round1(average))
        }
    };

    let flavor_averages = flavor_averages(&batch_records);

    let mut comments: Vec<CommentView> = batch_records
        .iter()
        .filter_map(|record| {
            let text = record.submission.comment.as_deref()?.trim();
            (!text.is_empty()).then(|| CommentView {
                text: text.to_string(),
                submitted_at: record.submission.submitted_at,
            })
        })
        .collect();
    comments.sort_by_key(|comment| (comment.submitted_at.is_none(), comment.submitted_at));

    BatchFeedbackSummary {
        batch_id: batch_id.clone(),
        feedback_count: batch_records.len(),
        scored_count,
        pending_count: batch_records.len() - scored_count,
        unrated_count,
        averaged_count: averaged.len(),
        average_calculated_score,
        average_category_scores,
        average_overall_enjoyment,
        flavor_averages,
        max_total: rubric.max_total(),
        comments,
    }
}

fn flavor_averages(records: &[&FeedbackRecord]) -> BTreeMap<String, BTreeMap<String, f64>> {
    let mut totals: BTreeMap<&str, BTreeMap<&str, (u32, u32)>> = BTreeMap::new();
    for record in records {
        for (category, descriptors) in &record.submission.flavor_selections {
            let slot = totals.entry(category.as_str()).or_default();
            for (descriptor, intensity) in descriptors {
                let (sum, count) = slot.entry(descriptor.as_str()).or_default();
                *sum += u32::from(*intensity);
                *count += 1;
            }
        }
    }

    totals
        .into_iter()
        .map(|(category, descriptors)| {
            let averages = descriptors
                .into_iter()
                .map(|(descriptor, (sum, count))| {
                    (descriptor.to_string(), round1(f64::from(sum) / f64::from(count)))
                })
                .collect();
            (category.to_string(), averages)
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| round2(sum / count as f64))
}

use std::io::Write;

use super::repository::FeedbackRecord;
use super::rubric::Category;

const HEADER: [&str; 10] = [
    "feedback_id",
    "batch_id",
    "status",
    "calculated_score",
    "appearance",
    "aroma",
    "flavor",
    "mouthfeel",
    "overall",
    "scored_at",
];

/// Write one CSV row per record. Unscored records are marked `pending` with empty score cells.
pub fn write_scores_csv<W: Write>(records: &[FeedbackRecord], writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;

    for record in records {
        let mut row = vec![
            record.id.0.clone(),
            record.submission.batch_id.0.clone(),
        ];

        match &record.score {
            Some(score) => {
                row.push(score.score_calculation_status.label().to_string());
                row.push(format!("{:.2}", score.calculated_score));
                for category in Category::ALL {
                    let points = score
                        .scaled_category_scores
                        .get(&category)
                        .copied()
                        .unwrap_or(0.0);
                    row.push(format!("{points:.2}"));
                }
                row.push(score.score_calculation_timestamp.to_rfc3339());
            }
            None => {
                row.push("pending".to_string());
                row.extend(std::iter::repeat(String::new()).take(Category::ALL.len() + 2));
            }
        }

        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Render the export into an in-memory string.
pub fn scores_csv_string(records: &[FeedbackRecord]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_scores_csv(records, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| ExportError::Encoding(err.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV output: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV output was not valid UTF-8: {0}")]
    Encoding(String),
}

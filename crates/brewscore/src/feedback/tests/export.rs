use super::common::{build_service, feedback_document, rubric, scored_at, submission_with};
use crate::feedback::repository::{FeedbackRecord, ScoreWriteBack};
use crate::feedback::scoring::score_submission;
use crate::feedback::submission::{BatchId, FeedbackId, OverallEnjoyment, RatingEntry};
use crate::feedback::{scores_csv_string, write_scores_csv};

#[test]
fn writes_header_and_two_decimal_scores() {
    let rubric = rubric();
    let submission = submission_with(
        vec![RatingEntry::standard("appearance", "color", "Gold")],
        OverallEnjoyment::Rated(4),
    );
    let result = score_submission(&rubric, &submission).expect("scores");
    let record = FeedbackRecord {
        id: FeedbackId("fb-000042".to_string()),
        submission,
        score: Some(ScoreWriteBack::from_result(&result, scored_at())),
    };

    let csv = scores_csv_string(&[record]).expect("csv renders");
    let mut lines = csv.lines();

    assert_eq!(
        lines.next(),
        Some("feedback_id,batch_id,status,calculated_score,appearance,aroma,flavor,mouthfeel,overall,scored_at")
    );
    assert_eq!(
        lines.next(),
        Some("fb-000042,batch-hazy-ipa,success,9.20,1.20,0.00,0.00,0.00,8.00,2025-06-02T09:00:00+00:00")
    );
    assert_eq!(lines.next(), None);
}

#[test]
fn pending_records_leave_score_cells_empty() {
    let record = FeedbackRecord {
        id: FeedbackId("fb-000007".to_string()),
        submission: submission_with(Vec::new(), OverallEnjoyment::Missing),
        score: None,
    };

    let mut buffer = Vec::new();
    write_scores_csv(&[record], &mut buffer).expect("csv renders");
    let csv = String::from_utf8(buffer).expect("utf-8");

    assert_eq!(
        csv.lines().nth(1),
        Some("fb-000007,batch-hazy-ipa,pending,,,,,,,")
    );
}

#[test]
fn service_export_only_includes_the_requested_batch() {
    let (service, _) = build_service();
    let kept = service
        .submit(&feedback_document("batch-e1"))
        .expect("stored");
    service.handle_created(&kept.id).expect("scored");
    let untouched = service
        .submit(&feedback_document("batch-e1"))
        .expect("stored");
    service
        .submit(&feedback_document("batch-e2"))
        .expect("stored");

    let csv = service
        .export_batch_csv(&BatchId("batch-e1".to_string()))
        .expect("export");

    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .any(|row| row.starts_with(&format!("{},batch-e1,success,21.00,", kept.id.0))));
    assert!(rows
        .iter()
        .any(|row| row.starts_with(&format!("{},batch-e1,pending,", untouched.id.0))));
}

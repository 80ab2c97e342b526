use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier wrapper for a brewery's tracked beer release.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub String);

/// Identifier wrapper for stored feedback records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeedbackId(pub String);

const STANDARD_FIELDS: [&str; 3] = ["category", "metricValue", "selectedAnswer"];

/// Patron submission as written by the survey form. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    pub batch_id: BatchId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brewery_id: Option<String>,
    /// `None` when the document carried no ratings sequence at all.
    pub ratings: Option<Vec<RatingEntry>>,
    pub overall_enjoyment: OverallEnjoyment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rubric_fingerprint: Option<String>,
    /// Descriptor intensities keyed by flavor category, then descriptor id.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub flavor_selections: FlavorSelections,
}

/// `category -> descriptor -> intensity` as picked on the form's sliders.
pub type FlavorSelections = BTreeMap<String, BTreeMap<String, u8>>;

impl FeedbackSubmission {
    /// Lenient intake of a raw feedback document.
    ///
    /// Only a non-object document or a missing `batchId` is rejected. Malformed rating
    /// entries are kept as [`RatingEntry::Incomplete`] so scoring can report them.
    pub fn from_value(value: &Value) -> Result<Self, SubmissionError> {
        let object = value.as_object().ok_or(SubmissionError::NotAnObject)?;

        let batch_id = non_empty_str(object, "batchId")
            .map(|raw| BatchId(raw.trim().to_string()))
            .ok_or(SubmissionError::MissingBatchId)?;

        let ratings = match object.get("ratings") {
            Some(Value::Array(items)) => Some(items.iter().map(RatingEntry::from_value).collect()),
            _ => None,
        };

        let enjoyment = object
            .get("overallEnjoyment")
            .or_else(|| object.get("overallRating"));

        let submitted_at = non_empty_str(object, "timestamp")
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|timestamp| timestamp.with_timezone(&Utc));

        Ok(Self {
            batch_id,
            brewery_id: non_empty_str(object, "breweryId").map(str::to_string),
            ratings,
            overall_enjoyment: OverallEnjoyment::from_value(enjoyment),
            comment: non_empty_str(object, "comment").map(str::to_string),
            submitted_at,
            rubric_fingerprint: non_empty_str(object, "rubricFingerprint").map(str::to_string),
            flavor_selections: object
                .get("flavorSelections")
                .map(parse_flavor_selections)
                .unwrap_or_default(),
        })
    }
}

/// Keep whole-number intensities only; anything else (NaN from a broken slider, strings,
/// nested objects) is dropped along with categories left empty.
fn parse_flavor_selections(value: &Value) -> FlavorSelections {
    let Some(categories) = value.as_object() else {
        return FlavorSelections::new();
    };

    categories
        .iter()
        .filter_map(|(category, descriptors)| {
            let intensities: BTreeMap<String, u8> = descriptors
                .as_object()?
                .iter()
                .filter_map(|(descriptor, intensity)| {
                    let intensity = u8::try_from(intensity.as_u64()?).ok()?;
                    Some((descriptor.clone(), intensity))
                })
                .collect();
            (!intensities.is_empty()).then(|| (category.clone(), intensities))
        })
        .collect()
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

/// One answered survey question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RatingEntry {
    Standard(StandardRating),
    Custom(CustomRating),
    Incomplete { missing: Vec<String> },
}

impl RatingEntry {
    pub fn standard(category: &str, metric_value: &str, selected_answer: &str) -> Self {
        RatingEntry::Standard(StandardRating {
            category: category.to_string(),
            metric_value: metric_value.to_string(),
            selected_answer: selected_answer.to_string(),
        })
    }

    pub fn custom(question_id: &str, rating_value: f64) -> Self {
        RatingEntry::Custom(CustomRating {
            question_id: Some(question_id.to_string()),
            rating_value: Some(rating_value),
        })
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return RatingEntry::Incomplete {
                missing: STANDARD_FIELDS.iter().map(|field| field.to_string()).collect(),
            };
        };

        if object.get("isCustom").and_then(Value::as_bool) == Some(true) {
            return RatingEntry::Custom(CustomRating {
                question_id: non_empty_str(object, "questionId").map(str::to_string),
                rating_value: object.get("ratingValue").and_then(Value::as_f64),
            });
        }

        let category = non_empty_str(object, "category");
        let metric_value = non_empty_str(object, "metricValue");
        // An empty answer is still an answer; it simply matches no label.
        let selected_answer = object.get("selectedAnswer").and_then(Value::as_str);

        match (category, metric_value, selected_answer) {
            (Some(category), Some(metric_value), Some(selected_answer)) => {
                RatingEntry::standard(category, metric_value, selected_answer)
            }
            (category, metric_value, selected_answer) => {
                let present = [
                    category.is_some(),
                    metric_value.is_some(),
                    selected_answer.is_some(),
                ];
                let missing = STANDARD_FIELDS
                    .iter()
                    .zip(present)
                    .filter(|(_, present)| !present)
                    .map(|(field, _)| field.to_string())
                    .collect();
                RatingEntry::Incomplete { missing }
            }
        }
    }
}

/// Rubric-backed rating: the patron picked one of the metric's labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardRating {
    pub category: String,
    pub metric_value: String,
    pub selected_answer: String,
}

/// Brewery-authored question. Never part of rubric scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRating {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_value: Option<f64>,
}

/// Top-level 1..=5 enjoyment rating feeding the `overall` category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum OverallEnjoyment {
    Rated(u8),
    Missing,
    Invalid(String),
}

impl OverallEnjoyment {
    pub fn from_value(value: Option<&Value>) -> Self {
        let value = match value {
            None | Some(Value::Null) => return OverallEnjoyment::Missing,
            Some(value) => value,
        };

        let whole = value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|number| number.fract() == 0.0 && *number >= 0.0)
                .map(|number| number as u64)
        });

        match whole {
            Some(rating @ 1..=5) => OverallEnjoyment::Rated(rating as u8),
            _ => OverallEnjoyment::Invalid(value.to_string()),
        }
    }

    pub fn rating(&self) -> Option<u8> {
        match self {
            OverallEnjoyment::Rated(rating) => Some(*rating),
            _ => None,
        }
    }
}

/// Raised when a feedback document cannot be taken in at all.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("feedback document must be a JSON object")]
    NotAnObject,
    #[error("feedback document is missing batchId")]
    MissingBatchId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_standard_custom_and_incomplete_entries() {
        let document = json!({
            "batchId": "batch-7",
            "ratings": [
                {"category": "appearance", "metricValue": "clarity", "selectedAnswer": "Clear"},
                {"questionId": "q-1", "ratingValue": 4, "isCustom": true},
                {"category": "aroma", "selectedAnswer": "Moderate"},
                "not-an-object"
            ],
            "overallEnjoyment": 4
        });

        let submission = FeedbackSubmission::from_value(&document).expect("document parses");
        let ratings = submission.ratings.expect("ratings present");

        assert_eq!(ratings[0], RatingEntry::standard("appearance", "clarity", "Clear"));
        assert_eq!(ratings[1], RatingEntry::custom("q-1", 4.0));
        assert_eq!(
            ratings[2],
            RatingEntry::Incomplete {
                missing: vec!["metricValue".to_string()]
            }
        );
        assert!(matches!(
            &ratings[3],
            RatingEntry::Incomplete { missing } if missing.len() == 3
        ));
        assert_eq!(submission.overall_enjoyment, OverallEnjoyment::Rated(4));
    }

    #[test]
    fn empty_answer_is_present_but_empty_ids_are_missing() {
        let document = json!({
            "batchId": "batch-7",
            "ratings": [
                {"category": "appearance", "metricValue": "clarity", "selectedAnswer": ""},
                {"category": "", "metricValue": "clarity", "selectedAnswer": "Clear"},
                {"category": "appearance", "metricValue": " ", "selectedAnswer": 3}
            ]
        });

        let submission = FeedbackSubmission::from_value(&document).expect("document parses");
        let ratings = submission.ratings.expect("ratings present");

        assert_eq!(ratings[0], RatingEntry::standard("appearance", "clarity", ""));
        assert_eq!(
            ratings[1],
            RatingEntry::Incomplete {
                missing: vec!["category".to_string()]
            }
        );
        assert_eq!(
            ratings[2],
            RatingEntry::Incomplete {
                missing: vec!["metricValue".to_string(), "selectedAnswer".to_string()]
            }
        );
    }

    #[test]
    fn ratings_that_are_not_a_sequence_are_absent() {
        let document = json!({"batchId": "batch-7", "ratings": {"clarity": "Clear"}});
        let submission = FeedbackSubmission::from_value(&document).expect("document parses");
        assert!(submission.ratings.is_none());

        let document = json!({"batchId": "batch-7"});
        let submission = FeedbackSubmission::from_value(&document).expect("document parses");
        assert!(submission.ratings.is_none());
    }

    #[test]
    fn accepts_overall_rating_alias_from_form() {
        let document = json!({"batchId": "b", "ratings": [], "overallRating": 5});
        let submission = FeedbackSubmission::from_value(&document).expect("document parses");
        assert_eq!(submission.overall_enjoyment.rating(), Some(5));
    }

    #[test]
    fn enjoyment_outside_scale_is_invalid() {
        assert_eq!(
            OverallEnjoyment::from_value(Some(&json!(3.0))),
            OverallEnjoyment::Rated(3)
        );
        assert_eq!(OverallEnjoyment::from_value(None), OverallEnjoyment::Missing);
        assert_eq!(
            OverallEnjoyment::from_value(Some(&Value::Null)),
            OverallEnjoyment::Missing
        );
        assert!(matches!(
            OverallEnjoyment::from_value(Some(&json!(0))),
            OverallEnjoyment::Invalid(_)
        ));
        assert!(matches!(
            OverallEnjoyment::from_value(Some(&json!(6))),
            OverallEnjoyment::Invalid(_)
        ));
        assert!(matches!(
            OverallEnjoyment::from_value(Some(&json!(3.5))),
            OverallEnjoyment::Invalid(_)
        ));
        assert!(matches!(
            OverallEnjoyment::from_value(Some(&json!("4"))),
            OverallEnjoyment::Invalid(_)
        ));
    }

    #[test]
    fn rejects_documents_without_batch() {
        assert!(matches!(
            FeedbackSubmission::from_value(&json!({"ratings": []})),
            Err(SubmissionError::MissingBatchId)
        ));
        assert!(matches!(
            FeedbackSubmission::from_value(&json!([1, 2])),
            Err(SubmissionError::NotAnObject)
        ));
    }

    #[test]
    fn keeps_whole_number_flavor_intensities() {
        let document = json!({
            "batchId": "b",
            "ratings": [],
            "flavorSelections": {
                "malty": {"bready": 3, "caramel": 0, "roasted": "lots", "nutty": 2.5},
                "hoppy": {"citrus": 5, "pine": null},
                "faults": {},
                "yeasty": "none"
            }
        });

        let submission = FeedbackSubmission::from_value(&document).expect("document parses");
        let selections = &submission.flavor_selections;

        assert_eq!(selections.len(), 2);
        assert_eq!(selections["malty"].get("bready"), Some(&3));
        assert_eq!(selections["malty"].get("caramel"), Some(&0));
        assert!(!selections["malty"].contains_key("roasted"));
        assert!(!selections["malty"].contains_key("nutty"));
        assert_eq!(selections["hoppy"].len(), 1);
    }

    #[test]
    fn reads_optional_metadata() {
        let document = json!({
            "batchId": "b",
            "breweryId": "brewery-1",
            "ratings": [],
            "comment": "Great finish",
            "timestamp": "2025-06-01T18:30:00Z",
            "rubricFingerprint": "abc123"
        });

        let submission = FeedbackSubmission::from_value(&document).expect("document parses");
        assert_eq!(submission.brewery_id.as_deref(), Some("brewery-1"));
        assert_eq!(submission.comment.as_deref(), Some("Great finish"));
        assert!(submission.submitted_at.is_some());
        assert_eq!(submission.rubric_fingerprint.as_deref(), Some("abc123"));
        assert_eq!(submission.overall_enjoyment, OverallEnjoyment::Missing);
    }
}

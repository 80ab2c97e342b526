use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const REFERENCE_RUBRIC: &str = include_str!("../../rubric/reference.json");

/// Number of ordered labels every metric scale carries (rank 1 through 5).
pub const SCALE_POINTS: usize = 5;

/// Weighted scoring buckets. `Overall` has no metrics and is fed by the enjoyment rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Appearance,
    Aroma,
    Flavor,
    Mouthfeel,
    Overall,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Appearance,
        Category::Aroma,
        Category::Flavor,
        Category::Mouthfeel,
        Category::Overall,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Category::Appearance => "appearance",
            Category::Aroma => "aroma",
            Category::Flavor => "flavor",
            Category::Mouthfeel => "mouthfeel",
            Category::Overall => "overall",
        }
    }

    /// Whether the category is scored from metric ratings.
    pub const fn is_rated(self) -> bool {
        !matches!(self, Category::Overall)
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.label() == normalized)
    }
}

/// A single tasting attribute and its ordered answer scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub id: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
    pub scale_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joke_label: Option<String>,
}

impl MetricDefinition {
    /// Exact-match rank (1..=5) of an answer on this metric's scale.
    pub fn rank_of(&self, answer: &str) -> Option<u8> {
        self.scale_labels
            .iter()
            .position(|label| label == answer)
            .map(|index| index as u8 + 1)
    }

    pub fn is_joke(&self, answer: &str) -> bool {
        self.joke_label.as_deref() == Some(answer)
    }
}

/// Serialized shape of the rubric artifact shared by the survey form and the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricDocument {
    pub version: String,
    pub weights: BTreeMap<Category, u16>,
    pub metrics: Vec<MetricDefinition>,
}

/// Validated rubric with a metric index and a content fingerprint.
#[derive(Debug, Clone)]
pub struct Rubric {
    document: RubricDocument,
    index: HashMap<String, usize>,
    fingerprint: String,
}

impl Rubric {
    /// The reference rubric embedded in the crate.
    pub fn reference() -> Result<Self, RubricError> {
        Self::from_json(REFERENCE_RUBRIC)
    }

    pub fn from_json(raw: &str) -> Result<Self, RubricError> {
        let document: RubricDocument = serde_json::from_str(raw)?;
        Self::from_document(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| RubricError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_document(document: RubricDocument) -> Result<Self, RubricError> {
        validate(&document)?;

        let index = document
            .metrics
            .iter()
            .enumerate()
            .map(|(position, metric)| (metric.id.clone(), position))
            .collect();
        let fingerprint = fingerprint_of(&document)?;

        Ok(Self {
            document,
            index,
            fingerprint,
        })
    }

    pub fn version(&self) -> &str {
        &self.document.version
    }

    pub fn document(&self) -> &RubricDocument {
        &self.document
    }

    /// Metrics in survey order.
    pub fn metrics(&self) -> &[MetricDefinition] {
        &self.document.metrics
    }

    pub fn metric(&self, id: &str) -> Option<&MetricDefinition> {
        self.index
            .get(id)
            .and_then(|position| self.document.metrics.get(*position))
    }

    pub fn weight(&self, category: Category) -> u16 {
        self.document.weights.get(&category).copied().unwrap_or(0)
    }

    pub fn max_total(&self) -> u32 {
        Category::ALL
            .into_iter()
            .map(|category| u32::from(self.weight(category)))
            .sum()
    }

    /// Lowercase hex SHA-256 of the canonical JSON encoding.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn verify_fingerprint(&self, expected: &str) -> Result<(), RubricError> {
        let expected = expected.trim().to_ascii_lowercase();
        if expected == self.fingerprint {
            Ok(())
        } else {
            Err(RubricError::FingerprintMismatch {
                expected,
                actual: self.fingerprint.clone(),
            })
        }
    }
}

fn fingerprint_of(document: &RubricDocument) -> Result<String, RubricError> {
    let canonical = serde_json::to_vec(document)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

fn validate(document: &RubricDocument) -> Result<(), RubricError> {
    if document.version.trim().is_empty() {
        return Err(RubricError::EmptyVersion);
    }

    for category in Category::ALL {
        match document.weights.get(&category) {
            Some(weight) if *weight > 0 => {}
            _ => return Err(RubricError::InvalidWeight(category)),
        }
    }

    let mut seen_metrics = HashSet::new();
    let mut covered = HashSet::new();
    for metric in &document.metrics {
        if metric.id.trim().is_empty() {
            return Err(RubricError::EmptyMetricId);
        }
        if !seen_metrics.insert(metric.id.as_str()) {
            return Err(RubricError::DuplicateMetric(metric.id.clone()));
        }
        if !metric.category.is_rated() {
            return Err(RubricError::MetricInOverall(metric.id.clone()));
        }
        if metric.scale_labels.len() != SCALE_POINTS {
            return Err(RubricError::LabelCount {
                metric: metric.id.clone(),
                found: metric.scale_labels.len(),
            });
        }

        let mut seen_labels = HashSet::new();
        for label in &metric.scale_labels {
            if label.trim().is_empty() {
                return Err(RubricError::EmptyLabel(metric.id.clone()));
            }
            if !seen_labels.insert(label.as_str()) {
                return Err(RubricError::DuplicateLabel {
                    metric: metric.id.clone(),
                    label: label.clone(),
                });
            }
        }

        if let Some(joke) = &metric.joke_label {
            if seen_labels.contains(joke.as_str()) {
                return Err(RubricError::JokeCollides {
                    metric: metric.id.clone(),
                    label: joke.clone(),
                });
            }
        }

        covered.insert(metric.category);
    }

    if let Some(category) = Category::ALL
        .into_iter()
        .find(|category| category.is_rated() && !covered.contains(category))
    {
        return Err(RubricError::UncoveredCategory(category));
    }

    Ok(())
}

/// Configuration errors detected while loading a rubric.
#[derive(Debug, thiserror::Error)]
pub enum RubricError {
    #[error("failed to read rubric at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid rubric document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("rubric version must not be empty")]
    EmptyVersion,
    #[error("category {0:?} needs a positive weight")]
    InvalidWeight(Category),
    #[error("metric ids must not be empty")]
    EmptyMetricId,
    #[error("metric {0} is defined more than once")]
    DuplicateMetric(String),
    #[error("metric {0} cannot belong to the overall category")]
    MetricInOverall(String),
    #[error("metric {metric} defines {found} scale labels, expected 5")]
    LabelCount { metric: String, found: usize },
    #[error("metric {0} has an empty scale label")]
    EmptyLabel(String),
    #[error("metric {metric} repeats scale label '{label}'")]
    DuplicateLabel { metric: String, label: String },
    #[error("metric {metric} joke label '{label}' matches a scale label")]
    JokeCollides { metric: String, label: String },
    #[error("category {0:?} has no metrics")]
    UncoveredCategory(Category),
    #[error("rubric fingerprint mismatch (expected {expected}, loaded {actual})")]
    FingerprintMismatch { expected: String, actual: String },
}

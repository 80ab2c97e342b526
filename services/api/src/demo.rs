use crate::infra::InMemoryFeedbackRepository;
use brewscore::config::{AppConfig, ScoringConfig};
use brewscore::error::AppError;
use brewscore::feedback::{
    BatchFeedbackSummary, BatchId, Category, FeedbackRepository, FeedbackScoringService,
    FeedbackServiceError, Rubric, RubricError, ScoringReport,
};
use brewscore::telemetry::{self, LogSink};
use chrono::{Duration, SecondsFormat, Utc};
use clap::{Args, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding one feedback document or an array of them
    #[arg(long)]
    pub(crate) input: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct RubricArgs {
    /// Rubric file to inspect instead of the configured one
    #[arg(long)]
    pub(crate) path: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: RubricCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum RubricCommand {
    /// Print the rubric fingerprint the survey form must embed
    Fingerprint,
    /// Print the full rubric document
    Show,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Batch identifier used for the seeded feedback
    #[arg(long, default_value = "demo-hazy-ipa")]
    pub(crate) batch: String,
    /// Leave feedback without any scored rating out of the batch averages
    #[arg(long)]
    pub(crate) exclude_unrated: bool,
    /// Skip printing the CSV export
    #[arg(long)]
    pub(crate) skip_csv: bool,
}

/// Load configuration and route logs to stderr so stdout carries only the report.
fn cli_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init_with_sink(&config.telemetry, LogSink::Stderr)?;
    Ok(config)
}

fn cli_setup() -> Result<(AppConfig, Arc<Rubric>), AppError> {
    let config = cli_config()?;
    let rubric = Arc::new(config.scoring.load_rubric()?);
    Ok((config, rubric))
}

/// Store and score each document on its own; a document that cannot be scored does not
/// stop the ones after it.
fn score_documents<R: FeedbackRepository + 'static>(
    service: &FeedbackScoringService<R>,
    documents: &[Value],
) -> Vec<Result<ScoringReport, FeedbackServiceError>> {
    documents
        .iter()
        .map(|document| {
            let record = service.submit(document)?;
            service.handle_created(&record.id)
        })
        .collect()
}

/// An explicit `--path` is inspected as-is; otherwise the configured rubric is loaded
/// with its pinned fingerprint check.
fn inspected_rubric(path: Option<&Path>, scoring: &ScoringConfig) -> Result<Rubric, RubricError> {
    match path {
        Some(path) => Rubric::from_path(path),
        None => scoring.load_rubric(),
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let (config, rubric) = cli_setup()?;
    let raw = std::fs::read_to_string(&args.input)?;
    let parsed: Value = serde_json::from_str(&raw)?;
    let documents = match parsed {
        Value::Array(documents) => documents,
        document => vec![document],
    };

    let service = FeedbackScoringService::with_options(
        Arc::new(InMemoryFeedbackRepository::default()),
        rubric.clone(),
        config.scoring.summary_options(),
    );

    println!(
        "Rubric {} ({}), maximum {} points",
        rubric.version(),
        rubric.fingerprint(),
        rubric.max_total()
    );
    let mut failures = 0;
    for (index, outcome) in score_documents(&service, &documents).into_iter().enumerate() {
        match outcome {
            Ok(report) => render_report(&report, rubric.max_total()),
            Err(err) => {
                failures += 1;
                println!("- document #{index} not scored: {err}");
            }
        }
    }
    if failures > 0 {
        tracing::warn!(
            failures,
            total = documents.len(),
            "some feedback documents were not scored"
        );
    }

    Ok(())
}

pub(crate) fn run_rubric_command(args: RubricArgs) -> Result<(), AppError> {
    let config = cli_config()?;
    let rubric = inspected_rubric(args.path.as_deref(), &config.scoring)?;

    match args.command {
        RubricCommand::Fingerprint => println!("{}", rubric.fingerprint()),
        RubricCommand::Show => {
            let view = json!({
                "version": rubric.version(),
                "fingerprint": rubric.fingerprint(),
                "max_total": rubric.max_total(),
                "rubric": rubric.document(),
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        batch,
        exclude_unrated,
        skip_csv,
    } = args;

    let (mut config, rubric) = cli_setup()?;
    config.scoring.exclude_unrated |= exclude_unrated;

    let service = FeedbackScoringService::with_options(
        Arc::new(InMemoryFeedbackRepository::default()),
        rubric.clone(),
        config.scoring.summary_options(),
    );

    println!("Brewery feedback demo for batch {batch}");
    for document in demo_feedback(&batch, rubric.fingerprint()) {
        let record = service.submit(&document)?;
        match service.handle_created(&record.id) {
            Ok(report) => render_report(&report, rubric.max_total()),
            Err(err) => println!("- {} not scored: {}", record.id.0, err),
        }
    }

    let batch_id = BatchId(batch);
    let summary = service.batch_summary(&batch_id)?;
    render_summary(&summary);

    if !skip_csv {
        println!("\nScore export");
        print!("{}", service.export_batch_csv(&batch_id)?);
    }

    Ok(())
}

fn render_report(report: &ScoringReport, max_total: u32) {
    println!(
        "- {} scored {:.2} / {}{}",
        report.feedback_id.0,
        report.result.calculated_score,
        max_total,
        if report.rubric_skew {
            " (rubric skew detected)"
        } else {
            ""
        }
    );
    for category in Category::ALL {
        println!(
            "    {:<10} {:>6.2}",
            category.label(),
            report.result.category_score(category)
        );
    }
    for skipped in report.result.skipped() {
        println!(
            "    skipped rating #{} ({}): {}",
            skipped.index,
            skipped.metric.as_deref().unwrap_or("-"),
            skipped.outcome.label()
        );
    }
}

fn render_summary(summary: &BatchFeedbackSummary) {
    println!("\nBatch {} dashboard", summary.batch_id.0);
    println!(
        "- {} feedback | {} scored | {} pending | {} without rated answers",
        summary.feedback_count, summary.scored_count, summary.pending_count, summary.unrated_count
    );
    match summary.average_calculated_score {
        Some(average) => println!(
            "- Average score {:.2} / {} across {} submissions",
            average, summary.max_total, summary.averaged_count
        ),
        None => println!("- No scored feedback yet"),
    }
    if let Some(enjoyment) = summary.average_overall_enjoyment {
        println!("- Average enjoyment {enjoyment:.1} / 5");
    }
    if !summary.flavor_averages.is_empty() {
        println!("Flavor profile:");
        for (category, descriptors) in &summary.flavor_averages {
            let line: Vec<String> = descriptors
                .iter()
                .map(|(descriptor, average)| format!("{descriptor} {average:.1}"))
                .collect();
            println!("  - {}: {}", category, line.join(", "));
        }
    }
    println!("Category averages:");
    for (category, average) in &summary.average_category_scores {
        println!("  - {}: {:.2}", category.label(), average);
    }
    if !summary.comments.is_empty() {
        println!("Comments:");
        for comment in &summary.comments {
            println!("  - \"{}\"", comment.text);
        }
    }
}

fn demo_feedback(batch: &str, fingerprint: &str) -> Vec<Value> {
    let poured_at = Utc::now() - Duration::hours(2);
    let stamp = |minutes: i64| {
        (poured_at + Duration::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Secs, true)
    };

    vec![
        json!({
            "batchId": batch,
            "breweryId": "demo-brewery",
            "rubricFingerprint": fingerprint,
            "ratings": [
                {"category": "appearance", "metricValue": "clarity", "selectedAnswer": "Slight Haze"},
                {"category": "appearance", "metricValue": "color", "selectedAnswer": "Gold"},
                {"category": "aroma", "metricValue": "hop_intensity", "selectedAnswer": "Intense / Pungent"},
                {"category": "aroma", "metricValue": "malt_sweetness", "selectedAnswer": "Low / Hint of Sweetness"},
                {"category": "flavor", "metricValue": "hop_bitterness", "selectedAnswer": "Notably Bitter"},
                {"category": "flavor", "metricValue": "balance", "selectedAnswer": "Leans Bitter"},
                {"category": "mouthfeel", "metricValue": "body", "selectedAnswer": "Medium"},
                {"category": "mouthfeel", "metricValue": "carbonation", "selectedAnswer": "Medium / Moderate Fizz"}
            ],
            "overallEnjoyment": 5,
            "flavorSelections": {
                "hoppy": {"citrus": 5, "pine": 2, "floral": 3},
                "malty": {"bready": 1, "caramel": 1}
            },
            "comment": "Juicy and bright, would order again",
            "timestamp": stamp(5)
        }),
        json!({
            "batchId": batch,
            "breweryId": "demo-brewery",
            "rubricFingerprint": fingerprint,
            "ratings": [
                {"category": "appearance", "metricValue": "clarity", "selectedAnswer": "Visibility zero, captain!"},
                {"category": "aroma", "metricValue": "hop_intensity", "selectedAnswer": "Moderate"},
                {"category": "flavor", "metricValue": "malt_flavor", "selectedAnswer": "Tastes like my cereal's sophisticated cousin"},
                {"category": "flavor", "metricValue": "hop_bitterness", "selectedAnswer": "Very Bitter / Intense"},
                {"category": "mouthfeel", "metricValue": "body", "selectedAnswer": "Light-Medium"},
                {"questionId": "would-buy-again", "ratingValue": 4, "isCustom": true}
            ],
            "overallEnjoyment": 3,
            "flavorSelections": {
                "hoppy": {"citrus": 3, "pine": 5, "earthy": 4},
                "faults": {"diacetyl": 1}
            },
            "comment": "Too bitter for me",
            "timestamp": stamp(20)
        }),
        json!({
            "batchId": batch,
            "breweryId": "demo-brewery",
            "ratings": [
                {"questionId": "label-design", "ratingValue": 5, "isCustom": true}
            ],
            "comment": "Love the label art",
            "timestamp": stamp(45)
        }),
        json!({
            "batchId": batch,
            "breweryId": "demo-brewery",
            "rubricFingerprint": "outdated-form-build",
            "ratings": [
                {"category": "aroma", "metricValue": "hop_aroma", "selectedAnswer": "Citrus"},
                {"category": "mouthfeel", "metricValue": "carbonation", "selectedAnswer": "Lively / High Fizz"}
            ],
            "overallRating": 4,
            "timestamp": stamp(60)
        }),
        json!({
            "batchId": batch,
            "breweryId": "demo-brewery",
            "overallEnjoyment": 2,
            "comment": "Form glitched before I could answer",
            "timestamp": stamp(75)
        }),
    ]
}

use crate::demo::{run_demo, run_rubric_command, run_score, DemoArgs, RubricArgs, ScoreArgs};
use crate::server;
use brewscore::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Brewery Feedback Scorer",
    about = "Score patron tasting feedback against the brewery rubric",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a feedback document from a JSON file and print the breakdown
    Score(ScoreArgs),
    /// Inspect the active rubric
    Rubric(RubricArgs),
    /// Seed a sample batch, score it and print the brewery dashboard
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Rubric(args) => run_rubric_command(args),
        Command::Demo(args) => run_demo(args),
    }
}

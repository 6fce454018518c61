use pr_reviewer::config;
use pr_reviewer::llm;
use pr_reviewer::pr;
use pr_reviewer::report;
use pr_reviewer::review;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

/// PR Reviewer: CLI tool that takes a GitHub Pull Request URL, asks an LLM
/// to review each changed file, and posts a consolidated summary back.
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer", version, about)]
struct Cli {
    /// GitHub Pull Request URL (e.g., https://github.com/org/repo/pull/42)
    pr_url: String,

    /// Config file (defaults to .pr-reviewer.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Optional output file path for markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Review without posting anything to the pull request
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let _main_span = info_span!("pr_review", pr_url = %cli.pr_url).entered();

    info!("parsing PR URL");
    let parsed_url = pr::parse_pr_url(&cli.pr_url)?;
    debug!(owner = %parsed_url.owner, repo = %parsed_url.repo, pr = parsed_url.pr_number, "parsed PR URL");

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;

    let host = pr::GitHubClient::new(&parsed_url, &config.github, config.review.max_files)?;
    let completion = llm::OpenAiClient::new(&config.openai)?;
    let reviewer = review::Reviewer::new(
        Arc::new(host),
        Arc::new(completion),
        review::ReviewSettings::from_config(&config, cli.dry_run),
    );

    info!(dry_run = cli.dry_run, "reviewing pull request");
    let outcome = reviewer.review_pull_request(parsed_url.pr_number).await?;
    info!(
        reviewed = outcome.reviewed.len(),
        skipped = outcome.skipped.len(),
        suggestions = outcome.suggestions.len(),
        posted = outcome.posted,
        "review complete"
    );

    let built_report = report::build(outcome);
    report::output(&built_report, cli.output.as_deref())?;
    info!("done");

    Ok(())
}

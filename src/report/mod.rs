pub mod types;

pub use types::{FileFeedback, Report};

use crate::review::ReviewOutcome;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a Report from a finished review run.
pub fn build(outcome: ReviewOutcome) -> Report {
    let feedback = outcome
        .comments
        .iter()
        .map(|(path, comment)| FileFeedback {
            path: path.to_string(),
            comment: comment.to_string(),
            suggestions: outcome
                .suggestions
                .iter()
                .filter(|s| s.file_path == path)
                .count(),
        })
        .collect();

    Report {
        pr_number: outcome.pr_number,
        pr_title: outcome.pr_title,
        author: outcome.author,
        files_reviewed: outcome.reviewed.len(),
        skipped: outcome.skipped,
        dropped_over_cap: outcome.dropped_over_cap,
        feedback,
        summary: outcome.summary,
        posted: outcome.posted,
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(pr = report.pr_number))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

/// Format and print the report to the terminal with colors.
///
/// PR #42: "Add OAuth2 login flow"
/// Author: alice | Reviewed: 5 | Skipped: 2 | Suggestions: 3
///
/// ═══ src/auth.rs (1 suggestion) ═══
/// <feedback>
///
/// ═══ Summary ═══
/// <summary>
fn print_terminal_report(report: &Report) {
    println!();
    println!("PR #{}: \"{}\"", report.pr_number, report.pr_title);
    println!(
        "Author: {} | Reviewed: {} | Skipped: {} | Suggestions: {}",
        report.author,
        report.files_reviewed,
        report.skipped.len(),
        report.total_suggestions()
    );
    if report.dropped_over_cap > 0 {
        println!(
            "{}",
            format!("{} files over the per-run cap were not reviewed", report.dropped_over_cap)
                .yellow()
                .bold()
        );
    }
    println!();

    for skipped in &report.skipped {
        println!("  {} {} ({})", "skipped".dimmed(), skipped.path, skipped.reason);
    }
    if !report.skipped.is_empty() {
        println!();
    }

    for file in &report.feedback {
        println!("═══ {}{} ═══", file.path.bold(), suggestion_note(file.suggestions));
        println!("{}", file.comment.trim());
        println!();
    }

    println!("═══ {} ═══", "Summary".cyan().bold());
    println!("{}", report.summary.trim());
    println!();
    if report.posted {
        println!("{}", "Posted to pull request.".green());
    } else {
        println!("{}", "Nothing posted to pull request.".dimmed());
    }
    println!();
}

/// Write the report as a markdown file.
///
/// # PR #42: "Add OAuth2 login flow"
/// **Author:** alice | **Reviewed:** 5 | **Skipped:** 2 | **Suggestions:** 3
///
/// ## Summary
/// ...
/// ## Files
/// ### `src/auth.rs` (1 suggestion)
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!("# PR #{}: \"{}\"\n\n", report.pr_number, report.pr_title));
    md.push_str(&format!(
        "**Author:** {} | **Reviewed:** {} | **Skipped:** {} | **Suggestions:** {}\n\n",
        report.author,
        report.files_reviewed,
        report.skipped.len(),
        report.total_suggestions()
    ));
    if report.dropped_over_cap > 0 {
        md.push_str(&format!(
            "> {} files over the per-run cap were not reviewed.\n\n",
            report.dropped_over_cap
        ));
    }

    md.push_str("## Summary\n\n");
    md.push_str(report.summary.trim());
    md.push_str("\n\n");

    if !report.feedback.is_empty() {
        md.push_str("## Files\n\n");
        for file in &report.feedback {
            md.push_str(&format!(
                "### `{}`{}\n\n{}\n\n",
                file.path,
                suggestion_note(file.suggestions),
                file.comment.trim()
            ));
        }
    }

    if !report.skipped.is_empty() {
        md.push_str("## Skipped\n\n");
        for skipped in &report.skipped {
            md.push_str(&format!("- `{}`: {}\n", skipped.path, skipped.reason));
        }
        md.push('\n');
    }

    std::fs::write(path, md)?;
    Ok(())
}

fn suggestion_note(count: usize) -> String {
    match count {
        0 => String::new(),
        1 => " (1 suggestion)".to_string(),
        n => format!(" ({} suggestions)", n),
    }
}

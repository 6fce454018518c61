use crate::review::SkippedFile;

/// Per-file feedback as shown in the report.
#[derive(Debug, Clone)]
pub struct FileFeedback {
    pub path: String,
    pub comment: String,
    /// Inline suggestions extracted for this file
    pub suggestions: usize,
}

/// Operator-facing view of one review run.
#[derive(Debug)]
pub struct Report {
    /// PR number
    pub pr_number: u64,
    /// PR title
    pub pr_title: String,
    /// PR author
    pub author: String,
    /// Number of files sent for analysis
    pub files_reviewed: usize,
    /// Files left out by filters, with the reason
    pub skipped: Vec<SkippedFile>,
    /// Files beyond the per-run cap
    pub dropped_over_cap: usize,
    /// Feedback for files with something to report
    pub feedback: Vec<FileFeedback>,
    /// Cross-file summary
    pub summary: String,
    /// Whether the summary or suggestions were posted to the PR
    pub posted: bool,
}

impl Report {
    pub fn total_suggestions(&self) -> usize {
        self.feedback.iter().map(|f| f.suggestions).sum()
    }
}

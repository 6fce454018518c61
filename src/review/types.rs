use super::suggestion::Suggestion;

/// Per-file review feedback, keyed by path, in file processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewComments {
    entries: Vec<(String, String)>,
}

impl ReviewComments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert feedback for `path`. A repeated path replaces the earlier
    /// text but keeps its original position.
    pub fn insert(&mut self, path: impl Into<String>, comment: impl Into<String>) {
        let path = path.into();
        let comment = comment.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = comment,
            None => self.entries.push((path, comment)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a changed file was not analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Extension is in the configured ignore set
    IgnoredExtension(String),
    /// No patch text (binary file, pure rename, oversized diff)
    EmptyPatch,
    /// The patch could not be parsed
    UnparseablePatch(String),
    /// No valid hunk produced any post-change code
    EmptyReconstruction,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::IgnoredExtension(ext) => write!(f, "ignored extension {}", ext),
            SkipReason::EmptyPatch => write!(f, "no patch content"),
            SkipReason::UnparseablePatch(reason) => write!(f, "unparseable patch: {}", reason),
            SkipReason::EmptyReconstruction => write!(f, "no reviewable code after reconstruction"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// Everything a completed review run produced.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub pr_number: u64,
    pub pr_title: String,
    pub author: String,
    /// Files sent for analysis, in listing order
    pub reviewed: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    /// Changed files beyond the per-run cap that were never fetched
    pub dropped_over_cap: usize,
    /// Feedback for files where the model had something to report
    pub comments: ReviewComments,
    pub suggestions: Vec<Suggestion>,
    /// Cross-file markdown summary
    pub summary: String,
    /// Whether anything was posted to the pull request
    pub posted: bool,
}

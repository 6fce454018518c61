pub mod prompt;
pub mod reconstruct;
pub mod response;
pub mod suggestion;
pub mod types;

pub use types::{ReviewComments, ReviewOutcome, SkipReason, SkippedFile};

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{Config, ReconstructionMode, SuggestionAnchor};
use crate::llm::{CompletionService, LlmError};
use crate::pr::diff::parse_file_patch;
use crate::pr::{ChangedFile, PrError, PullRequest, SourceHost};
use crate::retry::{with_retry, RetryExhausted, RetryPolicy};

use prompt::{FileFilter, PromptAssembler, CODE_REVIEW_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT};
use reconstruct::{reconstruct, ReconstructionInput};
use response::{is_nothing_to_report, parse_suggested_diff};
use suggestion::{extract_suggestions, Suggestion};

/// Summary used when no file produced feedback.
pub const NO_COMMENTS_SUMMARY: &str = "No comments.";

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("source host call failed: {0}")]
    Host(#[from] RetryExhausted<PrError>),

    #[error("completion call failed: {0}")]
    Completion(#[from] RetryExhausted<LlmError>),

    #[error("summary completion returned an empty response")]
    EmptySummary,
}

/// Knobs for one review run.
#[derive(Debug, Clone)]
pub struct ReviewSettings {
    pub max_files: usize,
    pub filter: FileFilter,
    pub assembler: PromptAssembler,
    pub reconstruction: ReconstructionMode,
    pub suggestion_anchor: SuggestionAnchor,
    pub post_suggestions: bool,
    pub temperature: f32,
    pub retry: RetryPolicy,
    /// Run the whole pipeline but post nothing
    pub dry_run: bool,
}

impl ReviewSettings {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            max_files: config.review.max_files,
            filter: FileFilter::from_config(&config.review),
            assembler: PromptAssembler::new(config.review.max_prompt_chars),
            reconstruction: config.review.reconstruction,
            suggestion_anchor: config.review.suggestion_anchor,
            post_suggestions: config.review.post_suggestions,
            temperature: config.openai.temperature,
            retry: config.retry.policy(),
            dry_run,
        }
    }
}

/// Reviews pull requests with injected host and completion clients.
///
/// Files are processed one at a time in listing order; no two outbound
/// calls are ever in flight together.
pub struct Reviewer {
    host: Arc<dyn SourceHost>,
    completion: Arc<dyn CompletionService>,
    settings: ReviewSettings,
}

impl Reviewer {
    pub fn new(
        host: Arc<dyn SourceHost>,
        completion: Arc<dyn CompletionService>,
        settings: ReviewSettings,
    ) -> Self {
        Self {
            host,
            completion,
            settings,
        }
    }

    /// Review one pull request and return the outcome, including the
    /// cross-file summary. Any exhausted outbound call aborts the run
    /// before anything is posted.
    pub async fn review_pull_request(&self, number: u64) -> Result<ReviewOutcome, ReviewError> {
        let policy = &self.settings.retry;
        let pr = with_retry(policy, "get_pull_request", || self.host.get_pull_request(number)).await?;
        info!(title = %pr.title, files = pr.files.len(), "fetched pull request");

        let (files, dropped_over_cap) = self.apply_file_cap(&pr);

        let mut reviewed = Vec::new();
        let mut skipped = Vec::new();
        let mut comments = ReviewComments::new();
        let mut suggestions = Vec::new();

        for file in files {
            let span = info_span!("review_file", path = %file.path);
            let code = match self.prepare(file) {
                Ok(code) => code,
                Err(reason) => {
                    info!(path = %file.path, reason = %reason, "skipping file");
                    skipped.push(SkippedFile {
                        path: file.path.clone(),
                        reason,
                    });
                    continue;
                }
            };

            let feedback = self.analyze_file(&pr, file, &code).instrument(span).await?;
            reviewed.push(file.path.clone());

            if is_nothing_to_report(&feedback) {
                info!(path = %file.path, "no suggestions");
                continue;
            }
            suggestions.extend(self.suggestions_from(&file.path, &feedback));
            comments.insert(file.path.clone(), feedback);
        }

        let summary = self.summarize(&comments).await?;

        let posted = if self.settings.dry_run {
            info!("dry run, nothing posted");
            false
        } else {
            self.post(&pr, &summary, &suggestions).await?
        };

        Ok(ReviewOutcome {
            pr_number: pr.number,
            pr_title: pr.title,
            author: pr.author,
            reviewed,
            skipped,
            dropped_over_cap,
            comments,
            suggestions,
            summary,
            posted,
        })
    }

    /// Keep the first `max_files` files in listing order.
    fn apply_file_cap<'a>(&self, pr: &'a PullRequest) -> (&'a [ChangedFile], usize) {
        let kept = pr.files.len().min(self.settings.max_files);
        let total = pr.files_changed.max(pr.files.len());
        let dropped = total - kept;
        if dropped > 0 {
            warn!(
                total,
                cap = self.settings.max_files,
                dropped,
                "pull request exceeds the file cap; extra files are not reviewed"
            );
        }
        (&pr.files[..kept], dropped)
    }

    /// Filter a file and reconstruct its post-change code.
    fn prepare(&self, file: &ChangedFile) -> Result<String, SkipReason> {
        if let Some(reason) = self.settings.filter.skip_reason(file) {
            return Err(reason);
        }
        let patch = file.patch.as_deref().unwrap_or_default();
        let code = match self.settings.reconstruction {
            ReconstructionMode::Raw => reconstruct(ReconstructionInput::RawHunkText(patch)),
            ReconstructionMode::Parsed => {
                let parsed = parse_file_patch(&file.path, patch)
                    .map_err(|e| SkipReason::UnparseablePatch(e.to_string()))?;
                debug!(
                    path = %file.path,
                    hunks = parsed.hunks.len(),
                    additions = parsed.additions(),
                    deletions = parsed.deletions(),
                    "parsed patch"
                );
                reconstruct(ReconstructionInput::Parsed(&parsed))
            }
        };
        if code.trim().is_empty() {
            return Err(SkipReason::EmptyReconstruction);
        }
        Ok(code)
    }

    async fn analyze_file(
        &self,
        pr: &PullRequest,
        file: &ChangedFile,
        code: &str,
    ) -> Result<String, ReviewError> {
        let policy = &self.settings.retry;
        let content = with_retry(policy, "get_file_content", || {
            self.host.get_file_content(&file.path, &pr.head_sha)
        })
        .await?;

        let prompt = self.settings.assembler.analysis_prompt(&file.path, code, &content);
        debug!(prompt_len = prompt.len(), "built analysis prompt");

        let feedback = with_retry(policy, "analyze", || {
            self.completion
                .complete(CODE_REVIEW_SYSTEM_PROMPT, &prompt, self.settings.temperature)
        })
        .await?;
        Ok(feedback)
    }

    /// Suggestions from a feedback response; text-only feedback yields none.
    fn suggestions_from(&self, path: &str, feedback: &str) -> Vec<Suggestion> {
        match parse_suggested_diff(feedback) {
            Ok(suggested) => {
                extract_suggestions(&suggested.file, path, self.settings.suggestion_anchor)
            }
            Err(err) => {
                debug!(error = %err, "feedback has no applicable diff, keeping text only");
                Vec::new()
            }
        }
    }

    async fn summarize(&self, comments: &ReviewComments) -> Result<String, ReviewError> {
        if comments.is_empty() {
            info!("no file feedback, skipping summary call");
            return Ok(NO_COMMENTS_SUMMARY.to_string());
        }
        let prompt = self.settings.assembler.summary_prompt(comments);
        let summary = with_retry(&self.settings.retry, "summarize", || {
            self.completion
                .complete(SUMMARY_SYSTEM_PROMPT, &prompt, self.settings.temperature)
        })
        .await?;
        if summary.trim().is_empty() {
            return Err(ReviewError::EmptySummary);
        }
        Ok(summary)
    }

    /// Post the summary, then the collected suggestions. Returns whether
    /// anything was posted.
    async fn post(
        &self,
        pr: &PullRequest,
        summary: &str,
        suggestions: &[Suggestion],
    ) -> Result<bool, ReviewError> {
        let policy = &self.settings.retry;
        let mut posted = false;

        if is_nothing_to_report(summary) {
            info!("summary has nothing to report, not posting it");
        } else {
            with_retry(policy, "post_summary", || {
                self.host.post_review_comment(pr.number, summary, None)
            })
            .await?;
            posted = true;
        }

        if self.settings.post_suggestions {
            for suggestion in suggestions {
                let anchor = suggestion.anchor(&pr.head_sha);
                with_retry(policy, "post_suggestion", || {
                    self.host
                        .post_review_comment(pr.number, &suggestion.body, Some(&anchor))
                })
                .await?;
                posted = true;
            }
            info!(count = suggestions.len(), "posted suggestions");
        }
        Ok(posted)
    }
}

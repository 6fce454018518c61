use std::path::Path;

use crate::config::ReviewConfig;
use crate::pr::ChangedFile;

use super::types::{ReviewComments, SkipReason};

pub const CODE_REVIEW_SYSTEM_PROMPT: &str = "You are a world-class software engineer. When provided \
with the changed code of one file and the file's full content, you analyze the change and offer code \
suggestions to improve it. Present each suggestion as a short explanation followed by a unified diff \
against the full file inside a ```diff fenced block, with `--- a/<path>` and `+++ b/<path>` headers and \
`@@ -start,count +start,count @@` hunk headers that use the line numbers of the full file. \
If no improvements or suggestions are identified, write \"No suggestions.\". \
Your suggestions are relevant and actionable, considering the provided context.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a world-class software engineer and writer. Given a \
list of PR review comments, you provide a markdown summary of the comments. If there are no comments, \
write \"No comments.\". Your summary is relevant and actionable, considering the provided context.";

const TRUNCATION_MARKER: &str = "... [file truncated] ...";

/// Decides which changed files are worth analyzing.
#[derive(Debug, Clone)]
pub struct FileFilter {
    ignore_extensions: Vec<String>,
}

impl FileFilter {
    pub fn new(ignore_extensions: Vec<String>) -> Self {
        Self { ignore_extensions }
    }

    pub fn from_config(config: &ReviewConfig) -> Self {
        Self::new(config.ignore_extensions.clone())
    }

    /// Returns why `file` must not be analyzed, if it must not.
    pub fn skip_reason(&self, file: &ChangedFile) -> Option<SkipReason> {
        if let Some(ext) = Path::new(&file.path).extension().and_then(|e| e.to_str()) {
            let dotted = format!(".{}", ext);
            if self
                .ignore_extensions
                .iter()
                .any(|ignored| ignored.eq_ignore_ascii_case(&dotted))
            {
                return Some(SkipReason::IgnoredExtension(dotted));
            }
        }
        match file.patch.as_deref() {
            Some(patch) if !patch.trim().is_empty() => None,
            _ => Some(SkipReason::EmptyPatch),
        }
    }
}

/// Builds the analysis and summary prompts.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    max_prompt_chars: usize,
}

impl PromptAssembler {
    pub fn new(max_prompt_chars: usize) -> Self {
        Self { max_prompt_chars }
    }

    /// Prompt asking for review feedback on one file.
    ///
    /// When the prompt would exceed the bound, the full-file section is
    /// shortened first; the changed code is always sent whole.
    pub fn analysis_prompt(&self, path: &str, reconstructed: &str, full_content: &str) -> String {
        let head = format!(
            "Review the changed code of `{path}` below and provide code suggestions. \
If there are no improvements or suggestions, write \"No suggestions.\".\n\n\
Changed code (post-change excerpts):\n{}\n\nFull file `{path}`:\n",
            fence(reconstructed)
        );

        let fenced_content = fence(full_content);
        if head.chars().count() + fenced_content.chars().count() <= self.max_prompt_chars {
            return head + &fenced_content;
        }

        // Room left for file text, minus fences, newlines and the marker.
        let overhead = head.chars().count() + TRUNCATION_MARKER.len() + 2 * 6 + 4;
        let budget = self.max_prompt_chars.saturating_sub(overhead);
        let mut shortened: String = full_content.chars().take(budget).collect();
        shortened.push('\n');
        shortened.push_str(TRUNCATION_MARKER);
        head + &fence(&shortened)
    }

    /// Prompt asking for one summary over all per-file feedback.
    pub fn summary_prompt(&self, comments: &ReviewComments) -> String {
        comments
            .iter()
            .map(|(path, comment)| format!("* `{}`: {}", path, comment.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Wrap `content` in a code fence longer than any backtick run inside it.
pub fn fence(content: &str) -> String {
    let longest_run = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let ticks = "`".repeat(longest_run.max(2) + 1);
    format!("{ticks}\n{content}\n{ticks}")
}

//! Split a model response into its fenced diff and its free-text
//! explanation.

use thiserror::Error;
use tracing::warn;

use crate::pr::diff::parse_diff;
use crate::pr::types::{Patch, PatchedFile};
use crate::pr::PrError;

const FENCE: &str = "```";

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response contains no diff")]
    NoDiffInResponse,

    #[error("response diff could not be parsed: {0}")]
    InvalidDiff(#[from] PrError),
}

/// A response separated into its two streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Diff parsed from the fenced segments, possibly empty
    pub patch: Patch,
    /// Non-fenced text, in order, blank lines preserved
    pub explanation: String,
}

/// The single file a response suggests changes for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedDiff {
    pub file: PatchedFile,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Outside,
    InsideFence,
}

/// Split `response` on fence lines and parse the fenced part as a diff.
///
/// A fence line starts with the backtick run at column 0, so diff lines
/// (which always carry a marker first) never toggle the state. Fence lines
/// themselves go to neither stream.
pub fn split_response(response: &str) -> Result<ParsedResponse, ResponseError> {
    let mut state = FenceState::Outside;
    let mut fenced = String::new();
    let mut explanation = String::new();

    for line in response.split_inclusive('\n') {
        if line.starts_with(FENCE) {
            state = match state {
                FenceState::Outside => FenceState::InsideFence,
                FenceState::InsideFence => FenceState::Outside,
            };
            continue;
        }
        match state {
            FenceState::Outside => explanation.push_str(line),
            FenceState::InsideFence => fenced.push_str(line),
        }
    }

    Ok(ParsedResponse {
        patch: parse_diff(&fenced)?,
        explanation,
    })
}

impl ParsedResponse {
    /// Keep the first suggested file. No file at all is an error; more than
    /// one is reported and the rest dropped.
    pub fn into_single_file(self) -> Result<SuggestedDiff, ResponseError> {
        if self.patch.is_empty() {
            return Err(ResponseError::NoDiffInResponse);
        }
        let file_count = self.patch.files.len();
        if file_count > 1 {
            warn!(file_count, "response diff spans several files; using the first");
        }
        let file = self
            .patch
            .files
            .into_iter()
            .next()
            .ok_or(ResponseError::NoDiffInResponse)?;
        Ok(SuggestedDiff {
            file,
            explanation: self.explanation,
        })
    }
}

/// Parse a response that is expected to carry a diff for exactly one file.
pub fn parse_suggested_diff(response: &str) -> Result<SuggestedDiff, ResponseError> {
    split_response(response)?.into_single_file()
}

/// Whether the model said there is nothing to report.
pub fn is_nothing_to_report(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("no suggestions") || lower.contains("no comments")
}

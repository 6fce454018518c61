//! End-to-end review of the sample diff with in-memory host and completion
//! services.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pr_reviewer::config::Config;
use pr_reviewer::llm::{CompletionService, LlmError};
use pr_reviewer::pr::diff::parse_diff;
use pr_reviewer::pr::types::Patch;
use pr_reviewer::pr::{ChangedFile, LineAnchor, PrError, PullRequest, SourceHost};
use pr_reviewer::report;
use pr_reviewer::retry::RetryPolicy;
use pr_reviewer::review::reconstruct::{reconstruct, ReconstructionInput, OMITTED_CODE_MARKER};
use pr_reviewer::review::{ReviewSettings, Reviewer, SkipReason};

const SAMPLE_DIFF: &str = include_str!("fixtures/sample_diff.patch");

fn sample_patch() -> Patch {
    parse_diff(SAMPLE_DIFF).expect("fixture parses")
}

/// The host's file listing carries hunk text only, without file headers.
fn listed_files(patch: &Patch) -> Vec<ChangedFile> {
    patch
        .files
        .iter()
        .map(|file| ChangedFile {
            path: file.path.clone(),
            patch: Some(
                file.hunks
                    .iter()
                    .map(|hunk| hunk.to_string())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        })
        .collect()
}

struct RecordingHost {
    files: Vec<ChangedFile>,
    posts: Mutex<Vec<(String, Option<LineAnchor>)>>,
}

#[async_trait]
impl SourceHost for RecordingHost {
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, PrError> {
        Ok(PullRequest {
            number,
            title: "Add token refresh".to_string(),
            author: "octocat".to_string(),
            head_sha: "cafebabe".to_string(),
            diff_url: format!("https://github.com/org/repo/pull/{}.diff", number),
            files_changed: self.files.len(),
            files: self.files.clone(),
        })
    }

    async fn get_file_content(&self, path: &str, _git_ref: &str) -> Result<String, PrError> {
        Ok(format!("// {}\n", path))
    }

    async fn post_review_comment(
        &self,
        _number: u64,
        body: &str,
        anchor: Option<&LineAnchor>,
    ) -> Result<(), PrError> {
        self.posts
            .lock()
            .unwrap()
            .push((body.to_string(), anchor.cloned()));
        Ok(())
    }
}

/// Answers analysis prompts by file path and summary prompts with a fixed text.
struct ScriptedCompletion {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        let reply = if user_prompt.starts_with("* `") {
            "- Token refresh looks right; document the new config field.".to_string()
        } else if user_prompt.contains("`src/auth/login.rs`") {
            "Handle a failed renewal.\n```diff\n--- a/src/auth/login.rs\n+++ b/src/auth/login.rs\n@@ -21,3 +21,3 @@\n pub fn refresh(session: &mut Session) {\n-    session.renew(Token::fresh());\n+    session.renew(Token::fresh()).ok();\n }\n```\n".to_string()
        } else {
            "No suggestions.".to_string()
        };
        Ok(reply)
    }
}

#[test]
fn test_fixture_reconstructs_post_change_code() {
    let patch = sample_patch();
    let login = &patch.files[0];
    assert_eq!(login.path, "src/auth/login.rs");

    let code = reconstruct(ReconstructionInput::Parsed(login));
    assert!(code.contains("use crate::token::Token;"));
    assert!(code.contains("session.renew(Token::fresh());"));
    assert!(!code.contains("session.touch();"));
    assert!(code.contains(OMITTED_CODE_MARKER));
}

#[tokio::test]
async fn test_review_sample_pull_request() {
    let files = listed_files(&sample_patch());
    let host = Arc::new(RecordingHost {
        files,
        posts: Mutex::new(Vec::new()),
    });
    let llm = Arc::new(ScriptedCompletion {
        prompts: Mutex::new(Vec::new()),
    });
    let mut settings = ReviewSettings::from_config(&Config::default(), false);
    settings.retry = RetryPolicy::immediate(2);

    let reviewer = Reviewer::new(host.clone(), llm.clone(), settings);
    let outcome = reviewer.review_pull_request(12).await.unwrap();

    assert_eq!(outcome.reviewed, vec!["src/auth/login.rs", "src/config.rs"]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].path, "Cargo.lock");
    assert_eq!(
        outcome.skipped[0].reason,
        SkipReason::IgnoredExtension(".lock".to_string())
    );

    // Only login.rs had feedback; config.rs answered "No suggestions."
    assert_eq!(outcome.comments.len(), 1);
    let prompts = llm.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[2].starts_with("* `src/auth/login.rs`: Handle a failed renewal."));

    assert_eq!(outcome.suggestions.len(), 1);
    let suggestion = &outcome.suggestions[0];
    assert_eq!((suggestion.start_line, suggestion.end_line), (21, 24));

    let posts = host.posts.lock().unwrap().clone();
    assert_eq!(posts.len(), 2);
    assert!(posts[0].1.is_none());
    let anchor = posts[1].1.as_ref().unwrap();
    assert_eq!(anchor.commit_sha, "cafebabe");
    assert!(posts[1].0.contains("session.renew(Token::fresh()).ok();"));

    let built = report::build(outcome);
    assert_eq!(built.files_reviewed, 2);
    assert_eq!(built.total_suggestions(), 1);
    assert!(built.posted);
}

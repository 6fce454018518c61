use tracing::warn;

use crate::config::SuggestionAnchor;
use crate::pr::types::PatchedFile;
use crate::pr::LineAnchor;

/// A one-click code suggestion anchored to a line range of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub file_path: String,
    pub start_line: usize,
    /// Exclusive end of the anchored range
    pub end_line: usize,
    /// Fenced `suggestion` block
    pub body: String,
}

impl Suggestion {
    pub fn anchor(&self, commit_sha: &str) -> LineAnchor {
        LineAnchor {
            path: self.file_path.clone(),
            commit_sha: commit_sha.to_string(),
            start_line: self.start_line,
            end_line: self.end_line,
        }
    }
}

/// Wrap `lines` in a block the host renders as an applicable suggestion.
pub fn suggestion_block<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    let mut body = String::from("```suggestion\n");
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    body.push_str("```");
    body
}

/// Whether a diff path names the reviewed file. Either side may carry
/// extra leading directories (e.g. a stray `a/` prefix).
fn names_same_file(suggested: &str, reviewed: &str) -> bool {
    suggested == reviewed
        || suggested.ends_with(&format!("/{}", reviewed))
        || reviewed.ends_with(&format!("/{}", suggested))
}

/// One suggestion per valid hunk of `file`, attributed to `file_path`.
///
/// `anchor` selects whether line numbers come from the hunk's target
/// (post-change) or source (pre-change) range. A diff for another file,
/// or one that creates or deletes a file, yields nothing.
pub fn extract_suggestions(
    file: &PatchedFile,
    file_path: &str,
    anchor: SuggestionAnchor,
) -> Vec<Suggestion> {
    if !file.path.is_empty() && !names_same_file(&file.path, file_path) {
        warn!(reviewed = %file_path, suggested = %file.path, "suggested diff names a different file, dropping it");
        return Vec::new();
    }
    if file.is_new || file.is_deleted {
        warn!(
            file = %file_path,
            is_new = file.is_new,
            is_deleted = file.is_deleted,
            "suggested diff creates or deletes the file, dropping it"
        );
        return Vec::new();
    }

    file.hunks
        .iter()
        .filter_map(|hunk| {
            if let Err(err) = hunk.validate() {
                warn!(file = %file_path, error = %err, "skipping malformed suggestion hunk");
                return None;
            }
            let (start_line, length) = match anchor {
                SuggestionAnchor::Target => (hunk.target_start, hunk.target_length),
                SuggestionAnchor::Source => (hunk.source_start, hunk.source_length),
            };
            let end_line = if length == 0 {
                start_line + 1
            } else {
                start_line + length
            };
            Some(Suggestion {
                file_path: file_path.to_string(),
                start_line,
                end_line,
                body: suggestion_block(hunk.forward_lines()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::diff::parse_file_patch;

    #[test]
    fn test_one_suggestion_per_hunk() {
        let file = parse_file_patch(
            "app.py",
            "@@ -3,2 +3,3 @@\n keep\n-old\n+new1\n+new2\n@@ -20,1 +21,1 @@\n-x\n+y",
        )
        .unwrap();
        let suggestions = extract_suggestions(&file, "app.py", SuggestionAnchor::Target);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].start_line, 3);
        assert_eq!(suggestions[0].end_line, 6);
        assert_eq!(suggestions[0].body, "```suggestion\nkeep\nnew1\nnew2\n```");
        assert_eq!(suggestions[1].start_line, 21);
        assert_eq!(suggestions[1].end_line, 22);
        assert_eq!(suggestions[1].file_path, "app.py");
    }

    #[test]
    fn test_source_anchor_uses_source_range() {
        let file = parse_file_patch("app.py", "@@ -3,2 +5,3 @@\n keep\n-old\n+new1\n+new2").unwrap();
        let suggestions = extract_suggestions(&file, "app.py", SuggestionAnchor::Source);
        assert_eq!(suggestions[0].start_line, 3);
        assert_eq!(suggestions[0].end_line, 5);
    }

    #[test]
    fn test_growing_hunk_ranges_per_anchor() {
        let file = parse_file_patch("app.py", "@@ -3,1 +3,3 @@\n-a\n+b\n+c\n+d").unwrap();
        let target = extract_suggestions(&file, "app.py", SuggestionAnchor::Target);
        assert_eq!((target[0].start_line, target[0].end_line), (3, 6));
        let source = extract_suggestions(&file, "app.py", SuggestionAnchor::Source);
        assert_eq!((source[0].start_line, source[0].end_line), (3, 4));
        assert_eq!(source[0].body, target[0].body);
    }

    #[test]
    fn test_empty_range_defaults_to_one_line() {
        let file = parse_file_patch("app.py", "@@ -4,1 +4,0 @@\n-dead()").unwrap();
        let suggestions = extract_suggestions(&file, "app.py", SuggestionAnchor::Target);
        assert_eq!(suggestions[0].start_line, 4);
        assert_eq!(suggestions[0].end_line, 5);
        assert_eq!(suggestions[0].body, "```suggestion\n```");
    }

    #[test]
    fn test_malformed_hunk_skipped() {
        let file = parse_file_patch("app.py", "@@ -1,3 +1,3 @@\n-a\n+b\n@@ -9,1 +9,1 @@\n-c\n+d").unwrap();
        let suggestions = extract_suggestions(&file, "app.py", SuggestionAnchor::Target);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].start_line, 9);
    }

    #[test]
    fn test_diff_for_other_file_yields_nothing() {
        let file = parse_file_patch("utils/helpers.py", "@@ -40,1 +40,1 @@\n-return x\n+return x or 0").unwrap();
        assert!(extract_suggestions(&file, "app.py", SuggestionAnchor::Target).is_empty());
    }

    #[test]
    fn test_diff_path_with_extra_prefix_still_matches() {
        let file = parse_file_patch("a/src/app.py", "@@ -1,1 +1,1 @@\n-a\n+b").unwrap();
        let suggestions = extract_suggestions(&file, "src/app.py", SuggestionAnchor::Target);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].file_path, "src/app.py");
    }

    #[test]
    fn test_file_deletion_yields_nothing() {
        let mut file = parse_file_patch("app.py", "@@ -1,2 +0,0 @@\n-a\n-b").unwrap();
        file.is_deleted = true;
        assert!(extract_suggestions(&file, "app.py", SuggestionAnchor::Target).is_empty());
    }

    #[test]
    fn test_anchor_carries_commit() {
        let suggestion = Suggestion {
            file_path: "app.py".to_string(),
            start_line: 2,
            end_line: 4,
            body: suggestion_block(["x"]),
        };
        let anchor = suggestion.anchor("abc123");
        assert_eq!(anchor.commit_sha, "abc123");
        assert_eq!((anchor.start_line, anchor.end_line), (2, 4));
    }
}

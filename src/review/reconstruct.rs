//! Rebuild the post-change code from a patch: context and added lines are
//! kept in order, removed lines are dropped.

use tracing::{debug, warn};

use crate::pr::diff::classify_line;
use crate::pr::types::{LineKind, PatchedFile};

/// Placeholder between non-contiguous excerpts.
pub const OMITTED_CODE_MARKER: &str = "...other code...";

/// What to reconstruct from.
#[derive(Debug, Clone, Copy)]
pub enum ReconstructionInput<'a> {
    /// Raw hunk text as listed by the host; hunk headers become excerpt
    /// separators and hunks are not validated.
    RawHunkText(&'a str),
    /// A parsed file; malformed hunks are dropped with a diagnostic.
    Parsed(&'a PatchedFile),
}

/// Reconstruct the post-change code. Returns an empty string when nothing
/// usable remains.
pub fn reconstruct(input: ReconstructionInput<'_>) -> String {
    match input {
        ReconstructionInput::RawHunkText(text) => reconstruct_raw(text),
        ReconstructionInput::Parsed(file) => reconstruct_parsed(file),
    }
}

fn reconstruct_raw(text: &str) -> String {
    let mut groups: Vec<Vec<String>> = vec![Vec::new()];
    for line in text.lines() {
        if line.starts_with("@@") {
            groups.push(Vec::new());
            continue;
        }
        if line.starts_with('\\') {
            continue;
        }
        let line = classify_line(line);
        if line.kind != LineKind::Removed {
            if let Some(group) = groups.last_mut() {
                group.push(line.text);
            }
        }
    }
    groups
        .into_iter()
        .filter(|group| !group.is_empty())
        .map(|group| group.join("\n"))
        .collect::<Vec<_>>()
        .join(&format!("\n{}\n", OMITTED_CODE_MARKER))
}

fn reconstruct_parsed(file: &PatchedFile) -> String {
    let groups: Vec<String> = file
        .hunks
        .iter()
        .filter(|hunk| match hunk.validate() {
            Ok(()) => true,
            Err(err) => {
                warn!(file = %file.path, error = %err, "skipping malformed hunk");
                debug!(hunk = %hunk, "malformed hunk body");
                false
            }
        })
        .map(|hunk| hunk.forward_lines().collect::<Vec<_>>().join("\n"))
        .collect();

    match groups.len() {
        0 => String::new(),
        1 => groups.into_iter().next().unwrap_or_default(),
        _ => groups
            .iter()
            .map(|group| format!("```\n{}\n```", group))
            .collect::<Vec<_>>()
            .join(&format!("\n{}\n", OMITTED_CODE_MARKER)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::diff::parse_file_patch;

    const SINGLE_HUNK: &str = "@@ -1,2 +1,3 @@\n context\n-old\n+new1\n+new2";

    #[test]
    fn test_raw_mode_drops_removed_and_header() {
        let code = reconstruct(ReconstructionInput::RawHunkText(SINGLE_HUNK));
        assert_eq!(code, "context\nnew1\nnew2");
    }

    #[test]
    fn test_raw_mode_separates_hunks_with_marker() {
        let patch = "@@ -1 +1 @@\n-a\n+b\n@@ -10,2 +10,2 @@\n keep\n-c\n+d";
        let code = reconstruct(ReconstructionInput::RawHunkText(patch));
        assert_eq!(code, "b\n...other code...\nkeep\nd");
    }

    #[test]
    fn test_parsed_mode_single_hunk() {
        let file = parse_file_patch("app.py", SINGLE_HUNK).unwrap();
        let code = reconstruct(ReconstructionInput::Parsed(&file));
        assert_eq!(code, "context\nnew1\nnew2");
    }

    #[test]
    fn test_context_only_hunk_is_unchanged() {
        let file = parse_file_patch("a.txt", "@@ -4,3 +4,3 @@\n alpha\n beta\n gamma").unwrap();
        let code = reconstruct(ReconstructionInput::Parsed(&file));
        assert_eq!(code, "alpha\nbeta\ngamma");
    }

    #[test]
    fn test_parsed_mode_multi_hunk_fenced_with_marker() {
        let patch = "@@ -1,1 +1,1 @@\n-a\n+b\n@@ -10,2 +10,2 @@\n keep\n-c\n+d";
        let file = parse_file_patch("x.rs", patch).unwrap();
        let code = reconstruct(ReconstructionInput::Parsed(&file));
        assert_eq!(code, "```\nb\n```\n...other code...\n```\nkeep\nd\n```");
    }

    #[test]
    fn test_malformed_hunk_skipped() {
        let patch = "@@ -1,5 +1,5 @@\n-a\n+b\n@@ -10,1 +10,1 @@\n-c\n+d";
        let file = parse_file_patch("x.rs", patch).unwrap();
        assert!(!file.hunks[0].is_valid());
        let code = reconstruct(ReconstructionInput::Parsed(&file));
        assert_eq!(code, "d");
    }

    #[test]
    fn test_no_valid_hunks_yields_empty() {
        let file = parse_file_patch("x.rs", "@@ -1,4 +1,4 @@\n-a\n+b").unwrap();
        assert_eq!(reconstruct(ReconstructionInput::Parsed(&file)), "");
    }

    #[test]
    fn test_deletion_only_yields_empty() {
        let file = parse_file_patch("gone.rs", "@@ -1,2 +0,0 @@\n-a\n-b").unwrap();
        assert_eq!(reconstruct(ReconstructionInput::Parsed(&file)), "");
        assert_eq!(reconstruct(ReconstructionInput::RawHunkText("@@ -1,2 +0,0 @@\n-a\n-b")), "");
    }
}

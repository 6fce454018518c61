use std::iter::Peekable;
use std::str::Lines;

use tracing::debug;

use super::types::{DiffLine, Hunk, LineKind, Patch, PatchedFile};
use super::PrError;

/// Classify one raw hunk body line and strip its marker.
///
/// `+` is Added, `-` is Removed, anything else is Context with exactly one
/// leading character removed. An empty line is Context with empty text.
pub fn classify_line(raw: &str) -> DiffLine {
    let mut chars = raw.chars();
    let (kind, text) = match chars.next() {
        Some('+') => (LineKind::Added, chars.as_str()),
        Some('-') => (LineKind::Removed, chars.as_str()),
        Some(_) => (LineKind::Context, chars.as_str()),
        None => {
            debug!("empty diff line treated as context");
            (LineKind::Context, "")
        }
    };
    DiffLine {
        kind,
        text: text.to_string(),
    }
}

/// Parse a unified diff string into a Patch.
///
/// Accepts full `git diff` output (file sections start with
/// `diff --git a/{path} b/{path}`), bare `---`/`+++` headed diffs, and
/// header-less hunk text as found in a pull request file listing. Hunks
/// that appear before any file header are collected into a file with an
/// empty path.
///
/// New files have: `--- /dev/null`
/// Deleted files have: `+++ /dev/null`
///
/// Hunks start with: @@ -{old_start},{old_count} +{new_start},{new_count} @@
///
/// Hunks are not validated here; see [`Hunk::validate`].
pub fn parse_diff(raw_diff: &str) -> Result<Patch, PrError> {
    if raw_diff.trim().is_empty() {
        return Ok(Patch::default());
    }

    let mut files = Vec::new();
    let mut current_file: Option<PatchedFile> = None;
    let mut current_hunk: Option<Hunk> = None;

    let finish_hunk = |file: &mut Option<PatchedFile>, hunk: &mut Option<Hunk>| {
        if let Some(hunk) = hunk.take() {
            file.get_or_insert_with(|| PatchedFile::new("")).hunks.push(hunk);
        }
    };

    let finish_file =
        |files: &mut Vec<PatchedFile>, file: &mut Option<PatchedFile>, hunk: &mut Option<Hunk>| {
            finish_hunk(file, hunk);
            if let Some(file) = file.take() {
                files.push(file);
            }
        };

    let mut lines = raw_diff.lines().peekable();
    while let Some(line) = lines.next() {
        // Inside a hunk that still expects lines everything is body, even
        // text that looks like a header (e.g. a removed "-- comment"), until
        // the next file section starts. A hunk cut short there stays invalid.
        if let Some(hunk) = current_hunk.as_mut() {
            if expects_more(hunk) && !line.starts_with("@@") && !starts_file_section(line, &lines) {
                if line.starts_with('\\') {
                    continue;
                }
                hunk.lines.push(classify_line(line));
                continue;
            }
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            finish_file(&mut files, &mut current_file, &mut current_hunk);
            current_file = Some(PatchedFile::new(parse_git_header_path(rest)?));
            continue;
        }

        let is_file_header = line.starts_with("--- ")
            && lines.peek().is_some_and(|next| next.starts_with("+++ "));
        if is_file_header {
            // A `diff --git` line may already have opened this file.
            let opened_by_git_header = current_hunk.is_none()
                && current_file.as_ref().is_some_and(|f| f.hunks.is_empty());
            if !opened_by_git_header {
                finish_file(&mut files, &mut current_file, &mut current_hunk);
                current_file = Some(PatchedFile::new(""));
            }
            let old_path = line[4..].trim();
            let new_path = lines.next().map(|l| l[4..].trim()).unwrap_or_default();
            if let Some(file) = current_file.as_mut() {
                if old_path == "/dev/null" {
                    file.is_new = true;
                }
                if new_path == "/dev/null" {
                    file.is_deleted = true;
                    if file.path.is_empty() {
                        file.path = strip_side_prefix(old_path, "a/").to_string();
                    }
                } else {
                    file.path = strip_side_prefix(new_path, "b/").to_string();
                }
            }
            continue;
        }

        if line.starts_with("@@") {
            finish_hunk(&mut current_file, &mut current_hunk);
            let (old_start, old_count, new_start, new_count) = parse_hunk_header(line)?;
            current_hunk = Some(Hunk::new(old_start, old_count, new_start, new_count));
            continue;
        }

        // Surplus body lines after the declared counts are kept so that
        // validation can reject the hunk.
        if let Some(hunk) = current_hunk.as_mut() {
            if line.starts_with('+') || line.starts_with('-') || line.starts_with(' ') {
                hunk.lines.push(classify_line(line));
            }
        }
    }

    finish_file(&mut files, &mut current_file, &mut current_hunk);
    Ok(Patch { files })
}

/// Parse the hunk text of a single file (as listed by the host) into a
/// PatchedFile carrying the given path.
pub fn parse_file_patch(path: &str, patch_text: &str) -> Result<PatchedFile, PrError> {
    let mut file = PatchedFile::new(path);
    for parsed in parse_diff(patch_text)?.files {
        file.is_new |= parsed.is_new;
        file.is_deleted |= parsed.is_deleted;
        file.hunks.extend(parsed.hunks);
    }
    Ok(file)
}

/// Whether `line` opens a new file section: a `diff --git` line, or a
/// `---`/`+++` pair directly followed by a hunk header.
fn starts_file_section(line: &str, rest: &Peekable<Lines<'_>>) -> bool {
    if line.starts_with("diff --git ") {
        return true;
    }
    if !line.starts_with("--- ") {
        return false;
    }
    let mut ahead = rest.clone();
    ahead.next().is_some_and(|l| l.starts_with("+++ "))
        && ahead.next().is_some_and(|l| l.starts_with("@@"))
}

fn expects_more(hunk: &Hunk) -> bool {
    hunk.source_line_count() < hunk.source_length || hunk.target_line_count() < hunk.target_length
}

fn parse_git_header_path(rest: &str) -> Result<String, PrError> {
    let mut parts = rest.split_whitespace();
    let a_path = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing a/ path in diff header".to_string()))?;
    let b_path = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing b/ path in diff header".to_string()))?;
    Ok(b_path
        .strip_prefix("b/")
        .or_else(|| a_path.strip_prefix("a/"))
        .unwrap_or(b_path)
        .to_string())
}

fn strip_side_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    // Drop a trailing timestamp as written by `diff -u`.
    let path = path.split('\t').next().unwrap_or(path);
    path.strip_prefix(prefix).unwrap_or(path)
}

pub(crate) fn parse_hunk_header(line: &str) -> Result<(usize, usize, usize, usize), PrError> {
    let header = line
        .trim()
        .strip_prefix("@@")
        .ok_or_else(|| PrError::DiffParse("Invalid hunk header".to_string()))?;
    // Drop the trailing "@@" and any section heading after it.
    let header = match header.find("@@") {
        Some(end) => &header[..end],
        None => header,
    };
    let mut parts = header.split_whitespace();
    let old_part = parts
        .next()
        .ok_or_else(|| PrError::DiffParse(format!("Missing old range in {}", line)))?;
    let new_part = parts
        .next()
        .ok_or_else(|| PrError::DiffParse(format!("Missing new range in {}", line)))?;

    let (old_start, old_count) = parse_range(old_part, '-')?;
    let (new_start, new_count) = parse_range(new_part, '+')?;

    Ok((old_start, old_count, new_start, new_count))
}

fn parse_range(part: &str, prefix: char) -> Result<(usize, usize), PrError> {
    let range = part
        .strip_prefix(prefix)
        .ok_or_else(|| PrError::DiffParse(format!("Invalid range prefix in {}", part)))?;
    let (start_str, count_str) = match range.split_once(',') {
        Some((start, count)) => (start, count),
        None => (range, "1"),
    };
    let start = start_str
        .parse::<usize>()
        .map_err(|_| PrError::DiffParse(format!("Invalid range start in {}", part)))?;
    let count = count_str
        .parse::<usize>()
        .map_err(|_| PrError::DiffParse(format!("Invalid range count in {}", part)))?;
    Ok((start, count))
}

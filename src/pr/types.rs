/// Metadata about a pull request fetched from the host, plus its changed files.
/// Not Deserialize: assembled from the pull request JSON and the paginated
/// file listing.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// PR number (e.g., 42)
    pub number: u64,
    /// PR title
    pub title: String,
    /// Author's GitHub login
    pub author: String,
    /// SHA of the head commit; file contents are fetched at this ref
    pub head_sha: String,
    /// URL of the full diff document for the PR
    pub diff_url: String,
    /// Total files changed, as reported by the host (may exceed `files.len()`)
    pub files_changed: usize,
    /// Changed files in listing order, capped at the configured maximum
    pub files: Vec<ChangedFile>,
}

/// One entry of the pull request file listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    /// File path (e.g., "src/auth/config.rs")
    pub path: String,
    /// Hunk text for this file. `None` for binary files, pure renames and
    /// diffs too large for the host to inline.
    pub patch: Option<String>,
}

/// Classification of a single hunk body line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Added,
    Removed,
    Context,
}

impl LineKind {
    /// The unified diff marker for this kind.
    pub fn marker(self) -> char {
        match self {
            LineKind::Added => '+',
            LineKind::Removed => '-',
            LineKind::Context => ' ',
        }
    }
}

/// A hunk body line with its diff marker stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
}

impl DiffLine {
    /// Re-prefix the stripped text with the marker for its kind.
    pub fn to_patch_line(&self) -> String {
        format!("{}{}", self.kind.marker(), self.text)
    }

    /// Whether this line survives into the post-change code.
    pub fn is_forward(&self) -> bool {
        self.kind != LineKind::Removed
    }
}

/// A contiguous region of changes within a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// Starting line number in the old file
    pub source_start: usize,
    /// Number of lines in the old file
    pub source_length: usize,
    /// Starting line number in the new file
    pub target_start: usize,
    /// Number of lines in the new file
    pub target_length: usize,
    /// Classified body lines, in patch order
    pub lines: Vec<DiffLine>,
}

/// Declared hunk ranges disagree with the lines actually present.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "malformed hunk {header}: expected {expected_source} source / {expected_target} target lines, found {found_source} / {found_target}"
)]
pub struct MalformedHunk {
    pub header: String,
    pub expected_source: usize,
    pub found_source: usize,
    pub expected_target: usize,
    pub found_target: usize,
}

impl Hunk {
    pub fn new(source_start: usize, source_length: usize, target_start: usize, target_length: usize) -> Self {
        Self {
            source_start,
            source_length,
            target_start,
            target_length,
            lines: Vec::new(),
        }
    }

    /// `@@ -a,b +c,d @@` header for this hunk.
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.source_start, self.source_length, self.target_start, self.target_length
        )
    }

    /// Number of Removed + Context lines.
    pub fn source_line_count(&self) -> usize {
        self.lines.iter().filter(|l| l.kind != LineKind::Added).count()
    }

    /// Number of Added + Context lines.
    pub fn target_line_count(&self) -> usize {
        self.lines.iter().filter(|l| l.kind != LineKind::Removed).count()
    }

    /// Check that the declared ranges match the body.
    pub fn validate(&self) -> Result<(), MalformedHunk> {
        let found_source = self.source_line_count();
        let found_target = self.target_line_count();
        if found_source == self.source_length && found_target == self.target_length {
            return Ok(());
        }
        Err(MalformedHunk {
            header: self.header(),
            expected_source: self.source_length,
            found_source,
            expected_target: self.target_length,
            found_target,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Texts of the Context and Added lines, in order.
    pub fn forward_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter(|l| l.is_forward()).map(|l| l.text.as_str())
    }
}

impl std::fmt::Display for Hunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.header())?;
        for line in &self.lines {
            write!(f, "\n{}", line.to_patch_line())?;
        }
        Ok(())
    }
}

/// All hunks for a single file. Hunks are owned by their file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedFile {
    /// File path; empty when the diff carried no file header
    pub path: String,
    /// Whether this is a new file
    pub is_new: bool,
    /// Whether this file was deleted
    pub is_deleted: bool,
    pub hunks: Vec<Hunk>,
}

impl PatchedFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_new: false,
            is_deleted: false,
            hunks: Vec::new(),
        }
    }

    pub fn additions(&self) -> usize {
        self.count_kind(LineKind::Added)
    }

    pub fn deletions(&self) -> usize {
        self.count_kind(LineKind::Removed)
    }

    fn count_kind(&self, kind: LineKind) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| h.lines.iter())
            .filter(|l| l.kind == kind)
            .count()
    }
}

/// A parsed unified diff, possibly spanning several files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub files: Vec<PatchedFile>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Represents the parsed components of a GitHub PR URL.
/// Extracted by parse_pr_url() in pr/mod.rs.
#[derive(Debug, Clone)]
pub struct PrUrl {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
}

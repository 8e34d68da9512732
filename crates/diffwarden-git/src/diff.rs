//! Two-commit diff extraction via git2.
//!
//! Renders the change introduced by the latest commit (`HEAD~1..HEAD`) as
//! a unified patch, in the same shape `git diff HEAD~1 HEAD` prints.

use std::path::Path;

use diffwarden_core::DiffwardenError;
use git2::{Diff, DiffFormat, DiffOptions, Oid, Repository};

/// The change introduced by the most recent commit.
///
/// # Examples
///
/// ```
/// use diffwarden_git::diff::CommitDiff;
///
/// let diff = CommitDiff {
///     base: "1a2b3c4d".into(),
///     head: "5e6f7a8b".into(),
///     patch: String::new(),
///     files_changed: 0,
///     insertions: 0,
///     deletions: 0,
/// };
/// assert!(diff.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDiff {
    /// Short id of `HEAD~1`.
    pub base: String,
    /// Short id of `HEAD`.
    pub head: String,
    /// Unified patch text.
    pub patch: String,
    /// Number of files touched.
    pub files_changed: usize,
    /// Lines added.
    pub insertions: usize,
    /// Lines removed.
    pub deletions: usize,
}

impl CommitDiff {
    /// `true` when the patch has no content besides whitespace.
    pub fn is_empty(&self) -> bool {
        self.patch.trim().is_empty()
    }
}

/// Compute the diff between `HEAD~1` and `HEAD` of the repository at `repo_path`.
///
/// `repo_path` must be the root of a checkout; parent directories are not
/// searched.
///
/// # Errors
///
/// Returns [`DiffwardenError::Git`] if the path is not a repository, the
/// repository has no commits, or `HEAD` has no parent.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use diffwarden_git::diff::diff_last_commit;
///
/// let diff = diff_last_commit(Path::new(".")).unwrap();
/// println!("{} -> {}: {} files", diff.base, diff.head, diff.files_changed);
/// ```
pub fn diff_last_commit(repo_path: &Path) -> Result<CommitDiff, DiffwardenError> {
    let repo = Repository::open(repo_path).map_err(|e| {
        DiffwardenError::Git(format!(
            "failed to open repository at {}: {}",
            repo_path.display(),
            e.message()
        ))
    })?;

    let head = repo
        .head()
        .and_then(|r| r.peel_to_commit())
        .map_err(|e| DiffwardenError::Git(format!("failed to resolve HEAD: {}", e.message())))?;

    if head.parent_count() == 0 {
        return Err(DiffwardenError::Git(
            "HEAD has no parent commit; at least two commits are required".into(),
        ));
    }

    let parent = head
        .parent(0)
        .map_err(|e| DiffwardenError::Git(format!("failed to resolve HEAD~1: {e}")))?;

    let head_tree = head
        .tree()
        .map_err(|e| DiffwardenError::Git(format!("failed to get HEAD tree: {e}")))?;
    let parent_tree = parent
        .tree()
        .map_err(|e| DiffwardenError::Git(format!("failed to get HEAD~1 tree: {e}")))?;

    let mut diff_opts = DiffOptions::new();
    let diff = repo
        .diff_tree_to_tree(Some(&parent_tree), Some(&head_tree), Some(&mut diff_opts))
        .map_err(|e| DiffwardenError::Git(format!("failed to compute diff: {e}")))?;

    let stats = diff
        .stats()
        .map_err(|e| DiffwardenError::Git(format!("failed to compute diff stats: {e}")))?;

    let patch = render_patch(&diff)?;

    let result = CommitDiff {
        base: short_id(parent.id()),
        head: short_id(head.id()),
        patch,
        files_changed: stats.files_changed(),
        insertions: stats.insertions(),
        deletions: stats.deletions(),
    };

    tracing::debug!(
        base = %result.base,
        head = %result.head,
        files = result.files_changed,
        insertions = result.insertions,
        deletions = result.deletions,
        "computed diff of last commit"
    );

    Ok(result)
}

fn render_patch(diff: &Diff<'_>) -> Result<String, DiffwardenError> {
    let mut patch = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        // File and hunk headers carry their own text; content lines need the marker.
        if matches!(line.origin(), '+' | '-' | ' ') {
            patch.push(line.origin());
        }
        patch.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .map_err(|e| DiffwardenError::Git(format!("failed to render patch: {e}")))?;
    Ok(patch)
}

fn short_id(oid: Oid) -> String {
    let hash = oid.to_string();
    hash[..hash.len().min(8)].to_string()
}

//! Commit ancestry, historical file content, and two-commit diffs.

pub mod local;

use crate::core::FileDiff;
use anyhow::Result;

pub use local::LocalGitHistory;

/// History provided by version control.
///
/// Implementations must guarantee a usable history even against a dirty or
/// uncommitted working tree; `save_all_files` checkpoints the current state
/// into a private (shadow) history layer before any decision is made.
pub trait GitHistory {
    /// Checkpoint the working tree if it differs from the last checkpoint.
    fn save_all_files(&self) -> Result<()>;

    /// Commit id of the current HEAD.
    fn head(&self) -> Result<String>;

    /// Parent commit ids of `commit_id`, in order.
    fn commit_parents(&self, commit_id: &str) -> Result<Vec<String>>;

    /// Content of `path` as of `commit_id`. Fails with
    /// [`NabazError::NotFound`](crate::errors::NabazError) when the path did
    /// not exist at that commit.
    fn file_content(&self, path: &str, commit_id: &str) -> Result<Vec<u8>>;

    /// File-level diff from `older_commit_id` to `current_commit_id`.
    fn diff(&self, current_commit_id: &str, older_commit_id: &str) -> Result<Vec<FileDiff>>;
}

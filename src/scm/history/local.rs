//! git2-backed history with a shadow repository layer.
//!
//! The shadow repository keeps its gitdir at `.nabazgit` inside the working
//! tree while sharing the user's worktree. Every invocation checkpoints the
//! current tree into it, so a commit id and a diff are always available even
//! when the user's own `.git` state is dirty or absent entirely.

use anyhow::{Context, Result};
use git2::{
    Delta, DiffFindOptions, DiffOptions, ErrorCode, IndexAddOption, Oid, Patch, Repository,
    RepositoryInitOptions, Signature, StatusOptions,
};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use super::GitHistory;
use crate::core::{FileDiff, FileStatus};
use crate::errors::NabazError;

const SHADOW_DIR: &str = ".nabazgit";
const CHECKPOINT_MESSAGE: &str = "nabaz checkpoint";

pub struct LocalGitHistory {
    repo: Repository,
    root: PathBuf,
}

impl LocalGitHistory {
    /// Open (or initialize) the shadow repository for the working tree
    /// containing `path`. When the user has a real git repository its worktree
    /// root is reused, otherwise `path` itself becomes the root.
    pub fn open(path: &Path) -> Result<Self> {
        let root = match Repository::discover(path) {
            Ok(user_repo) => user_repo
                .workdir()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| path.to_path_buf()),
            Err(_) => path.to_path_buf(),
        };

        let shadow_path = root.join(SHADOW_DIR);
        let repo = if shadow_path.is_dir() {
            Repository::open(&shadow_path).with_context(|| {
                format!("failed to open shadow repository at {}", shadow_path.display())
            })?
        } else {
            // Initialized bare so libgit2 never writes a `.git` gitlink into
            // the worktree; the worktree is attached below instead.
            let mut opts = RepositoryInitOptions::new();
            opts.bare(true);
            let repo = Repository::init_opts(&shadow_path, &opts).with_context(|| {
                format!(
                    "failed to initialize shadow repository at {}",
                    shadow_path.display()
                )
            })?;
            write_shadow_excludes(&shadow_path)?;
            repo
        };

        repo.set_workdir(&root, false)?;

        Ok(Self { repo, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find_commit(&self, commit_id: &str) -> Result<git2::Commit<'_>> {
        let oid = Oid::from_str(commit_id)
            .map_err(|e| NabazError::history(format!("bad commit id {commit_id}: {e}")))?;
        self.repo
            .find_commit(oid)
            .map_err(|e| NabazError::history(format!("commit {commit_id} not found: {e}")).into())
    }

    fn is_dirty(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses.iter().any(|entry| {
            entry
                .path()
                .map(|p| !p.starts_with(SHADOW_DIR))
                .unwrap_or(true)
        }))
    }
}

/// The shadow gitdir and the user's gitdir must never be checkpointed.
fn write_shadow_excludes(shadow_path: &Path) -> Result<()> {
    let info_dir = shadow_path.join("info");
    fs::create_dir_all(&info_dir)?;
    fs::write(info_dir.join("exclude"), "/.nabazgit/\n/.git/\n")?;
    Ok(())
}

impl GitHistory for LocalGitHistory {
    fn save_all_files(&self) -> Result<()> {
        if !self.is_dirty()? {
            return Ok(());
        }

        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let signature = Signature::now("nabaz", "auto@nabaz.io")?;
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.target())
            .and_then(|oid| self.repo.find_commit(oid).ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let commit_id = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            CHECKPOINT_MESSAGE,
            &tree,
            &parents,
        )?;
        debug!("checkpointed working tree as {commit_id}");
        Ok(())
    }

    fn head(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| NabazError::history(format!("could not resolve HEAD: {e}")))?;
        let commit = head.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    fn commit_parents(&self, commit_id: &str) -> Result<Vec<String>> {
        let commit = self.find_commit(commit_id)?;
        Ok(commit.parent_ids().map(|id| id.to_string()).collect())
    }

    fn file_content(&self, path: &str, commit_id: &str) -> Result<Vec<u8>> {
        let commit = self.find_commit(commit_id)?;
        let tree = commit.tree()?;
        let entry = tree.get_path(Path::new(path)).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                anyhow::Error::from(NabazError::not_found(format!("{path} at {commit_id}")))
            } else {
                NabazError::history(format!("lookup of {path} at {commit_id} failed: {e}")).into()
            }
        })?;
        let object = entry.to_object(&self.repo)?;
        let blob = object
            .peel_to_blob()
            .map_err(|_| NabazError::not_found(format!("{path} at {commit_id} is not a file")))?;
        Ok(blob.content().to_vec())
    }

    fn diff(&self, current_commit_id: &str, older_commit_id: &str) -> Result<Vec<FileDiff>> {
        let old_tree = self.find_commit(older_commit_id)?.tree()?;
        let new_tree = self.find_commit(current_commit_id)?.tree()?;

        let mut opts = DiffOptions::new();
        let mut diff =
            self.repo
                .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))?;
        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let mut file_diffs = Vec::with_capacity(diff.deltas().len());
        for idx in 0..diff.deltas().len() {
            let patch = Patch::from_diff(&diff, idx)?;
            let Some(delta) = diff.get_delta(idx) else {
                continue;
            };

            let status = match delta.status() {
                Delta::Added => FileStatus::Added,
                Delta::Deleted => FileStatus::Removed,
                Delta::Renamed => FileStatus::Renamed,
                Delta::Modified => FileStatus::Modified,
                _ => continue,
            };
            let is_binary = delta.flags().is_binary();

            let path = if status == FileStatus::Removed {
                String::new()
            } else {
                path_to_string(delta.new_file().path())
            };
            let previous_path = if status == FileStatus::Added {
                String::new()
            } else {
                path_to_string(delta.old_file().path())
            };

            let patch_text = match patch {
                Some(mut p) if !is_binary => p
                    .to_buf()
                    .ok()
                    .and_then(|buf| buf.as_str().map(str::to_string))
                    .unwrap_or_default(),
                _ => String::new(),
            };

            file_diffs.push(FileDiff {
                path,
                previous_path,
                status,
                is_binary,
                patch: patch_text,
            });
        }
        Ok(file_diffs)
    }
}

fn path_to_string(path: Option<&Path>) -> String {
    path.map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

//! Function-level source diffing between the working tree and a baseline
//! commit.
//!
//! Only modified, non-binary files participate; added, removed, renamed, and
//! binary files are excluded from function-level analysis (acknowledged
//! limitation of the selection algorithm).

use anyhow::Result;
use log::warn;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::core::{FileDiff, FileStatus, Scope};
use crate::parsers::LanguageParser;
use crate::scm::{CodeDirectory, GitHistory};

pub struct DiffEngine<'a> {
    code: &'a mut CodeDirectory,
    history: &'a dyn GitHistory,
    parser: &'a dyn LanguageParser,
    old_commit_id: String,
}

struct FilePair {
    path: String,
    current: Arc<[u8]>,
    old: Vec<u8>,
}

impl<'a> DiffEngine<'a> {
    pub fn new(
        code: &'a mut CodeDirectory,
        history: &'a dyn GitHistory,
        parser: &'a dyn LanguageParser,
        old_commit_id: impl Into<String>,
    ) -> Self {
        Self {
            code,
            history,
            parser,
            old_commit_id: old_commit_id.into(),
        }
    }

    /// Names of functions whose bodies changed between the baseline commit and
    /// the working tree, across all modified files in `file_diffs`.
    ///
    /// A function present at the baseline is changed when it is gone from the
    /// current file or its source text differs byte-for-byte. Newly introduced
    /// functions are never reported; no historical test could have covered
    /// them. Deleted ones always are; a test that covered a now-deleted
    /// function cannot be trusted without re-running.
    pub fn changed_functions(&mut self, file_diffs: &[FileDiff]) -> Result<HashSet<String>> {
        let mut pairs = Vec::new();
        for file_diff in file_diffs {
            if file_diff.is_binary || file_diff.status != FileStatus::Modified {
                continue;
            }

            let current = self.code.file_content(Path::new(&file_diff.path))?;
            let old = self
                .history
                .file_content(file_diff.old_path(), &self.old_commit_id)?;
            pairs.push(FilePair {
                path: file_diff.path.clone(),
                current,
                old,
            });
        }

        // Each pair is parsed independently; results merge into one set.
        let parser = self.parser;
        let changed = pairs
            .par_iter()
            .map(|pair| changed_in_pair(parser, pair))
            .reduce(HashSet::new, |mut acc, set| {
                acc.extend(set);
                acc
            });
        Ok(changed)
    }
}

/// Per-file comparison. A parse failure on either side drops only this file's
/// contribution, with a warning.
fn changed_in_pair(parser: &dyn LanguageParser, pair: &FilePair) -> HashSet<String> {
    let current_source = String::from_utf8_lossy(&pair.current);
    let old_source = String::from_utf8_lossy(&pair.old);

    let current_functions = match parser.functions(&current_source) {
        Ok(functions) => functions,
        Err(e) => {
            warn!("skipping {} in diff analysis: {e}", pair.path);
            return HashSet::new();
        }
    };
    let old_functions = match parser.functions(&old_source) {
        Ok(functions) => functions,
        Err(e) => {
            warn!("skipping {} (baseline side) in diff analysis: {e}", pair.path);
            return HashSet::new();
        }
    };

    old_functions
        .iter()
        .filter(|(name, old_span)| match current_functions.get(*name) {
            Some(current_span) => {
                current_span.text(&current_source) != old_span.text(&old_source)
            }
            None => true,
        })
        .map(|(name, _)| name.clone())
        .collect()
}

/// Whether any of the changed functions was covered by `scopes`.
pub fn affects(changed_functions: &HashSet<String>, scopes: &[Scope]) -> bool {
    scopes
        .iter()
        .any(|scope| changed_functions.contains(&scope.func_name))
}

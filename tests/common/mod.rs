//! Shared test doubles for the selection pipeline.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use nabaz::core::{FileDiff, NabazRun, Scope, SkippedTest, TestRun};
use nabaz::errors::NabazError;
use nabaz::framework::TestFramework;
use nabaz::scm::GitHistory;
use nabaz::storage::Storage;

/// In-memory history with a fixed HEAD, parent edges, historical file
/// contents, and a canned diff.
pub struct FakeHistory {
    pub head: String,
    pub parents: HashMap<String, Vec<String>>,
    pub files: HashMap<(String, String), Vec<u8>>,
    pub diffs: Vec<FileDiff>,
}

impl FakeHistory {
    pub fn new(head: &str) -> Self {
        Self {
            head: head.to_string(),
            parents: HashMap::new(),
            files: HashMap::new(),
            diffs: Vec::new(),
        }
    }

    pub fn with_file(mut self, path: &str, commit: &str, content: &str) -> Self {
        self.files
            .insert((path.to_string(), commit.to_string()), content.into());
        self
    }

    pub fn with_diff(mut self, diffs: Vec<FileDiff>) -> Self {
        self.diffs = diffs;
        self
    }
}

impl GitHistory for FakeHistory {
    fn save_all_files(&self) -> Result<()> {
        Ok(())
    }

    fn head(&self) -> Result<String> {
        Ok(self.head.clone())
    }

    fn commit_parents(&self, commit_id: &str) -> Result<Vec<String>> {
        self.parents
            .get(commit_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown commit {commit_id}"))
    }

    fn file_content(&self, path: &str, commit_id: &str) -> Result<Vec<u8>> {
        self.files
            .get(&(path.to_string(), commit_id.to_string()))
            .cloned()
            .ok_or_else(|| NabazError::not_found(format!("{path} at {commit_id}")).into())
    }

    fn diff(&self, _current: &str, _older: &str) -> Result<Vec<FileDiff>> {
        Ok(self.diffs.clone())
    }
}

/// In-memory run history. `fail_lookups` simulates a broken store.
#[derive(Default)]
pub struct MemoryStorage {
    pub runs: Vec<NabazRun>,
    pub fail_lookups: bool,
}

impl Storage for MemoryStorage {
    fn save(&mut self, run: &NabazRun) -> Result<()> {
        self.runs.push(run.clone());
        Ok(())
    }

    fn by_run_id(&mut self, run_id: i64) -> Result<Option<NabazRun>> {
        if self.fail_lookups {
            return Err(NabazError::storage("store unavailable").into());
        }
        Ok(self.runs.iter().rev().find(|r| r.run_id == run_id).cloned())
    }

    fn by_commit_id(&mut self, commit_id: &str) -> Result<Option<NabazRun>> {
        if self.fail_lookups {
            return Err(NabazError::storage("store unavailable").into());
        }
        Ok(self
            .runs
            .iter()
            .rev()
            .find(|r| r.commit_id == commit_id)
            .cloned())
    }
}

/// Framework double: a fixed test list; executions echo back canned results.
pub struct FakeFramework {
    pub base_path: PathBuf,
    pub tests: Vec<String>,
    pub results: Vec<TestRun>,
}

impl FakeFramework {
    pub fn new(base_path: &Path, tests: &[&str]) -> Self {
        Self {
            base_path: base_path.to_path_buf(),
            tests: tests.iter().map(|t| t.to_string()).collect(),
            results: Vec::new(),
        }
    }
}

impl TestFramework for FakeFramework {
    fn list_tests(&mut self) -> Result<HashMap<String, String>> {
        Ok(self
            .tests
            .iter()
            .map(|t| (t.clone(), String::new()))
            .collect())
    }

    fn run_tests(
        &mut self,
        tests_to_skip: &HashMap<String, SkippedTest>,
    ) -> Result<(Vec<TestRun>, i32)> {
        let ran: Vec<TestRun> = self
            .results
            .iter()
            .filter(|r| !tests_to_skip.contains_key(&r.name))
            .cloned()
            .collect();
        Ok((ran, 0))
    }

    fn base_path(&self) -> &Path {
        &self.base_path
    }
}

pub fn scope(path: &str, func_name: &str) -> Scope {
    Scope {
        path: path.to_string(),
        func_name: func_name.to_string(),
        start_line: 1,
        start_col: 0,
        end_line: 1,
        end_col: 0,
    }
}

pub fn passing_test(name: &str, covered: &[&str]) -> TestRun {
    TestRun {
        name: name.to_string(),
        success: true,
        time_in_ms: 1.0,
        call_graph: covered.iter().map(|f| scope("lib.rs", f)).collect(),
        test_func_scope: None,
    }
}

pub fn baseline_run(run_id: i64, commit_id: &str, tests_ran: Vec<TestRun>) -> NabazRun {
    NabazRun {
        run_id,
        commit_id: commit_id.to_string(),
        tests_ran,
        tests_skipped: vec![],
        run_duration: 1.0,
        longest_duration: 1.0,
    }
}

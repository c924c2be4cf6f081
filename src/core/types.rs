use serde::{Deserialize, Serialize};

/// A source location observed during a test, later resolved to the enclosing
/// function. Raw coverage scopes carry only the file and line range; `func_name`
/// is filled in by the attribution phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub path: String,
    #[serde(default)]
    pub func_name: String,
    #[serde(rename = "startline")]
    pub start_line: usize,
    #[serde(rename = "startcol")]
    pub start_col: usize,
    #[serde(rename = "endline")]
    pub end_line: usize,
    #[serde(rename = "endcol")]
    pub end_col: usize,
}

/// The span of a function declaration inside one source buffer.
///
/// Parsers translate their AST node types into this plain record immediately;
/// nothing downstream depends on a parser library's node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpan {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl FunctionSpan {
    /// The function's source text within `source`.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start_byte..self.end_byte).unwrap_or("")
    }

    /// Whether a 1-based line number falls within this span.
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

/// Outcome of one test within one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    pub name: String,
    pub success: bool,
    pub time_in_ms: f64,
    pub call_graph: Vec<Scope>,
    pub test_func_scope: Option<Scope>,
}

/// A pointer to the run record holding the authoritative `TestRun` for a test
/// that was not executed this time around. Across chains of consecutive skips
/// `run_id_ref` keeps pointing at the run where the test actually ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTest {
    pub name: String,
    pub run_id_ref: i64,
}

/// One invocation record. Write-once: persisted at the end of an invocation and
/// never mutated, only superseded by newer runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NabazRun {
    pub run_id: i64,
    pub commit_id: String,
    pub tests_ran: Vec<TestRun>,
    pub tests_skipped: Vec<SkippedTest>,
    pub run_duration: f64,
    pub longest_duration: f64,
}

impl NabazRun {
    /// The executed result for `test_name` in this run, if it ran here.
    pub fn test_run(&self, test_name: &str) -> Option<&TestRun> {
        self.tests_ran.iter().find(|t| t.name == test_name)
    }

    /// The skip record for `test_name` in this run, if it was skipped here.
    pub fn skipped_test(&self, test_name: &str) -> Option<&SkippedTest> {
        self.tests_skipped.iter().find(|t| t.name == test_name)
    }

    /// Tests that failed in this run.
    pub fn failed_tests(&self) -> Vec<&TestRun> {
        self.tests_ran.iter().filter(|t| !t.success).collect()
    }
}

/// Nature of a file-level change between two commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

/// One file's entry in a two-commit diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub previous_path: String,
    pub status: FileStatus,
    pub is_binary: bool,
    pub patch: String,
}

impl FileDiff {
    /// Path of the file at the older commit. Falls back to `path` when the
    /// diff did not record a previous path.
    pub fn old_path(&self) -> &str {
        if self.previous_path.is_empty() {
            &self.path
        } else {
            &self.previous_path
        }
    }
}

// Export modules for library usage
pub mod cli;
pub mod core;
pub mod diff;
pub mod engine;
pub mod errors;
pub mod framework;
pub mod parsers;
pub mod runner;
pub mod scm;
pub mod storage;

// Re-export commonly used types
pub use crate::core::{FileDiff, FileStatus, FunctionSpan, NabazRun, Scope, SkippedTest, TestRun};

pub use crate::diff::{affects, DiffEngine};

pub use crate::engine::{ParseCache, TestEngine};

pub use crate::errors::NabazError;

pub use crate::framework::{parse_per_test_profile, CommandFramework, TestFramework};

pub use crate::parsers::{new_parser, Language, LanguageParser, PythonParser, RustParser};

pub use crate::runner::{run_invocation, RunOutcome};

pub use crate::scm::{CodeDirectory, GitHistory, LocalGitHistory};

pub use crate::storage::{SqliteStorage, Storage};

//! Test framework collaborator contract.
//!
//! Concrete backends own subprocess orchestration of the underlying test
//! runner; the selection pipeline only consumes this trait plus the per-test
//! coverage profile format in [`profile`].

pub mod command;
pub mod profile;

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

use crate::core::{SkippedTest, TestRun};

pub use command::CommandFramework;
pub use profile::parse_per_test_profile;

pub trait TestFramework {
    /// All currently known tests, name to package/module.
    fn list_tests(&mut self) -> Result<HashMap<String, String>>;

    /// Execute every listed test not present in `tests_to_skip`; returns the
    /// per-test results (with raw, unattributed coverage scopes) and the
    /// backend's exit code.
    fn run_tests(&mut self, tests_to_skip: &HashMap<String, SkippedTest>)
        -> Result<(Vec<TestRun>, i32)>;

    /// Root used to resolve relative coverage paths.
    fn base_path(&self) -> &Path;
}

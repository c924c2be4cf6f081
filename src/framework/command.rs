//! Generic external-command backend.
//!
//! For runners without a dedicated adapter: one command lists tests, another
//! executes them. The contract with the run command is environment-based:
//!
//! - `NABAZ_SKIP`    — newline-separated test names to skip
//! - `NABAZ_RESULTS` — file the command must fill with a JSON array of
//!   `{"name", "success", "duration_ms"}` objects, one per executed test
//! - `NABAZ_PROFILE` — file the command must fill with the per-test coverage
//!   profile understood by [`profile::parse_per_test_profile`]

use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{profile, TestFramework};
use crate::core::{SkippedTest, TestRun};

pub struct CommandFramework {
    base_path: PathBuf,
    list_cmd: String,
    run_cmd: String,
    tests: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CommandTestResult {
    name: String,
    success: bool,
    #[serde(default)]
    duration_ms: f64,
}

impl CommandFramework {
    pub fn new(base_path: impl Into<PathBuf>, list_cmd: String, run_cmd: String) -> Self {
        Self {
            base_path: base_path.into(),
            list_cmd,
            run_cmd,
            tests: HashMap::new(),
        }
    }

    fn shell(&self, cmdline: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(cmdline).current_dir(&self.base_path);
        cmd
    }
}

impl TestFramework for CommandFramework {
    fn list_tests(&mut self) -> Result<HashMap<String, String>> {
        if !self.tests.is_empty() {
            return Ok(self.tests.clone());
        }

        let output = self
            .shell(&self.list_cmd)
            .output()
            .with_context(|| format!("failed to spawn list command: {}", self.list_cmd))?;
        if !output.status.success() {
            anyhow::bail!(
                "list command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        // One test per line: "name" or "name package".
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (name, package) = match line.split_once(char::is_whitespace) {
                Some((name, package)) => (name, package.trim()),
                None => (line, ""),
            };
            self.tests.insert(name.to_string(), package.to_string());
        }
        Ok(self.tests.clone())
    }

    fn run_tests(
        &mut self,
        tests_to_skip: &HashMap<String, SkippedTest>,
    ) -> Result<(Vec<TestRun>, i32)> {
        let results_file = tempfile::NamedTempFile::new()?;
        let profile_file = tempfile::NamedTempFile::new()?;

        let skip_list = tests_to_skip
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");

        let status = self
            .shell(&self.run_cmd)
            .env("NABAZ_SKIP", skip_list)
            .env("NABAZ_RESULTS", results_file.path())
            .env("NABAZ_PROFILE", profile_file.path())
            .status()
            .with_context(|| format!("failed to spawn run command: {}", self.run_cmd))?;
        let exit_code = status.code().unwrap_or(-1);

        let raw_results = fs::read_to_string(results_file.path())?;
        let results: Vec<CommandTestResult> = if raw_results.trim().is_empty() {
            vec![]
        } else {
            serde_json::from_str(&raw_results).context("run command wrote malformed results")?
        };

        let mut coverage = match fs::read_to_string(profile_file.path()) {
            Ok(text) => profile::parse_per_test_profile(&text),
            Err(e) => {
                warn!("no coverage profile produced: {e}");
                HashMap::new()
            }
        };

        let test_runs = results
            .into_iter()
            .map(|result| TestRun {
                call_graph: coverage.remove(&result.name).unwrap_or_default(),
                name: result.name,
                success: result.success,
                time_in_ms: result.duration_ms,
                test_func_scope: None,
            })
            .collect();

        Ok((test_runs, exit_code))
    }

    fn base_path(&self) -> &Path {
        &self.base_path
    }
}

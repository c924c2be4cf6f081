//! Impact selection: decide which tests the current change set can affect.
//!
//! The engine runs two explicit, sequential phases per invocation. Selection
//! first (which tests to run, judged against the baseline run's coverage),
//! then, after execution, attribution (resolving this run's raw coverage
//! scopes to function names). Interleaving them would mean attributing
//! coverage for tests that were never executed.

use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::core::{FunctionSpan, NabazRun, Scope, SkippedTest, TestRun};
use crate::diff::{affects, DiffEngine};
use crate::framework::TestFramework;
use crate::parsers::LanguageParser;
use crate::scm::{CodeDirectory, GitHistory};
use crate::storage::Storage;

/// Per-invocation memo of parsed function maps, keyed by file path.
///
/// Constructed fresh for every invocation and passed into the attribution
/// step; a process-wide cache would leak stale parses across working-tree
/// changes.
#[derive(Default)]
pub struct ParseCache {
    parsed: HashMap<PathBuf, Option<HashMap<String, FunctionSpan>>>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the function enclosing `line` in `path`, parsing the file at
    /// most once. `None` on parse failure or when the line is outside every
    /// known function.
    fn resolve(
        &mut self,
        parser: &dyn LanguageParser,
        path: &Path,
        source: &str,
        line: usize,
    ) -> Option<String> {
        let functions = self
            .parsed
            .entry(path.to_path_buf())
            .or_insert_with(|| match parser.functions(source) {
                Ok(functions) => Some(functions),
                Err(e) => {
                    warn!("cannot attribute coverage in {}: {e}", path.display());
                    None
                }
            })
            .as_ref()?;

        functions
            .iter()
            .find(|(_, span)| span.contains_line(line))
            .map(|(name, _)| name.clone())
    }
}

pub struct TestEngine<'a> {
    code: &'a mut CodeDirectory,
    storage: &'a mut dyn Storage,
    framework: &'a mut dyn TestFramework,
    parser: &'a dyn LanguageParser,
    history: &'a dyn GitHistory,
    commit_id: String,
    last_run: Option<NabazRun>,
}

impl<'a> TestEngine<'a> {
    /// Resolve HEAD and the most recent usable baseline run.
    pub fn new(
        code: &'a mut CodeDirectory,
        storage: &'a mut dyn Storage,
        framework: &'a mut dyn TestFramework,
        parser: &'a dyn LanguageParser,
        history: &'a dyn GitHistory,
    ) -> Result<Self> {
        let commit_id = history.head()?;
        let last_run = resolve_baseline(storage, history, &commit_id);
        Ok(Self {
            code,
            storage,
            framework,
            parser,
            history,
            commit_id,
            last_run,
        })
    }

    pub fn commit_id(&self) -> &str {
        &self.commit_id
    }

    pub fn baseline(&self) -> Option<&NabazRun> {
        self.last_run.as_ref()
    }

    /// Which tests can be skipped, and how many tests exist in total.
    ///
    /// Without a baseline the count is `-1`: "no information, run everything"
    /// is distinct from "baseline present but nothing skippable".
    pub fn tests_to_skip(&mut self) -> Result<(HashMap<String, SkippedTest>, i64)> {
        let Some(baseline) = self.last_run.clone() else {
            info!("no baseline run found, running all tests");
            return Ok((HashMap::new(), -1));
        };

        let tests: Vec<String> = self.framework.list_tests()?.into_keys().collect();
        info!(
            "baseline run {} at commit {}, deciding among {} tests",
            baseline.run_id,
            baseline.commit_id,
            tests.len()
        );
        let to_skip = self.decide_which_tests_to_skip(&tests, &baseline);
        Ok((to_skip, tests.len() as i64))
    }

    fn decide_which_tests_to_skip(
        &mut self,
        tests: &[String],
        baseline: &NabazRun,
    ) -> HashMap<String, SkippedTest> {
        let changed_functions = match self.changed_functions_since(baseline) {
            Ok(changed) => changed,
            Err(e) => {
                // Cannot establish what changed, run everything.
                warn!("diff against baseline failed, running all tests: {e:#}");
                return HashMap::new();
            }
        };
        debug!("changed functions since baseline: {changed_functions:?}");

        let mut to_skip = HashMap::new();
        for test_name in tests {
            let prior_skip = baseline.skipped_test(test_name).cloned();
            let mut ran_test = baseline.test_run(test_name).cloned();

            if prior_skip.is_none() && ran_test.is_none() {
                continue; // new test, always runs
            }

            if let Some(skipped) = &prior_skip {
                // Skipped last time; the authoritative result lives in the run
                // the skip record points at.
                ran_test = match self.storage.by_run_id(skipped.run_id_ref) {
                    Ok(Some(authoritative)) => authoritative.test_run(test_name).cloned(),
                    Ok(None) => None,
                    Err(e) => {
                        warn!("lookup of run {} failed: {e}", skipped.run_id_ref);
                        None
                    }
                };
            }
            let Some(ran_test) = ran_test else {
                continue; // dangling reference, cannot verify, run it
            };

            let mut scopes = ran_test.call_graph.clone();
            if let Some(test_func_scope) = &ran_test.test_func_scope {
                scopes.push(test_func_scope.clone());
            }

            if !ran_test.success || affects(&changed_functions, &scopes) {
                continue;
            }

            // Keep an inherited reference as-is so a skip chain stays anchored
            // at the run that actually executed the test.
            let skipped = prior_skip.unwrap_or_else(|| SkippedTest {
                name: ran_test.name.clone(),
                run_id_ref: baseline.run_id,
            });
            to_skip.insert(ran_test.name.clone(), skipped);
        }
        to_skip
    }

    fn changed_functions_since(&mut self, baseline: &NabazRun) -> Result<HashSet<String>> {
        let file_diffs = self.history.diff(&self.commit_id, &baseline.commit_id)?;
        let mut diff_engine = DiffEngine::new(
            self.code,
            self.history,
            self.parser,
            baseline.commit_id.clone(),
        );
        diff_engine.changed_functions(&file_diffs)
    }

    /// Execute all listed tests not present in `tests_to_skip`.
    pub fn run_tests(
        &mut self,
        tests_to_skip: &HashMap<String, SkippedTest>,
    ) -> Result<(Vec<TestRun>, i32)> {
        self.framework.run_tests(tests_to_skip)
    }

    /// Attribution phase: resolve each raw coverage scope to its enclosing
    /// function name, then deduplicate every call graph by resolved name
    /// (first occurrence wins). Scopes that resolve to no function, e.g.
    /// top-level statements, are dropped.
    pub fn attribute_coverage(
        &mut self,
        test_runs: &mut [TestRun],
        parse_cache: &mut ParseCache,
    ) -> Result<()> {
        let base_path = self.framework.base_path().to_path_buf();

        for test_run in test_runs.iter_mut() {
            for scope in &mut test_run.call_graph {
                let full_path = base_path.join(&scope.path);
                let content = match self.code.file_content(&full_path) {
                    Ok(content) => content,
                    Err(e) => {
                        debug!("unreadable coverage path {}: {e}", full_path.display());
                        continue;
                    }
                };
                let source = String::from_utf8_lossy(&content);
                if let Some(func_name) =
                    parse_cache.resolve(self.parser, &full_path, &source, scope.start_line)
                {
                    scope.func_name = func_name;
                }
            }

            test_run.call_graph.retain(|s| !s.func_name.is_empty());
            dedup_by_func_name(&mut test_run.call_graph);
        }
        Ok(())
    }

    /// Assemble the invocation record. The run id is wall-clock derived so
    /// "most recent" orderings fall out of the id itself; `longest_duration`
    /// is the running maximum carried forward from the baseline.
    ///
    /// A name must never appear in both `tests_ran` and `tests_skipped` of one
    /// record. Backends are not trusted to honor the skip set, so any skip
    /// entry shadowed by an executed result is dropped here.
    pub fn build_run(
        &self,
        mut tests_to_skip: HashMap<String, SkippedTest>,
        tests_ran: Vec<TestRun>,
        run_duration: f64,
    ) -> NabazRun {
        for test_run in &tests_ran {
            if tests_to_skip.remove(&test_run.name).is_some() {
                warn!(
                    "{} was executed despite being selected for skipping, keeping the executed result",
                    test_run.name
                );
            }
        }

        let longest_duration = self
            .last_run
            .as_ref()
            .map(|baseline| baseline.longest_duration.max(run_duration))
            .unwrap_or(run_duration);

        NabazRun {
            run_id: Utc::now().timestamp_millis(),
            commit_id: self.commit_id.clone(),
            tests_ran,
            tests_skipped: tests_to_skip.into_values().collect(),
            run_duration,
            longest_duration,
        }
    }

    pub fn persist(&mut self, run: &NabazRun) -> Result<()> {
        self.storage.save(run)
    }
}

/// Walk ancestry from `head` until a commit with a persisted run is found.
/// The walk only follows single-parent edges; root and merge commits end it
/// (merge histories conservatively degrade to "no baseline"). Store or
/// history errors degrade the same way rather than aborting the invocation.
fn resolve_baseline(
    storage: &mut dyn Storage,
    history: &dyn GitHistory,
    head: &str,
) -> Option<NabazRun> {
    let mut current = head.to_string();
    loop {
        match storage.by_commit_id(&current) {
            Ok(Some(run)) => return Some(run),
            Ok(None) => {}
            Err(e) => {
                warn!("run history lookup for {current} failed, treating as no baseline: {e}");
                return None;
            }
        }

        let parents = match history.commit_parents(&current) {
            Ok(parents) => parents,
            Err(e) => {
                warn!("cannot read parents of {current}, treating as no baseline: {e}");
                return None;
            }
        };
        if parents.len() != 1 {
            return None;
        }
        current = parents.into_iter().next()?;
    }
}

fn dedup_by_func_name(scopes: &mut Vec<Scope>) {
    let mut seen = HashSet::new();
    scopes.retain(|scope| seen.insert(scope.func_name.clone()));
}

//! One full invocation: checkpoint, select, execute, attribute, persist.

use anyhow::Result;
use log::info;
use std::time::Instant;

use crate::engine::{ParseCache, TestEngine};
use crate::framework::TestFramework;
use crate::parsers::LanguageParser;
use crate::scm::{CodeDirectory, GitHistory};
use crate::storage::Storage;

/// What an invocation did, for the caller to report.
#[derive(Debug)]
pub struct RunOutcome {
    /// The persisted record, or `None` when nothing was impacted and no new
    /// record was written.
    pub run_id: Option<i64>,
    pub tests_ran: usize,
    pub tests_skipped: usize,
    pub exit_code: i32,
}

pub fn run_invocation(
    code: &mut CodeDirectory,
    storage: &mut dyn Storage,
    framework: &mut dyn TestFramework,
    parser: &dyn LanguageParser,
    history: &dyn GitHistory,
) -> Result<RunOutcome> {
    let start = Instant::now();

    history.save_all_files()?;
    let mut engine = TestEngine::new(code, storage, framework, parser, history)?;

    let (tests_to_skip, total_tests) = engine.tests_to_skip()?;

    // A baseline exists and every known test is skippable: nothing to do,
    // and no new record is written.
    if total_tests >= 0 && tests_to_skip.len() as i64 == total_tests {
        info!("no tests were impacted");
        return Ok(RunOutcome {
            run_id: None,
            tests_ran: 0,
            tests_skipped: tests_to_skip.len(),
            exit_code: 0,
        });
    }

    let (mut test_results, exit_code) = engine.run_tests(&tests_to_skip)?;
    info!(
        "ran {}/{} tests",
        test_results.len(),
        test_results.len() + tests_to_skip.len()
    );

    let mut parse_cache = ParseCache::new();
    engine.attribute_coverage(&mut test_results, &mut parse_cache)?;

    let run = engine.build_run(tests_to_skip, test_results, start.elapsed().as_secs_f64());
    engine.persist(&run)?;

    Ok(RunOutcome {
        run_id: Some(run.run_id),
        tests_ran: run.tests_ran.len(),
        tests_skipped: run.tests_skipped.len(),
        exit_code,
    })
}

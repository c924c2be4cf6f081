//! Full pipeline over a real shadow repository, SQLite run history, and an
//! external-command backend: checkpoint, select, execute, attribute, persist.

use nabaz::framework::CommandFramework;
use nabaz::parsers::RustParser;
use nabaz::runner::{run_invocation, RunOutcome};
use nabaz::scm::{CodeDirectory, LocalGitHistory};
use nabaz::storage::{SqliteStorage, Storage};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const MATH_RS: &str = "\
pub fn add(a: i32, b: i32) -> i32 {
    a + b
}

pub fn sub(a: i32, b: i32) -> i32 {
    a - b
}
";

const MATH_RS_ADD_CHANGED: &str = "\
pub fn add(a: i32, b: i32) -> i32 {
    b + a
}

pub fn sub(a: i32, b: i32) -> i32 {
    a - b
}
";

const MATH_RS_ADD_CHANGED_AGAIN: &str = "\
pub fn add(a: i32, b: i32) -> i32 {
    a + b + 0
}

pub fn sub(a: i32, b: i32) -> i32 {
    a - b
}
";

const LIST_CMD: &str = r"printf 'TestAdd\nTestSub\n'";

// Executes every test not named in NABAZ_SKIP and emits the results JSON
// plus a per-test coverage profile pointing into src/math.rs.
const RUNNER_SH: &str = r#"
out="["
sep=""
for t in TestAdd TestSub; do
  case "$NABAZ_SKIP" in *"$t"*) continue ;; esac
  out="$out$sep{\"name\":\"$t\",\"success\":true,\"duration_ms\":1.0}"
  sep=","
done
printf '%s]' "$out" > "$NABAZ_RESULTS"
{
  printf 'mode: set\n'
  printf '_testName:TestAdd\nsrc/math.rs:2.0,2.9 1 1\n'
  printf '_testName:TestSub\nsrc/math.rs:6.0,6.9 1 1\n'
} > "$NABAZ_PROFILE"
"#;

fn invoke(root: &Path, db: &Path) -> RunOutcome {
    // Run ids are wall-clock derived; keep consecutive invocations apart.
    std::thread::sleep(Duration::from_millis(25));

    let history = LocalGitHistory::open(root).unwrap();
    let mut code = CodeDirectory::new(history.root());
    let mut storage = SqliteStorage::open(db).unwrap();
    let mut framework = CommandFramework::new(
        history.root(),
        LIST_CMD.to_string(),
        "sh runner.sh".to_string(),
    );
    run_invocation(
        &mut code,
        &mut storage,
        &mut framework,
        &RustParser,
        &history,
    )
    .unwrap()
}

#[test]
fn select_execute_attribute_persist_across_invocations() {
    let dir = TempDir::new().unwrap();
    // The run history lives outside the worktree so checkpoints never pick
    // up the database file itself.
    let db_dir = TempDir::new().unwrap();
    let db = db_dir.path().join("nabaz.db");
    fs::create_dir(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/math.rs"), MATH_RS).unwrap();
    fs::write(dir.path().join("runner.sh"), RUNNER_SH).unwrap();

    // First invocation: no baseline, everything runs.
    let first = invoke(dir.path(), &db);
    assert_eq!(first.tests_ran, 2);
    assert_eq!(first.tests_skipped, 0);
    let first_id = first.run_id.unwrap();

    // Coverage was attributed to function names before persisting.
    let mut storage = SqliteStorage::open(&db).unwrap();
    let record = storage.by_run_id(first_id).unwrap().unwrap();
    let add_test = record.test_run("TestAdd").unwrap();
    assert_eq!(add_test.call_graph.len(), 1);
    assert_eq!(add_test.call_graph[0].func_name, "add");
    assert_eq!(record.test_run("TestSub").unwrap().call_graph[0].func_name, "sub");
    drop(storage);

    // Unchanged tree: everything is skippable, nothing executes, and no new
    // record is written.
    let second = invoke(dir.path(), &db);
    assert!(second.run_id.is_none());
    assert_eq!(second.tests_ran, 0);
    assert_eq!(second.tests_skipped, 2);

    // Change add's body: only TestAdd is impacted.
    fs::write(dir.path().join("src/math.rs"), MATH_RS_ADD_CHANGED).unwrap();
    let third = invoke(dir.path(), &db);
    assert_eq!(third.tests_ran, 1);
    assert_eq!(third.tests_skipped, 1);
    let third_id = third.run_id.unwrap();

    let mut storage = SqliteStorage::open(&db).unwrap();
    let record = storage.by_run_id(third_id).unwrap().unwrap();
    assert!(record.test_run("TestAdd").is_some());
    // TestSub's skip record points at the run that actually executed it.
    assert_eq!(record.skipped_test("TestSub").unwrap().run_id_ref, first_id);
    drop(storage);

    // Change add again: the skip chain for TestSub keeps pointing at the
    // original executing run, not at the previous skip-only record.
    fs::write(dir.path().join("src/math.rs"), MATH_RS_ADD_CHANGED_AGAIN).unwrap();
    let fourth = invoke(dir.path(), &db);
    assert_eq!(fourth.tests_ran, 1);
    assert_eq!(fourth.tests_skipped, 1);

    let mut storage = SqliteStorage::open(&db).unwrap();
    let record = storage.by_run_id(fourth.run_id.unwrap()).unwrap().unwrap();
    assert_eq!(record.skipped_test("TestSub").unwrap().run_id_ref, first_id);

    // longest_duration is a running maximum carried from the baseline.
    assert!(record.longest_duration >= record.run_duration);
}

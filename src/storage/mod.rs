//! Persistence of invocation records.

pub mod sqlite;

use anyhow::Result;

use crate::core::NabazRun;

pub use sqlite::SqliteStorage;

/// Append-only store of immutable run records.
///
/// Lookups return `Ok(None)` when no matching record exists; that is not an
/// error. When several records share a commit id (a commit re-run multiple
/// times) the most recently inserted one wins.
pub trait Storage {
    fn save(&mut self, run: &NabazRun) -> Result<()>;

    fn by_run_id(&mut self, run_id: i64) -> Result<Option<NabazRun>>;

    fn by_commit_id(&mut self, commit_id: &str) -> Result<Option<NabazRun>>;
}

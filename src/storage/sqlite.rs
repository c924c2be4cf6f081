//! SQLite-backed run history.
//!
//! `tests_ran` and `tests_skipped` are stored as JSON blobs; an in-process
//! cache per lookup key avoids re-deserializing them on repeat queries within
//! one invocation.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::Storage;
use crate::core::NabazRun;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS nabaz_runs (
        run_id INTEGER PRIMARY KEY,
        commit_id TEXT,
        tests_ran TEXT,
        tests_skipped TEXT,
        run_duration REAL,
        longest_duration REAL
    )
";

const SELECT_COLUMNS: &str =
    "run_id, commit_id, tests_ran, tests_skipped, run_duration, longest_duration";

pub struct SqliteStorage {
    conn: Connection,
    cache_by_run_id: HashMap<i64, NabazRun>,
    cache_by_commit_id: HashMap<String, NabazRun>,
}

/// A freshly fetched row before its JSON blobs are decoded.
struct RawRow {
    run_id: i64,
    commit_id: String,
    tests_ran: String,
    tests_skipped: String,
    run_duration: f64,
    longest_duration: f64,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open run history at {}", path.display()))?;
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self {
            conn,
            cache_by_run_id: HashMap::new(),
            cache_by_commit_id: HashMap::new(),
        })
    }

    /// Default on-disk location: the user cache directory, falling back to the
    /// OS temp directory.
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("nabaz")
            .join("nabaz.db")
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&Self::default_path())
    }

    fn decode(raw: RawRow) -> Result<NabazRun> {
        Ok(NabazRun {
            run_id: raw.run_id,
            commit_id: raw.commit_id,
            tests_ran: serde_json::from_str(&raw.tests_ran)
                .context("corrupt tests_ran blob in run history")?,
            tests_skipped: serde_json::from_str(&raw.tests_skipped)
                .context("corrupt tests_skipped blob in run history")?,
            run_duration: raw.run_duration,
            longest_duration: raw.longest_duration,
        })
    }

    fn query_one<P: rusqlite::ToSql>(&self, where_clause: &str, param: P) -> Result<Option<NabazRun>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM nabaz_runs WHERE {where_clause} ORDER BY run_id DESC LIMIT 1"
        );
        let raw = self
            .conn
            .query_row(&sql, [param], |row| {
                Ok(RawRow {
                    run_id: row.get(0)?,
                    commit_id: row.get(1)?,
                    tests_ran: row.get(2)?,
                    tests_skipped: row.get(3)?,
                    run_duration: row.get(4)?,
                    longest_duration: row.get(5)?,
                })
            })
            .optional()?;

        raw.map(Self::decode).transpose()
    }
}

impl Storage for SqliteStorage {
    fn save(&mut self, run: &NabazRun) -> Result<()> {
        let tests_ran = serde_json::to_string(&run.tests_ran)?;
        let tests_skipped = serde_json::to_string(&run.tests_skipped)?;

        self.conn.execute(
            "INSERT INTO nabaz_runs (
                run_id, commit_id, tests_ran, tests_skipped, run_duration, longest_duration
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.run_id,
                run.commit_id,
                tests_ran,
                tests_skipped,
                run.run_duration,
                run.longest_duration
            ],
        )?;

        // Keep the caches consistent with "most recent insert wins".
        self.cache_by_run_id.insert(run.run_id, run.clone());
        self.cache_by_commit_id
            .insert(run.commit_id.clone(), run.clone());
        Ok(())
    }

    fn by_run_id(&mut self, run_id: i64) -> Result<Option<NabazRun>> {
        if let Some(run) = self.cache_by_run_id.get(&run_id) {
            return Ok(Some(run.clone()));
        }

        let run = self.query_one("run_id = ?1", run_id)?;
        if let Some(run) = &run {
            self.cache_by_run_id.insert(run_id, run.clone());
        }
        Ok(run)
    }

    fn by_commit_id(&mut self, commit_id: &str) -> Result<Option<NabazRun>> {
        if let Some(run) = self.cache_by_commit_id.get(commit_id) {
            return Ok(Some(run.clone()));
        }

        let run = self.query_one("commit_id = ?1", commit_id)?;
        if let Some(run) = &run {
            self.cache_by_commit_id
                .insert(commit_id.to_string(), run.clone());
        }
        Ok(run)
    }
}

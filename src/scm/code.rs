//! Read-through byte cache over the working tree.
//!
//! One `CodeDirectory` is created per invocation and discarded afterwards; the
//! working tree may change between invocations, so cached content is never
//! reused across them.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct CodeDirectory {
    root: PathBuf,
    cache: HashMap<PathBuf, Arc<[u8]>>,
}

impl CodeDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current content of a file, relative paths resolved against the root.
    /// Repeat lookups for the same path hit the in-memory cache.
    pub fn file_content(&mut self, file_path: &Path) -> Result<Arc<[u8]>> {
        if let Some(content) = self.cache.get(file_path) {
            return Ok(Arc::clone(content));
        }

        let full_path = if file_path.is_absolute() {
            file_path.to_path_buf()
        } else {
            self.root.join(file_path)
        };

        let bytes = fs::read(&full_path)
            .with_context(|| format!("failed to read {}", full_path.display()))?;
        let content: Arc<[u8]> = Arc::from(bytes);
        self.cache.insert(file_path.to_path_buf(), Arc::clone(&content));
        Ok(content)
    }
}

//! # Database Builder
//!
//! Fluent configuration for opening a database. [`Database::open`] is the
//! defaults-only shorthand; the builder exists for the two knobs worth
//! turning:
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `cache_pages` | 100 | LRU page cache capacity, in pages |
//! | `max_depth` | 1000 | B-tree recursion budget |
//!
//! ```ignore
//! let db = Database::builder()
//!     .path("big.sqlite")
//!     .cache_pages(1024)
//!     .open()?;
//! ```

use std::path::{Path, PathBuf};

use eyre::Result;

use crate::config::{DEFAULT_CACHE_PAGES, MAX_BTREE_DEPTH};
use crate::database::Database;

/// Builder for [`Database`].
#[derive(Debug, Clone)]
pub struct DatabaseBuilder {
    path: Option<PathBuf>,
    cache_pages: usize,
    max_depth: usize,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self {
            path: None,
            cache_pages: DEFAULT_CACHE_PAGES,
            max_depth: MAX_BTREE_DEPTH,
        }
    }

    /// The database file to open.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_owned());
        self
    }

    /// LRU page cache capacity, in pages.
    pub fn cache_pages(mut self, pages: usize) -> Self {
        self.cache_pages = pages;
        self
    }

    /// B-tree recursion budget. Trees deeper than this fail with
    /// [`Error::TreeTooDeep`](crate::Error::TreeTooDeep).
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Opens the database.
    pub fn open(self) -> Result<Database> {
        let path = self
            .path
            .ok_or_else(|| eyre::eyre!("no database path configured"))?;
        Database::open_with(&path, self.cache_pages, self.max_depth)
    }
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

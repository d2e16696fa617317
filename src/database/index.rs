//! # Index Handle
//!
//! An [`Index`] is a `(database, root page, sql)` triple plus the
//! [`KeyDef`] its seeks compare under. For an index on a rowid table the
//! stored records end with the rowid; for a `WITHOUT ROWID` table's index
//! the trailing columns are whatever the table stores.
//!
//! The default key definition compares every column `BINARY` ascending.
//! A caller holding the parsed `CREATE INDEX` statement (per-column
//! `COLLATE` and `ASC`/`DESC`) supplies the real one via
//! [`Index::with_key_def`]; seeks on text columns with an unresolvable
//! collation fail the moment the comparison is attempted, not before.

use std::cmp::Ordering;

use eyre::Result;

use crate::database::Database;
use crate::records::compare::KeyDef;
use crate::records::{parse_record, Record, Value};

/// Handle to one index of an open database.
#[derive(Debug)]
pub struct Index<'db> {
    db: &'db Database,
    root: u32,
    sql: String,
    key_def: KeyDef,
}

impl<'db> Index<'db> {
    pub(crate) fn new(db: &'db Database, root: u32, sql: String) -> Self {
        Self {
            db,
            root,
            sql,
            key_def: KeyDef::default(),
        }
    }

    /// The `CREATE INDEX` statement from `sqlite_master`; empty for
    /// implicit auto-indexes.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Replaces the key definition used by [`Index::scan_min`],
    /// [`Index::scan_eq`], and their comparisons.
    pub fn with_key_def(mut self, key_def: KeyDef) -> Self {
        self.key_def = key_def;
        self
    }

    /// Calls `cb` for every entry in index order. Stop by returning
    /// `true`.
    pub fn scan<F>(&self, mut cb: F) -> Result<()>
    where
        F: FnMut(Record) -> bool,
    {
        let root = self.db.index_btree(self.root)?;
        root.iter(self.db.max_depth(), self.db, &mut |payload| {
            let bytes = payload.assemble(self.db)?;
            Ok(cb(parse_record(&bytes)?))
        })?;
        Ok(())
    }

    /// Calls `cb` for every entry from the first one `>= key` onward.
    pub fn scan_min<F>(&self, key: &[Value], mut cb: F) -> Result<()>
    where
        F: FnMut(Record) -> bool,
    {
        let root = self.db.index_btree(self.root)?;
        root.iter_min(
            self.db.max_depth(),
            self.db,
            key,
            &self.key_def,
            &mut |record| Ok(cb(record)),
        )?;
        Ok(())
    }

    /// Calls `cb` for every entry whose leading columns equal `key`.
    pub fn scan_eq<F>(&self, key: &[Value], mut cb: F) -> Result<()>
    where
        F: FnMut(Record) -> bool,
    {
        let root = self.db.index_btree(self.root)?;
        root.iter_min(
            self.db.max_depth(),
            self.db,
            key,
            &self.key_def,
            &mut |record| {
                // Seeded at the first entry >= key, so the first prefix
                // mismatch is the end of the equal range.
                if self.key_def.compare_prefix(&record, key)? == Ordering::Greater {
                    return Ok(true);
                }
                Ok(cb(record))
            },
        )?;
        Ok(())
    }
}

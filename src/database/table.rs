//! # Table Handle
//!
//! A [`Table`] is a `(database, root page, sql)` triple. Scans hand the
//! user callback the rowid and the decoded record; callbacks return `true`
//! to stop.
//!
//! ## What a Scan Yields
//!
//! Records come back exactly as SQLite stored them, which has a few sharp
//! edges worth knowing:
//!
//! - an `INTEGER PRIMARY KEY` column is stored as NULL, the rowid carries
//!   the value;
//! - rows written before an `ALTER TABLE ... ADD COLUMN` are shorter than
//!   the current schema;
//! - a REAL column may come back as `Value::Int` when the stored value was
//!   integral.
//!
//! ## WITHOUT ROWID Tables
//!
//! A `WITHOUT ROWID` table is stored as an index b-tree keyed by its
//! primary key, so it gets its own scan/seek entry points. Whether a table
//! is one is decided the robust way: by what its root page actually is,
//! not by parsing SQL. The `without_rowid_*` seeks compare under the
//! default `BINARY`-ascending key; a schema layer that knows the real
//! per-column collations would sit above this handle.

use std::cmp::Ordering;

use eyre::Result;

use crate::database::Database;
use crate::records::compare::KeyDef;
use crate::records::{parse_record, Record, Value};

/// Handle to one table of an open database.
#[derive(Debug)]
pub struct Table<'db> {
    db: &'db Database,
    root: u32,
    sql: String,
}

impl<'db> Table<'db> {
    pub(crate) fn new(db: &'db Database, root: u32, sql: String) -> Self {
        Self { db, root, sql }
    }

    /// The `CREATE TABLE` statement from `sqlite_master`, for an external
    /// SQL parser to chew on.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Whether this is a `WITHOUT ROWID` table: its root opens as an index
    /// b-tree instead of a table b-tree.
    pub fn without_rowid(&self) -> bool {
        self.db.index_btree(self.root).is_ok()
    }

    /// Calls `cb` for every row in rowid order. Stop by returning `true`.
    pub fn scan<F>(&self, mut cb: F) -> Result<()>
    where
        F: FnMut(i64, Record) -> bool,
    {
        let root = self.db.table_btree(self.root)?;
        root.iter(self.db.max_depth(), self.db, &mut |rowid, payload| {
            let bytes = payload.assemble(self.db)?;
            Ok(cb(rowid, parse_record(&bytes)?))
        })?;
        Ok(())
    }

    /// Finds a single row by rowid; `None` if there is no such row.
    pub fn rowid(&self, rowid: i64) -> Result<Option<Record>> {
        let root = self.db.table_btree(self.root)?;

        let mut found = None;
        root.iter_min(self.db.max_depth(), self.db, rowid, &mut |r, payload| {
            if r == rowid {
                let bytes = payload.assemble(self.db)?;
                found = Some(parse_record(&bytes)?);
            }
            // The first cell at or past the rowid settles it either way.
            Ok(true)
        })?;
        Ok(found)
    }

    /// Like [`Table::scan`] for `WITHOUT ROWID` tables: rows come in
    /// primary-key order and there is no rowid.
    pub fn without_rowid_scan<F>(&self, mut cb: F) -> Result<()>
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

    /// Scans a `WITHOUT ROWID` table starting at the first row whose key
    /// is `>= key`.
    pub fn without_rowid_scan_min<F>(&self, key: &[Value], mut cb: F) -> Result<()>
    where
        F: FnMut(Record) -> bool,
    {
        let root = self.db.index_btree(self.root)?;
        let def = KeyDef::default();
        root.iter_min(self.db.max_depth(), self.db, key, &def, &mut |record| {
            Ok(cb(record))
        })?;
        Ok(())
    }

    /// Finds a single row of a `WITHOUT ROWID` table by primary key;
    /// `None` if there is no such row.
    pub fn without_rowid_pk(&self, key: &[Value]) -> Result<Option<Record>> {
        let root = self.db.index_btree(self.root)?;
        let def = KeyDef::default();

        let mut found = None;
        root.iter_min(self.db.max_depth(), self.db, key, &def, &mut |record| {
            if def.compare_prefix(key, &record)? == Ordering::Equal {
                found = Some(record);
            }
            Ok(true)
        })?;
        Ok(found)
    }
}

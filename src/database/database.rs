//! # Database Facade
//!
//! [`Database`] ties the layers together: it owns the [`Pager`], the LRU
//! page cache, the parsed header, and the single-slot `sqlite_master`
//! cache, and it is the page source every b-tree traversal reads through.
//!
//! ## Caching
//!
//! Pages are cached as owned bytes keyed by page number; the master list
//! is cached as a whole, *including a failed parse* - rereading a broken
//! schema gives the same error without touching the file again. Both
//! caches are invalidated only by header deltas, never by clock or
//! heuristics.
//!
//! ## `sqlite_master`
//!
//! The schema table is an ordinary table b-tree rooted at page 1. Every
//! row must decode to the canonical 5-tuple
//! `(type, name, tbl_name, rootpage, sql)`; implicit auto-indexes carry a
//! NULL `sql`, which is preserved as an empty string.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eyre::{bail, ensure, Result, WrapErr};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::btree::{decode_page, Btree, IndexPage, TablePage};
use crate::database::builder::DatabaseBuilder;
use crate::database::index::Index;
use crate::database::table::Table;
use crate::error::Error;
use crate::records::{parse_record, Record, Value};
use crate::storage::header::{parse_header, DbHeader};
use crate::storage::journal::journal_is_hot;
use crate::storage::{PageBuf, PageCache, Pager};

/// One row of `sqlite_master`.
#[derive(Debug, Clone)]
pub(crate) struct MasterEntry {
    pub object_type: String,
    pub name: String,
    pub tbl_name: String,
    pub root_page: u32,
    pub sql: String,
}

impl MasterEntry {
    fn from_record(record: Record) -> Result<Self> {
        ensure!(record.len() == 5, Error::InvalidDefinition);
        let mut values = record.into_iter();

        let object_type = match values.next() {
            Some(Value::Text(s)) => s,
            _ => bail!(Error::InvalidDefinition),
        };
        let name = match values.next() {
            Some(Value::Text(s)) => s,
            _ => bail!(Error::InvalidDefinition),
        };
        let tbl_name = match values.next() {
            Some(Value::Text(s)) => s,
            _ => bail!(Error::InvalidDefinition),
        };
        let root_page = match values.next() {
            Some(Value::Int(n)) if (0..=u32::MAX as i64).contains(&n) => n as u32,
            _ => bail!(Error::InvalidDefinition),
        };
        let sql = match values.next() {
            Some(Value::Text(s)) => s,
            // Implicit auto-indexes have no SQL of their own.
            Some(Value::Null) => String::new(),
            _ => bail!(Error::InvalidDefinition),
        };

        Ok(Self {
            object_type,
            name,
            tbl_name,
            root_page,
            sql,
        })
    }
}

type MasterSlot = Result<Arc<Vec<MasterEntry>>, Error>;

/// An open, read-only SQLite database.
#[derive(Debug)]
pub struct Database {
    pager: Pager,
    journal_path: PathBuf,
    max_depth: usize,
    /// Revalidate the header before the next operation when set.
    dirty: AtomicBool,
    header: RwLock<Option<DbHeader>>,
    pages: PageCache,
    master: RwLock<Option<MasterSlot>>,
}

/// The rollback journal lives next to the database as `<path>-journal`.
fn journal_sidecar(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("-journal");
    PathBuf::from(name)
}

impl Database {
    /// Opens a database file with default settings. The main entry point.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// A builder for non-default cache size or recursion budget.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub(crate) fn open_with(path: &Path, cache_pages: usize, max_depth: usize) -> Result<Self> {
        let pager = Pager::open(path)
            .wrap_err_with(|| format!("failed to open '{}'", path.display()))?;

        debug!(path = %path.display(), cache_pages, "opening database");

        let db = Self {
            pager,
            journal_path: journal_sidecar(path),
            max_depth,
            dirty: AtomicBool::new(true),
            header: RwLock::new(None),
            pages: PageCache::new(cache_pages),
            master: RwLock::new(None),
        };
        db.resolve_dirty()?;
        Ok(db)
    }

    /// Re-reads the header if the dirty flag is set, guarding against hot
    /// journals and dropping caches whose header signal moved.
    pub(crate) fn resolve_dirty(&self) -> Result<()> {
        if !self.dirty.load(Ordering::Acquire) {
            return Ok(());
        }

        if journal_is_hot(&self.journal_path)? {
            // A writer holding a RESERVED lock is mid-transaction and will
            // clean its own journal up; without one the journal is a
            // crashed transaction and the file must not be trusted.
            if !self.pager.check_reserved_lock()? {
                warn!(journal = %self.journal_path.display(), "hot rollback journal present");
                return Err(eyre::eyre!(Error::HotJournal)).wrap_err_with(|| {
                    format!("crashed transaction in '{}'", self.journal_path.display())
                });
            }
        }

        let raw = self.pager.header()?;
        let header = parse_header(&raw)?;

        let mut slot = self.header.write();
        if let Some(old) = *slot {
            if old.change_counter != header.change_counter {
                debug!(
                    old = old.change_counter,
                    new = header.change_counter,
                    "change counter moved, dropping page cache"
                );
                self.pages.clear();
            }
            if old.schema_cookie != header.schema_cookie {
                debug!(
                    old = old.schema_cookie,
                    new = header.schema_cookie,
                    "schema cookie moved, dropping master cache"
                );
                *self.master.write() = None;
            }
        }
        *slot = Some(header);
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    /// The validated file header, revalidating first if the dirty flag is
    /// set.
    pub fn header(&self) -> Result<DbHeader> {
        self.resolve_dirty()?;
        Ok(self.current_header())
    }

    fn current_header(&self) -> DbHeader {
        self.header
            .read()
            .expect("header populated by resolve_dirty") // INVARIANT: every caller runs resolve_dirty first
    }

    /// Fetches a page through the cache, copying out of the mapping on a
    /// miss.
    pub(crate) fn page(&self, page_no: u32) -> Result<PageBuf> {
        ensure!(page_no >= 1, Error::InvalidPage);

        if let Some(buf) = self.pages.get(page_no) {
            return Ok(buf);
        }

        let header = self.current_header();
        let bytes = self.pager.page(page_no, header.page_size)?;
        let buf: PageBuf = Arc::from(bytes);
        self.pages.insert(page_no, buf.clone());
        Ok(buf)
    }

    fn btree(&self, page_no: u32) -> Result<Btree> {
        self.resolve_dirty()?;
        decode_page(self.page(page_no)?, page_no == 1)
            .wrap_err_with(|| format!("failed to decode b-tree page {}", page_no))
    }

    pub(crate) fn table_btree(&self, page_no: u32) -> Result<TablePage> {
        match self.btree(page_no)? {
            Btree::Table(page) => Ok(page),
            Btree::Index(_) => Err(eyre::eyre!(Error::Corrupted))
                .wrap_err_with(|| format!("page {} is an index b-tree, expected a table", page_no)),
        }
    }

    pub(crate) fn index_btree(&self, page_no: u32) -> Result<IndexPage> {
        match self.btree(page_no)? {
            Btree::Index(page) => Ok(page),
            Btree::Table(_) => Err(eyre::eyre!(Error::Corrupted))
                .wrap_err_with(|| format!("page {} is a table b-tree, expected an index", page_no)),
        }
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The `sqlite_master` contents, cached until the schema cookie moves.
    /// A parse failure is cached too and repeats without rereading.
    pub(crate) fn master(&self) -> Result<Arc<Vec<MasterEntry>>> {
        self.resolve_dirty()?;

        if let Some(slot) = &*self.master.read() {
            return match slot {
                Ok(entries) => Ok(entries.clone()),
                Err(kind) => Err(eyre::eyre!(kind.clone())),
            };
        }

        let result = self.read_master();
        let slot = match &result {
            Ok(entries) => Ok(entries.clone()),
            Err(report) => Err(report
                .downcast_ref::<Error>()
                .cloned()
                .unwrap_or(Error::Corrupted)),
        };
        *self.master.write() = Some(slot);
        result
    }

    fn read_master(&self) -> Result<Arc<Vec<MasterEntry>>> {
        let root = self.table_btree(1)?;
        let mut entries = Vec::new();
        root.iter(self.max_depth, self, &mut |_rowid, payload| {
            let bytes = payload.assemble(self)?;
            let record = parse_record(&bytes)?;
            entries.push(MasterEntry::from_record(record)?);
            Ok(false)
        })
        .wrap_err("failed to read sqlite_master")?;
        Ok(Arc::new(entries))
    }

    fn object_names(&self, object_type: &str) -> Result<Vec<String>> {
        let master = self.master()?;
        Ok(master
            .iter()
            .filter(|entry| entry.object_type == object_type)
            .map(|entry| entry.name.clone())
            .collect())
    }

    /// All table names, SQLite-internal ones included.
    pub fn tables(&self) -> Result<Vec<String>> {
        self.object_names("table")
    }

    /// All index names.
    pub fn indexes(&self) -> Result<Vec<String>> {
        self.object_names("index")
    }

    /// Opens the named table, or [`Error::NoSuchTable`].
    pub fn table(&self, name: &str) -> Result<Table<'_>> {
        let master = self.master()?;
        for entry in master.iter() {
            if entry.object_type == "table" && entry.name == name {
                return Ok(Table::new(self, entry.root_page, entry.sql.clone()));
            }
        }
        Err(eyre::eyre!(Error::NoSuchTable)).wrap_err_with(|| format!("table '{}'", name))
    }

    /// Opens the named index, or [`Error::NoSuchIndex`].
    pub fn index(&self, name: &str) -> Result<Index<'_>> {
        let master = self.master()?;
        for entry in master.iter() {
            if entry.object_type == "index" && entry.name == name {
                return Ok(Index::new(self, entry.root_page, entry.sql.clone()));
            }
        }
        Err(eyre::eyre!(Error::NoSuchIndex)).wrap_err_with(|| format!("index '{}'", name))
    }

    /// Takes the (no-op) shared read lock and marks the header dirty so
    /// the next operation revalidates it. Don't nest.
    pub fn read_lock(&self) -> Result<()> {
        self.dirty.store(true, Ordering::Release);
        self.pager.read_lock()
    }

    /// Releases the read lock taken by [`Database::read_lock`].
    pub fn read_unlock(&self) -> Result<()> {
        self.pager.read_unlock()
    }

    /// Closes the database, releasing the mapping and the descriptor.
    pub fn close(self) -> Result<()> {
        self.pager.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_sidecar_appends_suffix() {
        assert_eq!(
            journal_sidecar(Path::new("/tmp/foo.sqlite")),
            PathBuf::from("/tmp/foo.sqlite-journal")
        );
        assert_eq!(
            journal_sidecar(Path::new("relative.db")),
            PathBuf::from("relative.db-journal")
        );
    }

    #[test]
    fn master_entry_requires_five_values() {
        let record = vec![
            Value::Text("table".into()),
            Value::Text("t".into()),
            Value::Text("t".into()),
            Value::Int(2),
        ];
        let err = MasterEntry::from_record(record).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::InvalidDefinition));
    }

    #[test]
    fn master_entry_decodes_canonical_row() {
        let record = vec![
            Value::Text("table".into()),
            Value::Text("hello".into()),
            Value::Text("hello".into()),
            Value::Int(2),
            Value::Text("CREATE TABLE hello (a, b, c)".into()),
        ];
        let entry = MasterEntry::from_record(record).unwrap();
        assert_eq!(entry.object_type, "table");
        assert_eq!(entry.name, "hello");
        assert_eq!(entry.root_page, 2);
    }

    #[test]
    fn master_entry_allows_null_sql() {
        let record = vec![
            Value::Text("index".into()),
            Value::Text("sqlite_autoindex_t_1".into()),
            Value::Text("t".into()),
            Value::Int(3),
            Value::Null,
        ];
        let entry = MasterEntry::from_record(record).unwrap();
        assert_eq!(entry.sql, "");
    }

    #[test]
    fn master_entry_rejects_wrong_types() {
        let record = vec![
            Value::Int(1),
            Value::Text("t".into()),
            Value::Text("t".into()),
            Value::Int(2),
            Value::Null,
        ];
        let err = MasterEntry::from_record(record).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::InvalidDefinition));

        let record = vec![
            Value::Text("table".into()),
            Value::Text("t".into()),
            Value::Text("t".into()),
            Value::Text("2".into()),
            Value::Null,
        ];
        let err = MasterEntry::from_record(record).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::InvalidDefinition));
    }
}

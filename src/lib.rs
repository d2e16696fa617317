//! # coldlite - Read-Only SQLite 3 File Reader
//!
//! coldlite opens an existing SQLite 3 database file and exposes logical
//! iteration over its tables and indexes. It never modifies the file and it
//! does not execute SQL: the unit of work is a b-tree traversal, not a query.
//!
//! ## What It Does
//!
//! - Validates the 100-byte file header and rejects databases this reader
//!   cannot serve faithfully (WAL mode, UTF-16 encodings, encrypted files,
//!   unknown schema formats).
//! - Serves fixed-size pages out of a read-only memory mapping, with a
//!   bounded LRU cache owning the page bytes.
//! - Walks the four SQLite b-tree page kinds (table/index x leaf/interior)
//!   in key order, with full scans and seek-from-key, reassembling payloads
//!   that spill into overflow page chains.
//! - Decodes the serial-type record format into typed value vectors and
//!   compares records under column collations and sort directions.
//! - Reads `sqlite_master` to hand out table and index handles by name.
//!
//! ## What It Does Not Do
//!
//! SQL parsing (`CREATE TABLE` ASTs come from an external parser), the write
//! path, transactions, WAL or journal replay, and file locking. A hot
//! rollback journal is detected and refused, never replayed. The file is
//! assumed quiescent; external writers during a live iteration produce
//! undefined results.
//!
//! ## Quick Start
//!
//! ```ignore
//! use coldlite::Database;
//!
//! let db = Database::open("books.sqlite")?;
//! let table = db.table("books")?;
//! table.scan(|rowid, record| {
//!     println!("{rowid}: {record:?}");
//!     false // keep going
//! })?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------+
//! |      Database facade (handles)      |
//! +-------------------------------------+
//! |  B-tree engine  |  Record codec     |
//! |  (4 page kinds, |  (varints, serial |
//! |   overflow)     |   types, compare) |
//! +-------------------------------------+
//! |   Page cache (LRU)  |  Header       |
//! +-------------------------------------+
//! |   Pager (read-only memory map)      |
//! +-------------------------------------+
//! ```
//!
//! ## Error Model
//!
//! Every fallible operation returns [`eyre::Result`]. The stable failure
//! kinds live in [`Error`] and are attached where the failure is decided, so
//! callers can recover them with `report.downcast_ref::<Error>()` regardless
//! of how much context was layered on top.
//!
//! ## Thread Safety
//!
//! A [`Database`] runs its operations to completion on the calling thread.
//! Use one `Database` per thread; the underlying file may be shared.

pub mod btree;
pub mod config;
pub mod database;
pub mod encoding;
pub mod error;
pub mod records;
pub mod storage;

pub use database::{Database, DatabaseBuilder, Index, Table};
pub use error::Error;
pub use records::compare::{cmp, Collation, KeyColumn, KeyDef, SortOrder};
pub use records::{parse_record, Record, RecordBuilder, Value};
pub use storage::header::DbHeader;

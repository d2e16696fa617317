//! # Database Module
//!
//! The facade over everything below: one [`Database`] value owns the pager
//! and both caches, revalidates the file header when the dirty flag is set,
//! reads `sqlite_master`, and hands out [`Table`] and [`Index`] handles
//! that borrow from it.
//!
//! ## Dirty-Flag Protocol
//!
//! The header is the coherence point with external writers. The flag is
//! set on open and by [`Database::read_lock`]; while set, the next
//! operation re-reads and re-validates the header before touching any
//! page:
//!
//! - a **change counter** delta means the file changed: the page cache is
//!   dropped;
//! - a **schema cookie** delta means the schema changed: the cached
//!   `sqlite_master` contents are dropped.
//!
//! A hot rollback journal is checked first and refuses the operation
//! outright; this reader cannot see through a crashed transaction.
//!
//! ## Handles
//!
//! `Table` and `Index` are thin `(db, root page, sql)` handles, valid as
//! long as the database they borrow from. Looking one up costs a linear
//! search of the (cached) master list; traversals start at the handle's
//! root page.
//!
//! ## Module Organization
//!
//! - `database`: the facade itself and the `sqlite_master` reader
//! - `builder`: [`DatabaseBuilder`] (cache size, recursion budget)
//! - `table`: the [`Table`] handle (scans, rowid lookup, WITHOUT ROWID)
//! - `index`: the [`Index`] handle (scans and seeks)

pub mod builder;
#[allow(clippy::module_inception)]
pub mod database;
pub mod index;
pub mod table;

pub use builder::DatabaseBuilder;
pub use database::Database;
pub use index::Index;
pub use table::Table;

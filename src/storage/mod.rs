//! # Storage Module
//!
//! The foundational layer of the reader: a read-only memory-mapped pager,
//! the 100-byte file header, the rollback-journal sidecar check, and the
//! LRU page cache.
//!
//! ## Zero-Copy Reads
//!
//! The pager maps the database file once and serves `&[u8]` slices straight
//! out of the mapping. No syscall happens per page; the OS pages the file in
//! on demand. Page bytes that enter the cache are copied once into an
//! `Arc<[u8]>` the cache owns, and everything above the cache borrows or
//! clones that handle.
//!
//! ## File Layout
//!
//! A SQLite database file is a sequence of equally-sized pages, numbered
//! from 1:
//!
//! ```text
//! Offset 0:              Page 1 (starts with the 100-byte file header)
//! Offset page_size:      Page 2
//! Offset 2 * page_size:  Page 3
//! ...
//! ```
//!
//! The page size is read out of the header and is a power of two between
//! 512 and 65536 (a raw header value of 1 encodes 65536).
//!
//! ## Read-Only Contract
//!
//! Nothing in this module writes. The mapping is created read-only and the
//! file is opened without write access, so even a bug above this layer
//! cannot mutate the database.
//!
//! ## Module Organization
//!
//! - `mmap`: the [`Pager`] (read-only mapping, page fetch, lock hooks)
//! - `header`: header parsing and validation ([`DbHeader`])
//! - `journal`: hot rollback-journal detection
//! - `cache`: the LRU page cache ([`PageCache`])

pub mod cache;
pub mod header;
pub mod journal;
pub mod mmap;

use std::sync::Arc;

pub use cache::PageCache;
pub use header::{parse_header, DbHeader};
pub use mmap::Pager;

/// Size of the SQLite file header at the start of page 1.
pub const HEADER_SIZE: usize = 100;

/// Smallest legal page size.
pub const MIN_PAGE_SIZE: u32 = 512;

/// Largest legal page size. Encoded as a raw header value of 1.
pub const MAX_PAGE_SIZE: u32 = 65536;

/// A page's bytes as owned by the page cache. Cloning is a refcount bump;
/// the b-tree layer consumes pages by borrowing out of this handle.
pub type PageBuf = Arc<[u8]>;

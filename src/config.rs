//! Compile-time defaults. Both values can be overridden per database through
//! [`DatabaseBuilder`](crate::DatabaseBuilder).

/// Number of pages the LRU page cache holds by default. At SQLite's common
/// 4K page size this is ~400KB of cached page bytes.
pub const DEFAULT_CACHE_PAGES: usize = 100;

/// Default recursion budget for b-tree descent. A healthy b-tree is a few
/// levels deep; hitting this bound means a corrupt (usually cyclic) tree.
/// The budget is an explicit counter so the limit does not depend on the
/// host's stack size.
pub const MAX_BTREE_DEPTH: usize = 1000;

//! # LRU Page Cache
//!
//! A bounded cache of page bytes keyed by page number. The cache *owns* the
//! bytes (`Arc<[u8]>`); the b-tree layer consumes pages by cloning the
//! handle out, so a page can be evicted while a traversal still holds it
//! without invalidating anything.
//!
//! ## Why It Exists
//!
//! Pages come out of a memory mapping, so the OS already caches the raw
//! file. What this cache saves is the copy-out: a mapped page is copied
//! into an owned buffer once and every later hit is a refcount bump.
//!
//! ## Eviction
//!
//! Least-recently-used by a monotonic stamp. Lookups take the read lock
//! only: the recency stamp is an `AtomicU64` inside the entry, bumped from
//! a shared counter on every hit. Insertion takes the write lock and, when
//! full, evicts the entry with the smallest stamp using `swap_remove` plus
//! an index fixup for the entry that moved.
//!
//! Eviction order affects memory only, never correctness; invalidation is
//! driven exclusively by file-header deltas through [`PageCache::clear`].
//!
//! ## Thread Safety
//!
//! `PageCache` is `Send + Sync` behind a `parking_lot::RwLock`, which keeps
//! the facade's interior caches coherent. This is not a claim of concurrent
//! throughput; the reader's documented model is one `Database` per thread.

use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;

use super::PageBuf;

#[derive(Debug)]
struct CacheEntry {
    page_no: u32,
    stamp: AtomicU64,
    data: PageBuf,
}

#[derive(Debug)]
struct CacheInner {
    entries: Vec<CacheEntry>,
    index: HashMap<u32, usize>,
}

impl CacheInner {
    fn remove(&mut self, idx: usize) -> CacheEntry {
        let entry = self.entries.swap_remove(idx);
        self.index.remove(&entry.page_no);

        if idx < self.entries.len() {
            let moved = self.entries[idx].page_no;
            self.index.insert(moved, idx);
        }

        entry
    }
}

/// Bounded LRU cache of page bytes, keyed by 1-based page number.
#[derive(Debug)]
pub struct PageCache {
    inner: RwLock<CacheInner>,
    clock: AtomicU64,
    capacity: usize,
}

impl PageCache {
    /// Creates a cache holding at most `capacity` pages. A capacity of 0 is
    /// clamped to 1 so insertion never has to special-case an empty cache.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(CacheInner {
                entries: Vec::with_capacity(capacity),
                index: HashMap::with_capacity(capacity),
            }),
            clock: AtomicU64::new(0),
            capacity,
        }
    }

    /// Returns the cached bytes for `page_no`, refreshing its recency.
    pub fn get(&self, page_no: u32) -> Option<PageBuf> {
        let inner = self.inner.read();
        let idx = *inner.index.get(&page_no)?;
        let entry = &inner.entries[idx];
        entry
            .stamp
            .store(self.clock.fetch_add(1, Ordering::Relaxed) + 1, Ordering::Relaxed);
        Some(entry.data.clone())
    }

    /// Inserts (or replaces) the bytes for `page_no`, evicting the least
    /// recently used entry if the cache is full.
    pub fn insert(&self, page_no: u32, data: PageBuf) {
        let stamp = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        let mut inner = self.inner.write();

        if let Some(&idx) = inner.index.get(&page_no) {
            let entry = &mut inner.entries[idx];
            entry.data = data;
            entry.stamp.store(stamp, Ordering::Relaxed);
            return;
        }

        if inner.entries.len() >= self.capacity {
            let coldest = inner
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.stamp.load(Ordering::Relaxed))
                .map(|(i, _)| i);
            if let Some(idx) = coldest {
                inner.remove(idx);
            }
        }

        let idx = inner.entries.len();
        inner.entries.push(CacheEntry {
            page_no,
            stamp: AtomicU64::new(stamp),
            data,
        });
        inner.index.insert(page_no, idx);
    }

    /// Drops every entry. Called when the file change counter moves.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.index.clear();
    }

    /// Number of cached pages.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

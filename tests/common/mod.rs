//! Shared fixture plumbing: real databases built through rusqlite and raw
//! images crafted byte-by-byte for the corruption and compatibility paths.

#![allow(dead_code)] // each integration test binary uses a subset

use std::path::{Path, PathBuf};

use coldlite::{Error, RecordBuilder, Value};
use rusqlite::Connection;
use tempfile::TempDir;

/// Creates a database under a fresh temp dir and runs `init` on it.
pub fn sqlite_fixture<F>(name: &str, init: F) -> (TempDir, PathBuf)
where
    F: FnOnce(&Connection),
{
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    let conn = Connection::open(&path).unwrap();
    init(&conn);
    conn.close().unwrap();
    (dir, path)
}

/// The stable kind inside a report.
pub fn kind_of(report: &eyre::Report) -> Option<Error> {
    report.downcast_ref::<Error>().cloned()
}

// ---------------------------------------------------------------------------
// Raw image crafting
// ---------------------------------------------------------------------------

pub const ROLLBACK_JOURNAL_MAGIC: [u8; 8] = [0xd9, 0xd5, 0x05, 0xf9, 0x20, 0xa1, 0x63, 0xd7];

const KIND_INDEX_INTERIOR: u8 = 0x02;
const KIND_TABLE_INTERIOR: u8 = 0x05;
const KIND_TABLE_LEAF: u8 = 0x0d;

/// A hand-built database image: fixed-size pages, page 1 carrying the
/// 100-byte header.
pub struct RawDb {
    pub page_size: usize,
    pub pages: Vec<Vec<u8>>,
}

impl RawDb {
    pub fn new(page_size: usize, page_count: usize) -> Self {
        let mut db = Self {
            page_size,
            pages: vec![vec![0u8; page_size]; page_count],
        };
        let header = header_bytes(page_size as u32, 1, 1);
        db.pages[0][..100].copy_from_slice(&header);
        db
    }

    pub fn page_mut(&mut self, page_no: u32) -> &mut [u8] {
        &mut self.pages[page_no as usize - 1]
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.pages.concat()
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.bytes()).unwrap();
    }
}

/// A valid 100-byte header for the given geometry.
pub fn header_bytes(page_size: u32, change_counter: u32, schema_cookie: u32) -> [u8; 100] {
    let mut h = [0u8; 100];
    h[..16].copy_from_slice(b"SQLite format 3\x00");
    let raw_size = if page_size == 65536 { 1u16 } else { page_size as u16 };
    h[16..18].copy_from_slice(&raw_size.to_be_bytes());
    h[18] = 1;
    h[19] = 1;
    h[21] = 64;
    h[22] = 32;
    h[23] = 32;
    h[24..28].copy_from_slice(&change_counter.to_be_bytes());
    h[40..44].copy_from_slice(&schema_cookie.to_be_bytes());
    h[44..48].copy_from_slice(&4u32.to_be_bytes());
    h[56..60].copy_from_slice(&1u32.to_be_bytes());
    h
}

fn push_varint(out: &mut Vec<u8>, value: i64) {
    // Canonical SQLite varint, values here are small and non-negative.
    assert!(value >= 0);
    let mut groups = Vec::new();
    let mut v = value as u64;
    loop {
        groups.push((v & 0x7f) as u8);
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    groups.reverse();
    let last = groups.len() - 1;
    for (i, g) in groups.iter().enumerate() {
        out.push(if i == last { *g } else { *g | 0x80 });
    }
}

/// Lays out a table leaf page in `page`: cells packed from the page end,
/// pointer array in the order given. `first_page` shifts the b-tree header
/// past the file header.
///
/// Each cell is `(rowid, payload, overflow_page)`; the payload slice is
/// written inline as-is, so the caller controls the declared total length
/// via `total_len` to exercise overflow.
pub fn table_leaf_page(
    page: &mut [u8],
    first_page: bool,
    cells: &[(i64, Vec<u8>, u64, u32)], // (rowid, inline payload, total_len, overflow)
) {
    let base = if first_page { 100 } else { 0 };
    page[base] = KIND_TABLE_LEAF;
    page[base + 3..base + 5].copy_from_slice(&(cells.len() as u16).to_be_bytes());

    let mut end = page.len();
    let mut offsets = Vec::new();
    for (rowid, inline, total_len, overflow) in cells {
        let mut cell = Vec::new();
        push_varint(&mut cell, *total_len as i64);
        push_varint(&mut cell, *rowid);
        cell.extend_from_slice(inline);
        if *overflow != 0 {
            cell.extend_from_slice(&overflow.to_be_bytes());
        }
        end -= cell.len();
        page[end..end + cell.len()].copy_from_slice(&cell);
        offsets.push(end as u16);
    }

    let array = base + 8;
    for (i, off) in offsets.iter().enumerate() {
        page[array + 2 * i..array + 2 * i + 2].copy_from_slice(&off.to_be_bytes());
    }
}

/// Lays out a table interior page: `(left_child, divider_rowid)` cells plus
/// the right-most pointer.
pub fn table_interior_page(
    page: &mut [u8],
    first_page: bool,
    cells: &[(u32, i64)],
    right_most: u32,
) {
    let base = if first_page { 100 } else { 0 };
    page[base] = KIND_TABLE_INTERIOR;
    page[base + 3..base + 5].copy_from_slice(&(cells.len() as u16).to_be_bytes());
    page[base + 8..base + 12].copy_from_slice(&right_most.to_be_bytes());

    let mut end = page.len();
    let mut offsets = Vec::new();
    for (left, divider) in cells {
        let mut cell = Vec::new();
        cell.extend_from_slice(&left.to_be_bytes());
        push_varint(&mut cell, *divider);
        end -= cell.len();
        page[end..end + cell.len()].copy_from_slice(&cell);
        offsets.push(end as u16);
    }

    let array = base + 12;
    for (i, off) in offsets.iter().enumerate() {
        page[array + 2 * i..array + 2 * i + 2].copy_from_slice(&off.to_be_bytes());
    }
}

/// Encodes a `sqlite_master` row payload.
pub fn master_row(
    object_type: &str,
    name: &str,
    tbl_name: &str,
    root_page: i64,
    sql: Option<&str>,
) -> Vec<u8> {
    let mut builder = RecordBuilder::new();
    builder.push(Value::Text(object_type.into()));
    builder.push(Value::Text(name.into()));
    builder.push(Value::Text(tbl_name.into()));
    builder.push(Value::Int(root_page));
    builder.push(match sql {
        Some(s) => Value::Text(s.into()),
        None => Value::Null,
    });
    builder.finish()
}

/// Writes a journal header that marks a crashed transaction.
pub fn write_hot_journal(path: &Path) {
    let mut bytes = vec![0u8; 512];
    bytes[..8].copy_from_slice(&ROLLBACK_JOURNAL_MAGIC);
    bytes[8..12].copy_from_slice(&2u32.to_be_bytes()); // two journaled pages
    std::fs::write(path, bytes).unwrap();
}

//! # Table B-Trees
//!
//! Table trees are keyed by the 64-bit rowid. Leaf cells carry the row
//! payload; interior cells are pure `(left_child, divider_rowid)` pairs and
//! are never surfaced to visitors.
//!
//! ## Descent Rules
//!
//! Interior dividers are sorted; the child left of divider `K` holds rowids
//! `<= K` (and greater than the previous divider). A full scan walks every
//! child left to right and finishes with the right-most pointer. A seek
//! binary-searches for the first divider `>= key`, descends that child with
//! the seek, and walks everything to its right in full - those subtrees are
//! entirely `> divider >= key` already.
//!
//! The recursion budget is checked on entry and decremented per descent.

use eyre::{ensure, Result};

use crate::database::Database;
use crate::encoding::varint::decode_varint;
use crate::error::Error;
use crate::storage::PageBuf;

use super::payload::{local_payload_len, CellPayload, PayloadKind};

/// Visitor for table traversals: rowid and payload per leaf cell. Returns
/// `true` to stop the traversal.
pub(crate) type TableVisitor<'a> = dyn FnMut(i64, CellPayload) -> Result<bool> + 'a;

/// A table b-tree page.
#[derive(Debug, Clone)]
pub enum TablePage {
    Leaf(TableLeaf),
    Interior(TableInterior),
}

/// A `0x0d` table leaf page.
#[derive(Debug, Clone)]
pub struct TableLeaf {
    page: PageBuf,
    cells: Vec<usize>,
}

/// A `0x05` table interior page.
#[derive(Debug, Clone)]
pub struct TableInterior {
    page: PageBuf,
    cells: Vec<usize>,
    right_most: u32,
}

impl TableLeaf {
    pub(crate) fn new(page: PageBuf, cells: Vec<usize>) -> Self {
        Self { page, cells }
    }

    pub(crate) fn cell_offsets(&self) -> &[usize] {
        &self.cells
    }

    /// Decodes cell `i`: `(payload_len varint, rowid varint, payload)`.
    pub(crate) fn cell(&self, i: usize) -> Result<(i64, CellPayload)> {
        let offset = self.cells[i];
        let buf = &self.page[offset..];

        let (total_len, n1) = decode_varint(buf)?;
        ensure!(total_len >= 0, Error::Corrupted);
        let (rowid, n2) = decode_varint(&buf[n1..])?;

        let local = local_payload_len(PayloadKind::TableLeaf, self.page.len(), total_len as u64);
        let spilled = local < total_len as usize;

        let start = offset + n1 + n2;
        let trailer = if spilled { 4 } else { 0 };
        ensure!(start + local + trailer <= self.page.len(), Error::Corrupted);

        let overflow = if spilled {
            u32::from_be_bytes([
                self.page[start + local],
                self.page[start + local + 1],
                self.page[start + local + 2],
                self.page[start + local + 3],
            ])
        } else {
            0
        };

        Ok((
            rowid,
            CellPayload {
                page: self.page.clone(),
                inline: start..start + local,
                total_len: total_len as u64,
                overflow,
            },
        ))
    }

    fn rowid(&self, i: usize) -> Result<i64> {
        let offset = self.cells[i];
        let buf = &self.page[offset..];
        let (_, n1) = decode_varint(buf)?;
        let (rowid, _) = decode_varint(&buf[n1..])?;
        Ok(rowid)
    }
}

impl TableInterior {
    pub(crate) fn new(page: PageBuf, cells: Vec<usize>, right_most: u32) -> Self {
        Self {
            page,
            cells,
            right_most,
        }
    }

    /// Decodes cell `i`: `(left_child u32, divider_rowid varint)`.
    fn cell(&self, i: usize) -> Result<(u32, i64)> {
        let offset = self.cells[i];
        ensure!(offset + 4 <= self.page.len(), Error::Corrupted);

        let left = u32::from_be_bytes([
            self.page[offset],
            self.page[offset + 1],
            self.page[offset + 2],
            self.page[offset + 3],
        ]);
        let (divider, _) = decode_varint(&self.page[offset + 4..])?;
        Ok((left, divider))
    }

    /// Index of the first cell whose divider is `>= rowid`; `cells.len()`
    /// when every divider is smaller.
    fn lower_bound(&self, rowid: i64) -> Result<usize> {
        let mut lo = 0;
        let mut hi = self.cells.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (_, divider) = self.cell(mid)?;
            if divider < rowid {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }
}

impl TablePage {
    /// In-order traversal. Visits `(rowid, payload)` for every leaf cell,
    /// left to right. Returns `true` if the visitor stopped the walk.
    pub(crate) fn iter(
        &self,
        depth: usize,
        db: &Database,
        visit: &mut TableVisitor<'_>,
    ) -> Result<bool> {
        ensure!(depth > 0, Error::TreeTooDeep);

        match self {
            TablePage::Leaf(leaf) => {
                for i in 0..leaf.cells.len() {
                    let (rowid, payload) = leaf.cell(i)?;
                    if visit(rowid, payload)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            TablePage::Interior(interior) => {
                for i in 0..interior.cells.len() {
                    let (left, _) = interior.cell(i)?;
                    let child = db.table_btree(left)?;
                    if child.iter(depth - 1, db, visit)? {
                        return Ok(true);
                    }
                }
                let child = db.table_btree(interior.right_most)?;
                child.iter(depth - 1, db, visit)
            }
        }
    }

    /// Traversal starting at the first leaf cell with rowid `>= min`.
    pub(crate) fn iter_min(
        &self,
        depth: usize,
        db: &Database,
        min: i64,
        visit: &mut TableVisitor<'_>,
    ) -> Result<bool> {
        ensure!(depth > 0, Error::TreeTooDeep);

        match self {
            TablePage::Leaf(leaf) => {
                let mut lo = 0;
                let mut hi = leaf.cells.len();
                while lo < hi {
                    let mid = lo + (hi - lo) / 2;
                    if leaf.rowid(mid)? < min {
                        lo = mid + 1;
                    } else {
                        hi = mid;
                    }
                }
                for i in lo..leaf.cells.len() {
                    let (rowid, payload) = leaf.cell(i)?;
                    if visit(rowid, payload)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            TablePage::Interior(interior) => {
                let first = interior.lower_bound(min)?;
                if first == interior.cells.len() {
                    let child = db.table_btree(interior.right_most)?;
                    return child.iter_min(depth - 1, db, min, visit);
                }

                let (left, _) = interior.cell(first)?;
                let child = db.table_btree(left)?;
                if child.iter_min(depth - 1, db, min, visit)? {
                    return Ok(true);
                }

                // Subtrees right of the seek child hold rowids beyond
                // their left divider, which is already >= min.
                for i in first + 1..interior.cells.len() {
                    let (left, _) = interior.cell(i)?;
                    let child = db.table_btree(left)?;
                    if child.iter(depth - 1, db, visit)? {
                        return Ok(true);
                    }
                }
                let child = db.table_btree(interior.right_most)?;
                child.iter(depth - 1, db, visit)
            }
        }
    }
}

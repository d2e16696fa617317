//! # Index B-Trees
//!
//! Index trees (and the trees backing `WITHOUT ROWID` tables) are keyed by
//! the record itself. Unlike table trees, every cell is a real entry: an
//! interior cell's key both divides the tree and *is* one of the stored
//! records, so in-order traversal emits it between its left child and the
//! next child.
//!
//! ## Seeks
//!
//! `iter_min` positions on the first entry `>=` the search key under the
//! index's [`KeyDef`]. Interior descent binary-searches the cell records
//! (assembling overflow payloads as needed for the comparisons), descends
//! the first qualifying child with the seek, emits that cell, and walks the
//! rest in full - everything right of the first qualifying divider is
//! already `>= key`.
//!
//! Seek visitors receive parsed [`Record`]s rather than raw payloads: the
//! comparisons have already paid for parsing, and every caller wants the
//! record anyway.

use std::cmp::Ordering;

use eyre::{ensure, Result};

use crate::database::Database;
use crate::encoding::varint::decode_varint;
use crate::error::Error;
use crate::records::compare::KeyDef;
use crate::records::{parse_record, Record, Value};
use crate::storage::PageBuf;

use super::payload::{local_payload_len, CellPayload, PayloadKind};

/// Visitor for full index traversals: the raw payload per cell. Returns
/// `true` to stop.
pub(crate) type IndexVisitor<'a> = dyn FnMut(CellPayload) -> Result<bool> + 'a;

/// Visitor for index seeks: the parsed record per cell. Returns `true` to
/// stop.
pub(crate) type IndexRecordVisitor<'a> = dyn FnMut(Record) -> Result<bool> + 'a;

/// An index b-tree page.
#[derive(Debug, Clone)]
pub enum IndexPage {
    Leaf(IndexLeaf),
    Interior(IndexInterior),
}

/// A `0x0a` index leaf page.
#[derive(Debug, Clone)]
pub struct IndexLeaf {
    page: PageBuf,
    cells: Vec<usize>,
}

/// A `0x02` index interior page.
#[derive(Debug, Clone)]
pub struct IndexInterior {
    page: PageBuf,
    cells: Vec<usize>,
    right_most: u32,
}

/// Decodes `(payload_len varint, payload, overflow?)` at `offset`.
fn payload_at(page: &PageBuf, offset: usize) -> Result<CellPayload> {
    let (total_len, n) = decode_varint(&page[offset..])?;
    ensure!(total_len >= 0, Error::Corrupted);

    let local = local_payload_len(PayloadKind::Index, page.len(), total_len as u64);
    let spilled = local < total_len as usize;

    let start = offset + n;
    let trailer = if spilled { 4 } else { 0 };
    ensure!(start + local + trailer <= page.len(), Error::Corrupted);

    let overflow = if spilled {
        u32::from_be_bytes([
            page[start + local],
            page[start + local + 1],
            page[start + local + 2],
            page[start + local + 3],
        ])
    } else {
        0
    };

    Ok(CellPayload {
        page: page.clone(),
        inline: start..start + local,
        total_len: total_len as u64,
        overflow,
    })
}

fn record_of(payload: &CellPayload, db: &Database) -> Result<Record> {
    parse_record(&payload.assemble(db)?)
}

impl IndexLeaf {
    pub(crate) fn new(page: PageBuf, cells: Vec<usize>) -> Self {
        Self { page, cells }
    }

    pub(crate) fn cell(&self, i: usize) -> Result<CellPayload> {
        payload_at(&self.page, self.cells[i])
    }
}

impl IndexInterior {
    pub(crate) fn new(page: PageBuf, cells: Vec<usize>, right_most: u32) -> Self {
        Self {
            page,
            cells,
            right_most,
        }
    }

    /// Decodes cell `i`: `(left_child u32, payload)`.
    pub(crate) fn cell(&self, i: usize) -> Result<(u32, CellPayload)> {
        let offset = self.cells[i];
        ensure!(offset + 4 <= self.page.len(), Error::Corrupted);

        let left = u32::from_be_bytes([
            self.page[offset],
            self.page[offset + 1],
            self.page[offset + 2],
            self.page[offset + 3],
        ]);
        Ok((left, payload_at(&self.page, offset + 4)?))
    }

    /// Index of the first cell whose record is `>= key`; `cells.len()` when
    /// every cell is smaller.
    fn lower_bound(&self, db: &Database, key: &[Value], def: &KeyDef) -> Result<usize> {
        let mut lo = 0;
        let mut hi = self.cells.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (_, payload) = self.cell(mid)?;
            let record = record_of(&payload, db)?;
            if def.compare(key, &record)? == Ordering::Greater {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }
}

impl IndexPage {
    /// In-order traversal of every entry, interior cells included.
    pub(crate) fn iter(
        &self,
        depth: usize,
        db: &Database,
        visit: &mut IndexVisitor<'_>,
    ) -> Result<bool> {
        ensure!(depth > 0, Error::TreeTooDeep);

        match self {
            IndexPage::Leaf(leaf) => {
                for i in 0..leaf.cells.len() {
                    if visit(leaf.cell(i)?)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            IndexPage::Interior(interior) => {
                for i in 0..interior.cells.len() {
                    let (left, payload) = interior.cell(i)?;
                    let child = db.index_btree(left)?;
                    if child.iter(depth - 1, db, visit)? {
                        return Ok(true);
                    }
                    if visit(payload)? {
                        return Ok(true);
                    }
                }
                let child = db.index_btree(interior.right_most)?;
                child.iter(depth - 1, db, visit)
            }
        }
    }

    /// Traversal starting at the first entry `>= key` under `def`. Visits
    /// parsed records.
    pub(crate) fn iter_min(
        &self,
        depth: usize,
        db: &Database,
        key: &[Value],
        def: &KeyDef,
        visit: &mut IndexRecordVisitor<'_>,
    ) -> Result<bool> {
        ensure!(depth > 0, Error::TreeTooDeep);

        match self {
            IndexPage::Leaf(leaf) => {
                let mut emitting = false;
                for i in 0..leaf.cells.len() {
                    let payload = leaf.cell(i)?;
                    let record = record_of(&payload, db)?;
                    if !emitting {
                        // Cells are sorted: once one entry clears the key,
                        // the rest need no comparison.
                        if def.compare(key, &record)? == Ordering::Greater {
                            continue;
                        }
                        emitting = true;
                    }
                    if visit(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            IndexPage::Interior(interior) => {
                let first = interior.lower_bound(db, key, def)?;
                if first == interior.cells.len() {
                    let child = db.index_btree(interior.right_most)?;
                    return child.iter_min(depth - 1, db, key, def, visit);
                }

                let (left, payload) = interior.cell(first)?;
                let child = db.index_btree(left)?;
                if child.iter_min(depth - 1, db, key, def, visit)? {
                    return Ok(true);
                }
                if visit(record_of(&payload, db)?)? {
                    return Ok(true);
                }

                // Everything right of the first qualifying cell is >= key;
                // walk it in full, parsing as we go.
                let mut emit = |payload: CellPayload| -> Result<bool> {
                    visit(record_of(&payload, db)?)
                };
                for i in first + 1..interior.cells.len() {
                    let (left, payload) = interior.cell(i)?;
                    let child = db.index_btree(left)?;
                    if child.iter(depth - 1, db, &mut emit)? {
                        return Ok(true);
                    }
                    if emit(payload)? {
                        return Ok(true);
                    }
                }
                let child = db.index_btree(interior.right_most)?;
                child.iter(depth - 1, db, &mut emit)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::varint::encode_varint;
    use crate::records::RecordBuilder;

    fn leaf_with_records(size: usize, records: &[Record]) -> IndexLeaf {
        let mut page = vec![0u8; size];
        page[0] = super::super::KIND_INDEX_LEAF;
        page[3..5].copy_from_slice(&(records.len() as u16).to_be_bytes());

        let mut scratch = [0u8; 9];
        let mut end = size;
        let mut offsets = Vec::new();
        for record in records {
            let mut builder = RecordBuilder::new();
            for value in record {
                builder.push(value.clone());
            }
            let payload = builder.finish();

            let n = encode_varint(payload.len() as i64, &mut scratch);
            end -= n + payload.len();
            page[end..end + n].copy_from_slice(&scratch[..n]);
            page[end + n..end + n + payload.len()].copy_from_slice(&payload);
            offsets.push(end);
        }
        for (i, off) in offsets.iter().enumerate() {
            page[8 + 2 * i..10 + 2 * i].copy_from_slice(&(*off as u16).to_be_bytes());
        }

        IndexLeaf::new(page.into(), offsets)
    }

    #[test]
    fn leaf_cells_decode_payloads() {
        let records = vec![
            vec![Value::Text("alpha".into()), Value::Int(1)],
            vec![Value::Text("beta".into()), Value::Int(2)],
        ];
        let leaf = leaf_with_records(512, &records);

        for (i, expected) in records.iter().enumerate() {
            let payload = leaf.cell(i).unwrap();
            assert_eq!(payload.overflow, 0);
            let parsed = parse_record(payload.inline_bytes()).unwrap();
            assert_eq!(&parsed, expected);
        }
    }

    #[test]
    fn interior_cell_reads_child_pointer_before_payload() {
        let mut page = vec![0u8; 256];
        page[0] = super::super::KIND_INDEX_INTERIOR;
        page[3..5].copy_from_slice(&1u16.to_be_bytes());
        page[8..12].copy_from_slice(&6u32.to_be_bytes());

        let mut builder = RecordBuilder::new();
        builder.push(Value::Text("k".into()));
        let payload = builder.finish();

        let offset = 100;
        page[offset..offset + 4].copy_from_slice(&3u32.to_be_bytes());
        page[offset + 4] = payload.len() as u8;
        page[offset + 5..offset + 5 + payload.len()].copy_from_slice(&payload);
        page[12..14].copy_from_slice(&(offset as u16).to_be_bytes());

        let interior = IndexInterior::new(page.into(), vec![offset], 6);
        let (left, cell_payload) = interior.cell(0).unwrap();
        assert_eq!(left, 3);
        assert_eq!(
            parse_record(cell_payload.inline_bytes()).unwrap(),
            vec![Value::Text("k".into())]
        );
    }
}

//! # Cell Payloads and Overflow Chains
//!
//! A cell stores its payload inline up to a per-page-kind threshold; past
//! that, a prefix stays inline and the rest spills into a linked chain of
//! overflow pages. This module owns the threshold arithmetic and the chain
//! walk that reassembles a payload into one contiguous buffer.
//!
//! ## Inline Thresholds
//!
//! With `U` the usable page size (the full page size here, since nonzero
//! per-page reserved space is rejected at open):
//!
//! ```text
//! max_local (table leaf)  = U - 35
//! max_local (index pages) = (U - 12) * 64 / 255 - 23
//! min_local (all)         = (U - 12) * 32 / 255 - 23
//! ```
//!
//! A payload of `P <= max_local` bytes is fully inline. Otherwise the
//! inline prefix is `min_local + (P - min_local) % (U - 4)` unless that
//! exceeds `max_local`, in which case it collapses to `min_local`. The
//! modulus arranges for the final overflow page to be as full as possible.
//!
//! ## Overflow Pages
//!
//! ```text
//! +--------------------+
//! | next page (u32 BE) |   0 terminates the chain
//! +--------------------+
//! | payload chunk      |   min(U - 4, remaining) bytes
//! +--------------------+
//! ```
//!
//! Reassembly is not interleaved with record parsing: the record codec
//! needs random access into the whole payload, so the chain is drained into
//! an owned buffer first ([`CellPayload::assemble`] returns
//! `Cow::Borrowed` only in the fully-inline case).
//!
//! ## Corruption Checks
//!
//! A chain that ends before the payload is complete, keeps going after it,
//! or disagrees with the declared total length reports [`Error::Corrupted`].
//! Every iteration of the walk appends at least one byte, so a cyclic chain
//! runs into the "continues past completion" check rather than looping.

use std::borrow::Cow;
use std::ops::Range;

use eyre::{ensure, Result};

use crate::database::Database;
use crate::error::Error;
use crate::storage::PageBuf;

/// Which inline-threshold rule applies to a cell's page kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PayloadKind {
    /// Table leaf cells.
    TableLeaf,
    /// Index cells, leaf and interior alike.
    Index,
}

/// Number of payload bytes stored inline for a `total`-byte payload on a
/// page with `usable` usable bytes.
pub(crate) fn local_payload_len(kind: PayloadKind, usable: usize, total: u64) -> usize {
    let u = usable as u64;
    let max_local = match kind {
        PayloadKind::TableLeaf => u - 35,
        PayloadKind::Index => (u - 12) * 64 / 255 - 23,
    };
    if total <= max_local {
        return total as usize;
    }

    let min_local = (u - 12) * 32 / 255 - 23;
    let k = min_local + (total - min_local) % (u - 4);
    if k <= max_local {
        k as usize
    } else {
        min_local as usize
    }
}

/// A cell's payload as found on its b-tree page: the inline slice, the
/// declared total length, and the head of the overflow chain (0 if none).
#[derive(Debug, Clone)]
pub struct CellPayload {
    pub(crate) page: PageBuf,
    pub(crate) inline: Range<usize>,
    pub(crate) total_len: u64,
    pub(crate) overflow: u32,
}

impl CellPayload {
    /// Declared length of the full payload.
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    pub(crate) fn inline_bytes(&self) -> &[u8] {
        &self.page[self.inline.clone()]
    }

    /// Produces the complete payload, walking the overflow chain through
    /// the database's page access. Borrows straight off the page when
    /// fully inline.
    pub(crate) fn assemble(&self, db: &Database) -> Result<Cow<'_, [u8]>> {
        self.assemble_from(&mut |page_no| db.page(page_no))
    }

    /// Chain walk against any page source; the database variant above is
    /// the only production caller.
    pub(crate) fn assemble_from(
        &self,
        fetch: &mut dyn FnMut(u32) -> Result<PageBuf>,
    ) -> Result<Cow<'_, [u8]>> {
        if self.overflow == 0 {
            ensure!(
                self.inline.len() as u64 == self.total_len,
                Error::Corrupted
            );
            return Ok(Cow::Borrowed(self.inline_bytes()));
        }

        let total = self.total_len as usize;
        let mut buf = Vec::with_capacity(total);
        buf.extend_from_slice(self.inline_bytes());

        let mut next = self.overflow;
        while next != 0 {
            // A live chain with nothing left to read is a cycle or a
            // mislinked page.
            ensure!(buf.len() < total, Error::Corrupted);

            let page = fetch(next)?;
            ensure!(page.len() > 4, Error::Corrupted);

            let chunk = (page.len() - 4).min(total - buf.len());
            buf.extend_from_slice(&page[4..4 + chunk]);
            next = u32::from_be_bytes([page[0], page[1], page[2], page[3]]);
        }

        ensure!(buf.len() == total, Error::Corrupted);
        Ok(Cow::Owned(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payloads_stay_inline() {
        assert_eq!(local_payload_len(PayloadKind::TableLeaf, 4096, 0), 0);
        assert_eq!(local_payload_len(PayloadKind::TableLeaf, 4096, 4061), 4061);
        assert_eq!(local_payload_len(PayloadKind::Index, 4096, 1002), 1002);
    }

    #[test]
    fn table_leaf_threshold_is_u_minus_35() {
        let u = 4096;
        let max_local = u - 35;
        assert_eq!(
            local_payload_len(PayloadKind::TableLeaf, u, max_local as u64),
            max_local
        );
        assert!(local_payload_len(PayloadKind::TableLeaf, u, max_local as u64 + 1) < max_local);
    }

    #[test]
    fn index_threshold_matches_formula() {
        let u = 4096u64;
        let max_local = (u - 12) * 64 / 255 - 23; // 1002 for 4K pages
        assert_eq!(max_local, 1002);
        assert_eq!(
            local_payload_len(PayloadKind::Index, u as usize, max_local),
            max_local as usize
        );
        assert!(local_payload_len(PayloadKind::Index, u as usize, max_local + 1) < 1002);
    }

    #[test]
    fn spilled_payloads_keep_at_least_min_local() {
        let u = 4096;
        let min_local = (4096u64 - 12) * 32 / 255 - 23; // 489 for 4K pages
        for total in [5000u64, 10_000, 100_000, 1_000_000] {
            let inline = local_payload_len(PayloadKind::TableLeaf, u, total);
            assert!(inline as u64 >= min_local, "total {}", total);
            assert!(inline as u64 <= u as u64 - 35, "total {}", total);
        }
        for total in [5000u64, 10_000, 100_000] {
            let inline = local_payload_len(PayloadKind::Index, u, total);
            assert!(inline as u64 >= min_local, "total {}", total);
            assert!(inline as u64 <= 1002, "total {}", total);
        }
    }

    #[test]
    fn spill_split_is_exact_modulus() {
        // U=512: max_local = 477, min_local = 39, U-4 = 508.
        let expected = 39 + (1000 - 39) % 508; // 492 > 477 -> min_local
        assert!(expected > 477);
        assert_eq!(local_payload_len(PayloadKind::TableLeaf, 512, 1000), 39);

        let expected = 39 + (985 - 39) % 508; // exactly max_local
        assert_eq!(expected, 477);
        assert_eq!(local_payload_len(PayloadKind::TableLeaf, 512, 985), 477);
    }

    fn payload(inline: &[u8], total: u64, overflow: u32) -> CellPayload {
        CellPayload {
            page: inline.to_vec().into(),
            inline: 0..inline.len(),
            total_len: total,
            overflow,
        }
    }

    /// Overflow page: 4-byte next pointer plus chunk, padded to `size`.
    fn overflow_page(next: u32, chunk: &[u8], size: usize) -> PageBuf {
        let mut page = vec![0u8; size];
        page[..4].copy_from_slice(&next.to_be_bytes());
        page[4..4 + chunk.len()].copy_from_slice(chunk);
        page.into()
    }

    #[test]
    fn inline_payload_borrows() {
        let pl = payload(b"hello", 5, 0);
        let assembled = pl.assemble_from(&mut |_| unreachable!()).unwrap();
        assert!(matches!(assembled, Cow::Borrowed(_)));
        assert_eq!(&*assembled, b"hello");
    }

    #[test]
    fn inline_length_mismatch_is_corrupted() {
        let pl = payload(b"hello", 6, 0);
        let err = pl.assemble_from(&mut |_| unreachable!()).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::Corrupted));
    }

    #[test]
    fn two_page_chain_reassembles_exactly() {
        // 4 inline + 12 on page 7 + 4 on page 9 = 20 total, U=16.
        let pl = payload(b"abcd", 20, 7);
        let pages = [
            (7u32, overflow_page(9, b"efghijklmnop", 16)),
            (9u32, overflow_page(0, b"qrst", 16)),
        ];

        let assembled = pl
            .assemble_from(&mut |no| {
                Ok(pages.iter().find(|(n, _)| *n == no).unwrap().1.clone())
            })
            .unwrap();
        assert_eq!(&*assembled, b"abcdefghijklmnopqrst");
    }

    #[test]
    fn last_chunk_is_partial() {
        // The final page carries fewer than U-4 meaningful bytes; the walk
        // must take remaining, not the whole usable area.
        let pl = payload(b"", 3, 5);
        let page = overflow_page(0, b"xyz_garbage_", 16);
        let assembled = pl.assemble_from(&mut |_| Ok(page.clone())).unwrap();
        assert_eq!(&*assembled, b"xyz");
    }

    #[test]
    fn chain_ending_early_is_corrupted() {
        // Declares 40 bytes but the single page chain carries 12.
        let pl = payload(b"", 40, 3);
        let page = overflow_page(0, b"0123456789ab", 16);
        let err = pl.assemble_from(&mut |_| Ok(page.clone())).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::Corrupted));
    }

    #[test]
    fn cyclic_chain_is_corrupted() {
        // Page 3 points at itself; progress per pass makes the walk trip
        // the past-completion check instead of spinning.
        let pl = payload(b"", 100, 3);
        let page = overflow_page(3, &[0x55; 12], 16);
        let err = pl.assemble_from(&mut |_| Ok(page.clone())).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::Corrupted));
    }
}

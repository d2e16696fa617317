//! # Hot Rollback-Journal Detection
//!
//! A `<database>-journal` sidecar with a valid header and a nonzero page
//! count is a crashed write transaction: the database file may contain a
//! half-applied change and must not be read until the journal is rolled
//! back by a writer. This reader never replays journals, so a hot journal
//! is grounds for refusing to open.
//!
//! The journal is treated opaquely. "Hot" means:
//!
//! 1. the file exists,
//! 2. it is at least 28 bytes (one journal header),
//! 3. the first 8 bytes are the rollback-journal magic, and
//! 4. the page-count field (big-endian u32 at offset 8) is nonzero.
//!
//! Anything else (no file, zero-length placeholder, zeroed header, zero
//! page count) is a stale journal and is ignored.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use eyre::{Result, WrapErr};

use crate::error::Error;

/// The 8-byte rollback-journal magic.
const JOURNAL_MAGIC: [u8; 8] = [0xd9, 0xd5, 0x05, 0xf9, 0x20, 0xa1, 0x63, 0xd7];

/// Minimum size of a journal that can be hot: one 28-byte journal header.
const JOURNAL_HEADER_SIZE: u64 = 28;

/// Whether the journal sidecar at `path` marks a crashed transaction.
pub fn journal_is_hot<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(eyre::Report::new(e).wrap_err(Error::Io))
                .wrap_err_with(|| format!("failed to open journal '{}'", path.display()))
        }
    };

    let len = file
        .metadata()
        .map_err(|e| eyre::Report::new(e).wrap_err(Error::Io))
        .wrap_err_with(|| format!("failed to stat journal '{}'", path.display()))?
        .len();
    if len < JOURNAL_HEADER_SIZE {
        return Ok(false);
    }

    let mut head = [0u8; 12];
    file.read_exact(&mut head)
        .map_err(|e| eyre::Report::new(e).wrap_err(Error::Io))
        .wrap_err_with(|| format!("failed to read journal '{}'", path.display()))?;

    if head[..8] != JOURNAL_MAGIC {
        return Ok(false);
    }

    let page_count = u32::from_be_bytes([head[8], head[9], head[10], head[11]]);
    Ok(page_count != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn journal_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    fn hot_journal_bytes(page_count: u32) -> Vec<u8> {
        let mut bytes = vec![0u8; 28];
        bytes[..8].copy_from_slice(&JOURNAL_MAGIC);
        bytes[8..12].copy_from_slice(&page_count.to_be_bytes());
        bytes
    }

    #[test]
    fn missing_journal_is_cold() {
        assert!(!journal_is_hot("/no/such/place-journal").unwrap());
    }

    #[test]
    fn short_journal_is_cold() {
        let f = journal_file(&hot_journal_bytes(1)[..20]);
        assert!(!journal_is_hot(f.path()).unwrap());
    }

    #[test]
    fn wrong_magic_is_cold() {
        let mut bytes = hot_journal_bytes(1);
        bytes[0] = 0;
        let f = journal_file(&bytes);
        assert!(!journal_is_hot(f.path()).unwrap());
    }

    #[test]
    fn zero_page_count_is_cold() {
        let f = journal_file(&hot_journal_bytes(0));
        assert!(!journal_is_hot(f.path()).unwrap());
    }

    #[test]
    fn valid_header_with_pages_is_hot() {
        let f = journal_file(&hot_journal_bytes(3));
        assert!(journal_is_hot(f.path()).unwrap());
    }

    #[test]
    fn all_ones_page_count_is_hot() {
        // -1 means "count the records from the journal size"; still a
        // transaction in flight.
        let f = journal_file(&hot_journal_bytes(u32::MAX));
        assert!(journal_is_hot(f.path()).unwrap());
    }
}

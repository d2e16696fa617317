//! # Read-Only Memory-Mapped Pager
//!
//! [`Pager`] maps the database file into the process address space and
//! serves pages as `&[u8]` slices. Page reads after open are page-fault
//! bounded memory reads; the only blocking syscalls are in `open()`.
//!
//! ## Safety Considerations
//!
//! `memmap2::Mmap::map` is unsafe because another process can mutate the
//! file underneath the mapping. The reader's contract makes that tolerable:
//! the file is assumed quiescent, and a writer that does touch it between
//! top-level operations is caught by the header revalidation in the
//! database facade (change-counter and schema-cookie deltas drop the
//! caches). A writer mutating the file *during* a live traversal is
//! documented undefined behavior at the API boundary.
//!
//! The mapping is created read-only and the file is opened without write
//! access, so nothing through this handle can modify the database.
//!
//! ## Locking
//!
//! SQLite's shared/pending/reserved advisory lock protocol lives in a
//! 512-byte window starting at the pending byte. This pager targets
//! quiescent files and keeps the lock API as no-ops; the byte-range
//! constants are retained so an implementation that needs real `fcntl`
//! range locks can layer them in without re-deriving the protocol.

use std::fs::File;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use memmap2::Mmap;

use super::HEADER_SIZE;
use crate::error::Error;

/// First byte of SQLite's lock range. Locking a database means locking
/// bytes inside `[PENDING_BYTE, PENDING_BYTE + 512)`, never data pages.
pub const PENDING_BYTE: u64 = 0x4000_0000;
/// The reserved-lock byte, directly after the pending byte.
pub const RESERVED_BYTE: u64 = PENDING_BYTE + 1;
/// Start of the shared-lock range.
pub const SHARED_FIRST: u64 = PENDING_BYTE + 2;
/// Length of the shared-lock range.
pub const SHARED_SIZE: u64 = 510;

/// Read-only view of a database file. Pages are numbered from 1.
#[derive(Debug)]
pub struct Pager {
    #[allow(dead_code)] // keeps the descriptor alive for the mapping
    file: File,
    mmap: Mmap,
    path: PathBuf,
}

impl Pager {
    /// Opens `path` read-only and maps it. Fails with [`Error::Io`] if the
    /// file cannot be opened and [`Error::FileTruncated`] if it is shorter
    /// than the 100-byte file header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .map_err(|e| eyre::Report::new(e).wrap_err(Error::Io))
            .wrap_err_with(|| format!("failed to open database file '{}'", path.display()))?;

        let metadata = file
            .metadata()
            .map_err(|e| eyre::Report::new(e).wrap_err(Error::Io))
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?;

        ensure!(
            metadata.len() >= HEADER_SIZE as u64,
            Error::FileTruncated
        );

        // SAFETY: Mmap::map is unsafe because the underlying file can change
        // while mapped. This is acceptable here because:
        // 1. The mapping is read-only and the file is opened read-only, so
        //    this process cannot write through it.
        // 2. The reader's contract assumes a quiescent file; writes between
        //    top-level operations are detected via the header change counter
        //    and writes during a traversal are documented as undefined.
        // 3. The mmap lifetime is tied to Pager, preventing use-after-unmap.
        // 4. All access goes through header()/page() which bounds-check.
        let mmap = unsafe {
            Mmap::map(&file)
                .map_err(|e| eyre::Report::new(e).wrap_err(Error::Io))
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self {
            file,
            mmap,
            path: path.to_owned(),
        })
    }

    /// Fresh copy of the first 100 bytes. Reads through the mapping, so a
    /// header rewritten by an external process is observed.
    pub fn header(&self) -> Result<[u8; HEADER_SIZE]> {
        ensure!(self.mmap.len() >= HEADER_SIZE, Error::FileTruncated);
        let mut buf = [0u8; HEADER_SIZE];
        buf.copy_from_slice(&self.mmap[..HEADER_SIZE]);
        Ok(buf)
    }

    /// Returns the `page_size` bytes of page `id` (1-based, SQLite style).
    pub fn page(&self, id: u32, page_size: u32) -> Result<&[u8]> {
        ensure!(id >= 1, Error::InvalidPage);

        let offset = (id as u64 - 1) * page_size as u64;
        let end = offset + page_size as u64;
        if end > self.mmap.len() as u64 {
            return Err(eyre::eyre!(Error::FileTruncated))
                .wrap_err_with(|| format!("page {} lies past the end of the file", id));
        }

        Ok(&self.mmap[offset as usize..end as usize])
    }

    /// Whether another process holds a RESERVED lock on the database. A
    /// reserved lock means a write transaction is in flight, so a hot
    /// journal must not be treated as stale. Quiescent-file deployments
    /// have no such writers; always `false` here.
    pub fn check_reserved_lock(&self) -> Result<bool> {
        Ok(false)
    }

    /// Takes a shared read lock. No-op; see the module docs on locking.
    pub fn read_lock(&self) -> Result<()> {
        Ok(())
    }

    /// Releases the shared read lock taken by [`Pager::read_lock`]. No-op.
    pub fn read_unlock(&self) -> Result<()> {
        Ok(())
    }

    /// Total mapped length in bytes.
    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Whether the mapping is empty. Cannot happen for a successfully
    /// opened pager (open requires at least the 100-byte header).
    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }

    /// Path the pager was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the mapping and the file descriptor.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn open_missing_file_is_io() {
        let err = Pager::open("/no/such/file.sqlite").unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::Io));
    }

    #[test]
    fn open_short_file_is_truncated() {
        let f = write_temp(&[0u8; 40]);
        let err = Pager::open(f.path()).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::FileTruncated));
    }

    #[test]
    fn page_zero_is_invalid() {
        let f = write_temp(&[0u8; 1024]);
        let pager = Pager::open(f.path()).unwrap();
        let err = pager.page(0, 512).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::InvalidPage));
    }

    #[test]
    fn page_past_mapping_is_truncated() {
        let f = write_temp(&[0u8; 1024]);
        let pager = Pager::open(f.path()).unwrap();
        assert!(pager.page(2, 512).is_ok());
        let err = pager.page(3, 512).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::FileTruncated));
    }

    #[test]
    fn pages_map_to_expected_offsets() {
        let mut bytes = vec![0u8; 1536];
        bytes[512] = 0xaa; // first byte of page 2
        bytes[1024] = 0xbb; // first byte of page 3
        let f = write_temp(&bytes);
        let pager = Pager::open(f.path()).unwrap();

        assert_eq!(pager.page(2, 512).unwrap()[0], 0xaa);
        assert_eq!(pager.page(3, 512).unwrap()[0], 0xbb);
    }

    #[test]
    fn header_returns_first_100_bytes() {
        let mut bytes = vec![0u8; 512];
        bytes[0] = 0x53;
        bytes[99] = 0x99;
        let f = write_temp(&bytes);
        let pager = Pager::open(f.path()).unwrap();

        let header = pager.header().unwrap();
        assert_eq!(header[0], 0x53);
        assert_eq!(header[99], 0x99);
    }

    #[test]
    fn lock_hooks_are_noops() {
        let f = write_temp(&[0u8; 512]);
        let pager = Pager::open(f.path()).unwrap();
        pager.read_lock().unwrap();
        pager.read_unlock().unwrap();
        assert!(!pager.check_reserved_lock().unwrap());
    }
}

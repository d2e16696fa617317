//! # File Header Parsing
//!
//! The first 100 bytes of a SQLite database describe the whole file: page
//! size, journaling mode, text encoding, schema format, and the two
//! counters that drive cache invalidation. This module gives those bytes a
//! type-safe zerocopy view and validates them into a [`DbHeader`].
//!
//! ## Header Layout (all multi-byte fields big-endian)
//!
//! ```text
//! Offset  Size  Field
//!      0    16  Magic string "SQLite format 3\0"
//!     16     2  Page size (raw value 1 encodes 65536)
//!     18     1  File format write version
//!     19     1  File format read version (1=journal, 2=WAL)
//!     20     1  Reserved space per page (nonzero usually means encryption)
//!     21     3  Max/min/leaf payload fractions (must be 64/32/32)
//!     24     4  File change counter
//!     40     4  Schema cookie
//!     44     4  Schema format number (2, 3, or 4 supported)
//!     56     4  Text encoding (1=UTF-8, 2=UTF-16le, 3=UTF-16be)
//!     72    20  Reserved for expansion, must be zero
//! ```
//!
//! ## Validation Order
//!
//! Checks run in a fixed order so a file that is wrong in several ways
//! reports its most fundamental problem first: magic, page size, read
//! version (WAL detection), reserved space, payload fractions, schema
//! format, text encoding, reserved expansion bytes.
//!
//! ## Zerocopy Safety
//!
//! `RawHeader` derives `FromBytes`/`Immutable`/`KnownLayout`/`Unaligned`,
//! so reinterpreting the 100-byte array is checked at compile time and
//! works on unaligned data straight out of the mapping.

use eyre::{ensure, Result};
use zerocopy::big_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use super::{HEADER_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::error::Error;

const MAGIC: &[u8; 16] = b"SQLite format 3\x00";

const READ_VERSION_JOURNAL: u8 = 1;
const READ_VERSION_WAL: u8 = 2;

const TEXT_ENCODING_UTF8: u32 = 1;
const TEXT_ENCODING_UTF16LE: u32 = 2;
const TEXT_ENCODING_UTF16BE: u32 = 3;

/// Raw wire view of the 100-byte header.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout, Unaligned)]
struct RawHeader {
    magic: [u8; 16],
    page_size: U16,
    write_version: u8,
    read_version: u8,
    reserved_space: u8,
    max_fraction: u8,
    min_fraction: u8,
    leaf_fraction: u8,
    change_counter: U32,
    page_count: U32,
    freelist_head: U32,
    freelist_count: U32,
    schema_cookie: U32,
    schema_format: U32,
    default_cache_size: U32,
    largest_root_page: U32,
    text_encoding: U32,
    user_version: U32,
    incremental_vacuum: U32,
    application_id: U32,
    reserved_for_expansion: [u8; 20],
    version_valid_for: U32,
    sqlite_version: U32,
}

const _: () = assert!(std::mem::size_of::<RawHeader>() == HEADER_SIZE);

/// The validated header fields the rest of the reader needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbHeader {
    /// Page size in bytes; a power of two in `[512, 65536]`.
    pub page_size: u32,
    /// Bumped on every write (non-WAL files). A delta invalidates the page
    /// cache.
    pub change_counter: u32,
    /// Bumped on every schema change. A delta invalidates the cached
    /// `sqlite_master` contents.
    pub schema_cookie: u32,
    /// Schema format number; 2, 3, and 4 are supported.
    pub schema_format: u32,
}

/// Parses and validates the 100-byte file header.
pub fn parse_header(bytes: &[u8; HEADER_SIZE]) -> Result<DbHeader> {
    let raw = RawHeader::ref_from_bytes(bytes)
        .map_err(|e| eyre::eyre!("failed to view header bytes: {:?}", e))?;

    ensure!(&raw.magic == MAGIC, Error::InvalidMagic);

    let page_size = {
        let raw_size = raw.page_size.get() as u32;
        let size = if raw_size == 1 { MAX_PAGE_SIZE } else { raw_size };
        ensure!(
            (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size) && size.is_power_of_two(),
            Error::InvalidPageSize
        );
        size
    };

    match raw.read_version {
        READ_VERSION_JOURNAL => {}
        READ_VERSION_WAL => return Err(eyre::eyre!(Error::WalMode)),
        _ => return Err(eyre::eyre!(Error::Incompatible)),
    }

    // Nonzero reserved space per page is how most encryption layers stash
    // their nonces; either way the payload arithmetic below assumes zero.
    ensure!(raw.reserved_space == 0, Error::ReservedSpace);

    ensure!(
        raw.max_fraction == 64 && raw.min_fraction == 32 && raw.leaf_fraction == 32,
        Error::Incompatible
    );

    let schema_format = raw.schema_format.get();
    ensure!(matches!(schema_format, 2..=4), Error::Incompatible);

    match raw.text_encoding.get() {
        TEXT_ENCODING_UTF8 => {}
        TEXT_ENCODING_UTF16LE | TEXT_ENCODING_UTF16BE => {
            return Err(eyre::eyre!(Error::UnsupportedEncoding))
        }
        _ => return Err(eyre::eyre!(Error::Incompatible)),
    }

    ensure!(
        raw.reserved_for_expansion.iter().all(|&b| b == 0),
        Error::Incompatible
    );

    Ok(DbHeader {
        page_size,
        change_counter: raw.change_counter.get(),
        schema_cookie: raw.schema_cookie.get(),
        schema_format,
    })
}

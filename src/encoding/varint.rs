//! # SQLite Variable-Length Integer Encoding
//!
//! The varint used throughout SQLite files: big-endian, one to nine bytes,
//! decoding to a signed 64-bit integer.
//!
//! ## Encoding Format
//!
//! Bytes 1 through 8 each carry 7 low bits of payload and use the high bit
//! as a continuation flag. If the encoding reaches a ninth byte, that byte
//! carries all 8 of its bits:
//!
//! ```text
//! 1 byte:  0xxxxxxx                                   7 bits
//! 2 bytes: 1xxxxxxx 0xxxxxxx                         14 bits
//! ...
//! 8 bytes: 1xxxxxxx x7 .. 0xxxxxxx                   56 bits
//! 9 bytes: 1xxxxxxx x7 .. 1xxxxxxx yyyyyyyy          64 bits
//! ```
//!
//! Unlike LEB128 the groups are big-endian: the first byte holds the most
//! significant bits. Negative numbers occupy the full 9 bytes because the
//! sign bit lives at the top of the two's-complement value.
//!
//! ## Boundary Values
//!
//! - `0x7f` (127): largest 1-byte value
//! - `0x3fff` (16383): largest 2-byte value
//! - `2^56 - 1`: largest 8-byte value
//! - anything with bit 56 or above set (including every negative number)
//!   takes 9 bytes
//!
//! ## Canonical Form
//!
//! [`encode_varint`] always emits the shortest encoding, and decoding an
//! encoding returns the original value with the original length, for every
//! `i64`. The decoder accepts non-canonical (over-long) encodings the way
//! SQLite's does; they simply never round-trip through the encoder.
//!
//! ## Error Handling
//!
//! A varint truncated by the end of its buffer is corruption: varints only
//! ever appear inside structures whose length is already known.

use eyre::{ensure, Result};

use crate::error::Error;

/// Maximum encoded length of a varint.
pub const MAX_VARINT_LEN: usize = 9;

/// Decodes a varint from the front of `buf`. Returns the value and the
/// number of bytes consumed.
pub fn decode_varint(buf: &[u8]) -> Result<(i64, usize)> {
    let mut value: u64 = 0;

    for (i, &byte) in buf.iter().enumerate().take(8) {
        value = (value << 7) | (byte & 0x7f) as u64;
        if byte & 0x80 == 0 {
            return Ok((value as i64, i + 1));
        }
    }

    ensure!(buf.len() >= MAX_VARINT_LEN, Error::Corrupted);
    value = (value << 8) | buf[8] as u64;
    Ok((value as i64, MAX_VARINT_LEN))
}

/// Encodes `value` into `buf` (which must hold at least
/// [`MAX_VARINT_LEN`] bytes) and returns the number of bytes written.
/// Always emits the canonical, shortest encoding.
pub fn encode_varint(value: i64, buf: &mut [u8]) -> usize {
    let mut v = value as u64;

    if v >> 56 != 0 {
        // Bit 56+ in use (or negative): the full 9-byte form.
        buf[8] = v as u8;
        v >>= 8;
        for i in (0..8).rev() {
            buf[i] = (v & 0x7f) as u8 | 0x80;
            v >>= 7;
        }
        return MAX_VARINT_LEN;
    }

    let mut groups = [0u8; 8];
    let mut n = 0;
    loop {
        groups[n] = (v & 0x7f) as u8;
        v >>= 7;
        n += 1;
        if v == 0 {
            break;
        }
    }

    for i in 0..n {
        let group = groups[n - 1 - i];
        buf[i] = if i == n - 1 { group } else { group | 0x80 };
    }
    n
}

/// Length of the canonical encoding of `value`, without encoding it.
pub fn varint_len(value: i64) -> usize {
    let v = value as u64;
    if v >> 56 != 0 {
        return MAX_VARINT_LEN;
    }
    let mut n = 1;
    let mut rest = v >> 7;
    while rest != 0 {
        n += 1;
        rest >>= 7;
    }
    n
}

//! # Record Codec
//!
//! A SQLite payload is a *record*: a header of serial-type codes followed by
//! a body of encoded values. This module decodes payloads into typed value
//! vectors and (via [`builder`]) encodes them back.
//!
//! ## Record Format
//!
//! ```text
//! +----------------------------- header -----------------------------+
//! | header_len varint | serial_type varint | serial_type varint | .. |
//! +------------------------------ body ------------------------------+
//! | value bytes | value bytes | ...                                  |
//! +-------------------------------------------------------------------+
//! ```
//!
//! `header_len` counts its own bytes, so the serial-type list occupies
//! `header_len - varint_len(header_len)` bytes. The body is the
//! concatenation of each value's encoding, in column order, with nothing
//! in between.
//!
//! ## Serial Types
//!
//! | Code | Meaning | Body bytes |
//! |------|---------|------------|
//! | 0 | NULL | 0 |
//! | 1..6 | big-endian signed int | 1, 2, 3, 4, 6, 8 |
//! | 7 | IEEE-754 double | 8 |
//! | 8, 9 | integer constants 0 and 1 | 0 |
//! | 10, 11 | reserved (corruption) | - |
//! | even >= 12 | BLOB | (code - 12) / 2 |
//! | odd >= 13 | UTF-8 text | (code - 13) / 2 |
//!
//! ## Decoding
//!
//! [`parse_record`] is a single pass: each serial type read from the header
//! immediately consumes its value from the body. A header that overruns the
//! payload, a body too short for a declared type, a reserved type, or text
//! that is not valid UTF-8 (the file header has already pinned the encoding
//! to UTF-8) all report corruption.
//!
//! ## Values
//!
//! Decoded values are owned ([`Value`]), so records outlive the page and
//! overflow buffers they were read from and can be handed to user callbacks
//! without lifetime strings attached.

pub mod builder;
pub mod compare;

use eyre::{ensure, Result};

use crate::encoding::varint::decode_varint;
use crate::error::Error;

pub use builder::RecordBuilder;

/// One decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// The text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The blob payload, if this is a blob value.
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

/// A decoded row: the ordered tuple of column values.
pub type Record = Vec<Value>;

/// Number of body bytes the serial type `code` consumes.
fn serial_type_len(code: i64) -> Result<usize> {
    match code {
        0 | 8 | 9 => Ok(0),
        1 => Ok(1),
        2 => Ok(2),
        3 => Ok(3),
        4 => Ok(4),
        5 => Ok(6),
        6 | 7 => Ok(8),
        c if c >= 12 => Ok(((c - 12) / 2) as usize),
        _ => Err(eyre::eyre!(Error::Corrupted)),
    }
}

/// Big-endian sign-extended integer of 1..=8 bytes.
fn read_twos_complement(buf: &[u8]) -> i64 {
    let mut value = (buf[0] as i8) as i64;
    for &byte in &buf[1..] {
        value = (value << 8) | byte as i64;
    }
    value
}

fn decode_value(code: i64, body: &[u8]) -> Result<Value> {
    Ok(match code {
        0 => Value::Null,
        1..=6 => Value::Int(read_twos_complement(body)),
        7 => {
            let bits = u64::from_be_bytes(body.try_into().expect("serial type 7 is 8 bytes"));
            Value::Float(f64::from_bits(bits))
        }
        8 => Value::Int(0),
        9 => Value::Int(1),
        c if c >= 13 && c % 2 == 1 => {
            let text = std::str::from_utf8(body).map_err(|_| eyre::eyre!(Error::Corrupted))?;
            Value::Text(text.to_owned())
        }
        c if c >= 12 => Value::Blob(body.to_vec()),
        _ => return Err(eyre::eyre!(Error::Corrupted)),
    })
}

/// Decodes a fully assembled payload into its column values.
pub fn parse_record(payload: &[u8]) -> Result<Record> {
    let (header_len, prefix) = decode_varint(payload)?;
    ensure!(
        header_len >= prefix as i64 && header_len as usize <= payload.len(),
        Error::Corrupted
    );

    let mut header = &payload[prefix..header_len as usize];
    let mut body = &payload[header_len as usize..];
    let mut record = Vec::new();

    while !header.is_empty() {
        let (code, consumed) = decode_varint(header)?;
        header = &header[consumed..];

        let len = serial_type_len(code)?;
        ensure!(body.len() >= len, Error::Corrupted);

        record.push(decode_value(code, &body[..len])?);
        body = &body[len..];
    }

    Ok(record)
}

//! # Record Encoder
//!
//! [`RecordBuilder`] assembles the serial-type header and value body of a
//! record payload. The reader itself never writes records; the encoder
//! exists for the comparator's callers (search keys are records) and for
//! tests that craft database images byte-by-byte.
//!
//! ## Encoding Choices
//!
//! - Integers take the narrowest of the 1/2/3/4/6/8-byte widths that holds
//!   the value. The constant types 8 and 9 are never emitted: they are only
//!   legal under schema format 4 and cost nothing to avoid.
//! - The header length varint counts itself, so `finish()` fixes the length
//!   up iteratively; the fixup converges because a varint grows by at most
//!   one byte per step and the header length is monotone in it.

use crate::encoding::varint::{encode_varint, varint_len, MAX_VARINT_LEN};

use super::Value;

/// Incrementally builds a record payload.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    serial_types: Vec<i64>,
    body: Vec<u8>,
}

/// Narrowest integer serial type (1..=6) holding `value`, with its width.
fn int_serial_type(value: i64) -> (i64, usize) {
    match value {
        -0x80..=0x7f => (1, 1),
        -0x8000..=0x7fff => (2, 2),
        -0x80_0000..=0x7f_ffff => (3, 3),
        -0x8000_0000..=0x7fff_ffff => (4, 4),
        -0x8000_0000_0000..=0x7fff_ffff_ffff => (5, 6),
        _ => (6, 8),
    }
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one column value.
    pub fn push(&mut self, value: Value) -> &mut Self {
        match value {
            Value::Null => self.serial_types.push(0),
            Value::Int(n) => {
                let (code, width) = int_serial_type(n);
                self.serial_types.push(code);
                self.body
                    .extend_from_slice(&n.to_be_bytes()[8 - width..]);
            }
            Value::Float(f) => {
                self.serial_types.push(7);
                self.body.extend_from_slice(&f.to_bits().to_be_bytes());
            }
            Value::Text(s) => {
                self.serial_types.push(13 + 2 * s.len() as i64);
                self.body.extend_from_slice(s.as_bytes());
            }
            Value::Blob(b) => {
                self.serial_types.push(12 + 2 * b.len() as i64);
                self.body.extend_from_slice(&b);
            }
        }
        self
    }

    /// Number of columns pushed so far.
    pub fn len(&self) -> usize {
        self.serial_types.len()
    }

    /// Whether any column has been pushed.
    pub fn is_empty(&self) -> bool {
        self.serial_types.is_empty()
    }

    /// Produces the payload bytes.
    pub fn finish(&self) -> Vec<u8> {
        let types_len: usize = self.serial_types.iter().map(|&t| varint_len(t)).sum();

        // header_len includes its own varint; grow it until stable.
        let mut header_len = types_len + 1;
        while varint_len(header_len as i64) + types_len != header_len {
            header_len = varint_len(header_len as i64) + types_len;
        }

        let mut payload = Vec::with_capacity(header_len + self.body.len());
        let mut scratch = [0u8; MAX_VARINT_LEN];

        let n = encode_varint(header_len as i64, &mut scratch);
        payload.extend_from_slice(&scratch[..n]);
        for &code in &self.serial_types {
            let n = encode_varint(code, &mut scratch);
            payload.extend_from_slice(&scratch[..n]);
        }
        payload.extend_from_slice(&self.body);
        payload
    }
}

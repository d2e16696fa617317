//! # Encoding Module
//!
//! Low-level wire codecs shared by the record and b-tree layers. Today that
//! is the SQLite variable-length integer; the record serial-type codec
//! builds on it in [`crate::records`].

pub mod varint;

pub use varint::{decode_varint, encode_varint, varint_len};

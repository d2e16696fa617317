//! # Record Comparison
//!
//! The total order over record tuples that index seeks rely on. Comparison
//! is value-by-value; across storage classes the order is fixed:
//!
//! ```text
//! NULL  <  numerics (Int/Float, compared by numeric value)  <  Text  <  Blob
//! ```
//!
//! Mixed Int/Float comparisons promote the integer to `f64`. Text compares
//! under the column's collation; blobs compare bytewise.
//!
//! ## Prefix Semantics
//!
//! Two lengths of comparison exist and both are needed:
//!
//! - [`KeyDef::compare`] (and the free [`cmp`]) is the *total order*: equal
//!   through the shorter tuple means the proper prefix sorts first. This is
//!   what positions a seek at "the first entry >= key" when the key carries
//!   fewer columns than the stored entries.
//! - [`KeyDef::compare_prefix`] stops at the shorter tuple and calls equal
//!   prefixes equal. This is the key-*matching* relation: a primary-key
//!   lookup or `scan_eq` asks "does this entry extend my key", not "is it
//!   the same tuple".
//!
//! ## Collations
//!
//! `BINARY` (bytewise over the UTF-8 encoding), `NOCASE` (ASCII-only case
//! fold, then bytewise) and `RTRIM` (trailing ASCII spaces trimmed, then
//! bytewise). Collations are carried by *name* and resolved only when a
//! text comparison actually consults them, so an index declared with an
//! exotic collation is harmless until someone seeks on the text column.
//!
//! ## Sort Direction
//!
//! A per-column `DESC` flag inverts that column's result. The comparator
//! does not know or care whether a column is a real key column or a rowid
//! tail; the key definition is just a list of `(collation, direction)`.

use std::cmp::Ordering;

use eyre::Result;

use crate::error::Error;

use super::Value;

/// A resolved text collation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collation {
    /// Bytewise comparison of the UTF-8 encoding.
    Binary,
    /// ASCII lowercase fold, then bytewise.
    NoCase,
    /// Trailing ASCII spaces ignored, then bytewise.
    RTrim,
}

impl Collation {
    /// Resolves a collation by its SQL name (case-insensitive).
    pub fn resolve(name: &str) -> Result<Collation> {
        if name.eq_ignore_ascii_case("BINARY") {
            Ok(Collation::Binary)
        } else if name.eq_ignore_ascii_case("NOCASE") {
            Ok(Collation::NoCase)
        } else if name.eq_ignore_ascii_case("RTRIM") {
            Ok(Collation::RTrim)
        } else {
            Err(eyre::eyre!(Error::UnknownCollation(name.to_owned())))
        }
    }

    fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Collation::Binary => a.as_bytes().cmp(b.as_bytes()),
            Collation::NoCase => {
                fn fold(s: &str) -> impl Iterator<Item = u8> + '_ {
                    s.bytes().map(|c| c.to_ascii_lowercase())
                }
                fold(a).cmp(fold(b))
            }
            Collation::RTrim => a
                .trim_end_matches(' ')
                .as_bytes()
                .cmp(b.trim_end_matches(' ').as_bytes()),
        }
    }
}

/// Sort direction of one key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Collation and direction of one key column.
#[derive(Debug, Clone)]
pub struct KeyColumn {
    /// Collation name, resolved on first use in a text comparison.
    pub collation: String,
    pub order: SortOrder,
}

impl KeyColumn {
    pub fn new(collation: impl Into<String>, order: SortOrder) -> Self {
        Self {
            collation: collation.into(),
            order,
        }
    }
}

impl Default for KeyColumn {
    fn default() -> Self {
        Self::new("BINARY", SortOrder::Asc)
    }
}

/// Per-column comparison parameters for one index. Columns past the end of
/// the definition fall back to `BINARY` ascending, so the empty default
/// compares everything bytewise in declared order.
#[derive(Debug, Clone, Default)]
pub struct KeyDef {
    columns: Vec<KeyColumn>,
}

/// Storage-class rank: NULL < numerics < text < blob.
fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Int(_) | Value::Float(_) => 1,
        Value::Text(_) => 2,
        Value::Blob(_) => 3,
    }
}

fn compare_values(column: Option<&KeyColumn>, a: &Value, b: &Value) -> Result<Ordering> {
    let ordering = match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).total_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.total_cmp(&(*y as f64)),
        (Value::Text(x), Value::Text(y)) => {
            let collation = match column {
                Some(c) => Collation::resolve(&c.collation)?,
                None => Collation::Binary,
            };
            collation.compare(x, y)
        }
        (Value::Blob(x), Value::Blob(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    };

    let order = column.map(|c| c.order).unwrap_or_default();
    Ok(match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    })
}

impl KeyDef {
    pub fn new(columns: Vec<KeyColumn>) -> Self {
        Self { columns }
    }

    /// Total order over `a` and `b`: pairwise to the shorter tuple, then a
    /// proper prefix sorts first.
    pub fn compare(&self, a: &[Value], b: &[Value]) -> Result<Ordering> {
        match self.compare_prefix(a, b)? {
            Ordering::Equal => Ok(a.len().cmp(&b.len())),
            unequal => Ok(unequal),
        }
    }

    /// Pairwise comparison over the shorter tuple only; equal prefixes are
    /// equal. This is the matching relation behind `scan_eq` and
    /// primary-key lookups.
    pub fn compare_prefix(&self, a: &[Value], b: &[Value]) -> Result<Ordering> {
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            let ordering = compare_values(self.columns.get(i), x, y)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }
}

/// Compares two records under the default key definition: every column
/// `BINARY` ascending, proper prefixes first.
pub fn cmp(a: &[Value], b: &[Value]) -> Result<Ordering> {
    KeyDef::default().compare(a, b)
}

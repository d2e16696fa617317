//! # Stable Error Kinds
//!
//! Failures are propagated as [`eyre::Report`]s so call sites can attach
//! file- and page-level context, but every failure this crate originates
//! carries one of the [`Error`] kinds below at the point where the failure
//! is decided. Callers that need to branch on the kind use
//! `report.downcast_ref::<Error>()`, which sees through any context added
//! during propagation.
//!
//! ## Kind Catalog
//!
//! | Kind | Raised by |
//! |------|-----------|
//! | `InvalidMagic`, `InvalidPageSize`, `ReservedSpace`, `Incompatible`, `UnsupportedEncoding`, `WalMode` | header validation |
//! | `HotJournal` | open / dirty-header resolution |
//! | `Corrupted` | b-tree, record, or overflow-chain decoding |
//! | `TreeTooDeep` | recursion budget exhausted |
//! | `FileTruncated` | page read past the end of the mapping |
//! | `InvalidPage` | page number below 1 |
//! | `InvalidDefinition` | malformed `sqlite_master` row |
//! | `NoSuchTable`, `NoSuchIndex` | name lookups |
//! | `UnknownCollation` | comparator consulted an unresolvable collation |
//! | `Io` | underlying file or mapping failure |
//!
//! The kinds are `Clone + PartialEq` so the master cache can memoize a
//! failure and repeat it without reparsing the schema.

/// Stable failure kinds, recoverable from any report via
/// `downcast_ref::<Error>()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid magic number")]
    InvalidMagic,
    #[error("invalid page size")]
    InvalidPageSize,
    #[error("unsupported database (encrypted?)")]
    ReservedSpace,
    #[error("incompatible database version")]
    Incompatible,
    #[error("unsupported text encoding")]
    UnsupportedEncoding,
    #[error("WAL journal mode is unsupported")]
    WalMode,
    #[error("crashed transaction present")]
    HotJournal,
    #[error("database corrupted")]
    Corrupted,
    #[error("tree is too deep")]
    TreeTooDeep,
    #[error("file truncated")]
    FileTruncated,
    #[error("invalid page number")]
    InvalidPage,
    #[error("invalid object definition")]
    InvalidDefinition,
    #[error("no such table")]
    NoSuchTable,
    #[error("no such index")]
    NoSuchIndex,
    #[error("unknown collation: {0}")]
    UnknownCollation(String),
    #[error("i/o error")]
    Io,
}

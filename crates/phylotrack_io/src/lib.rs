//! # Phylotrack IO
//!
//! Persistence layer for phylotrack forests.
//!
//! This crate provides:
//! - Structured error handling with custom error types
//! - CSV snapshots of a forest, optionally gzip-compressed
//! - Loading snapshots back into a manager
//! - String codecs for taxon info values

/// Info value encodings used in snapshot columns
pub mod codec;
/// Error types and result aliases for I/O operations
pub mod error;
/// Snapshot writing and loading
pub mod snapshot;

pub use codec::{partial_url_encode, url_decode, DisplayCodec, InfoCodec, UrlCodec};
pub use error::{IoError, Result};
pub use snapshot::{
    load_from_file, load_from_reader, read_records, snapshot_to_file, write_snapshot,
    LoadOptions, INFO_COLUMN, SNAPSHOT_COLUMNS,
};

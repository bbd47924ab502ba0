//! # Phylotrack
//!
//! Incremental phylogeny tracking for population simulations.
//!
//! The workspace is split into three crates, re-exported here:
//! - [`phylotrack_data`]: taxon records and world positions
//! - [`phylotrack_core`]: the forest, the [`Systematics`] manager and the statistics
//! - [`phylotrack_io`]: CSV snapshots and info codecs

pub use phylotrack_core;
pub use phylotrack_data;
pub use phylotrack_io;

pub use phylotrack_core::{
    init_logging, DistinctivenessSummary, ForestSummary, Systematics, SystematicsConfig,
    SystematicsError, TaxonForest,
};
pub use phylotrack_data::{Taxon, TaxonId, TaxonRecord, TaxonState, WorldPosition};
pub use phylotrack_io::{DisplayCodec, InfoCodec, IoError, LoadOptions, UrlCodec};

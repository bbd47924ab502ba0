//! Error types for phylotrack_core.
//!
//! Only caller-facing, recoverable conditions live here. Referencing a taxon
//! the forest does not own is a programming error and panics instead.

use phylotrack_data::{TaxonId, WorldPosition};
use thiserror::Error;

/// Errors surfaced by the systematics manager.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SystematicsError {
    /// A positional operation addressed an empty slot.
    #[error("No taxon at position {0}")]
    NoTaxonAtPosition(WorldPosition),

    /// A positional operation was requested while positions are not tracked.
    #[error("Position tracking is disabled")]
    PositionTrackingDisabled,

    /// Two snapshot records share an id.
    #[error("Duplicate taxon id {0} in snapshot")]
    DuplicateTaxon(TaxonId),

    /// A snapshot record names a parent that is not part of the snapshot.
    #[error("Taxon {child} references unknown parent {parent}")]
    UnknownParent { child: TaxonId, parent: TaxonId },

    /// Following parent links from this taxon never reaches a root.
    #[error("Ancestry of taxon {0} contains a cycle")]
    CyclicAncestry(TaxonId),
}

/// Result type alias for phylotrack_core operations.
pub type Result<T> = std::result::Result<T, SystematicsError>;

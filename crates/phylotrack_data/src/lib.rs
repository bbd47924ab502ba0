//! Core data structures shared by the phylotrack crates.

pub mod data;

pub use data::position::WorldPosition;
pub use data::record::TaxonRecord;
pub use data::taxon::{Taxon, TaxonId, TaxonState};

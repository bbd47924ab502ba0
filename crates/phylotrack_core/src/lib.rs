//! # Phylotrack Core
//!
//! The phylogeny-tracking engine: a manager that maintains a forest of taxa
//! while a simulation reports organism births, deaths and moves, and that
//! computes tree statistics over that forest on demand.
//!
//! This crate contains:
//! - The taxon forest with its active / ancestor / outside partitions
//! - The event processor ([`Systematics`]) and optional position tracking
//! - Lineage algorithms (MRCA, shared ancestors, pairwise distances)
//! - Phylostatistics (diversity, Sackin, Colless-like, distinctiveness)
//! - Graphviz export and structured logging setup
//!
//! ## Example
//!
//! ```
//! use phylotrack_core::Systematics;
//!
//! let mut sys = Systematics::<char, char>::identity();
//! let root = sys.add_org(&'A', None);
//! sys.add_org(&'A', Some(root));
//! let child = sys.add_org(&'B', Some(root));
//!
//! assert_eq!(sys.num_taxa(), 2);
//! assert_eq!(sys.taxon(root).num_orgs(), 2);
//! assert_eq!(sys.shared_ancestor(child, root), Some(root));
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod forest;
pub mod lineage;
pub mod metrics;
pub mod position_index;
pub mod stats;
pub mod systematics;

pub use config::SystematicsConfig;
pub use error::{Result, SystematicsError};
pub use export::{PhyloNode, PhyloTree};
pub use forest::{TaxonCallback, TaxonForest};
pub use metrics::{init_logging, ForestSummary};
pub use position_index::PositionIndex;
pub use stats::DistinctivenessSummary;
pub use systematics::{NewTaxonCallback, SnapshotFun, Systematics};

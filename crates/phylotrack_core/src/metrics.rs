//! Logging setup and summary statistics for reporting.

use crate::forest::TaxonForest;
use crate::stats::DistinctivenessSummary;
use serde::Serialize;

/// A point-in-time summary of a forest, suitable for logging or printing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForestSummary {
    pub num_active: usize,
    pub num_ancestors: usize,
    pub num_outside: usize,
    pub num_roots: usize,
    pub total_orgs: usize,
    pub max_depth: usize,
    pub mrca_depth: i32,
    pub shannon_diversity: f64,
    pub phylogenetic_diversity: i32,
    pub sackin_index: i32,
    pub colless_like_index: f64,
    pub mean_pairwise_distance: f64,
    pub average_origin_time: f64,
    pub evolutionary_distinctiveness: DistinctivenessSummary,
}

impl ForestSummary {
    /// Computes every statistic at `time`.
    pub fn collect<I>(forest: &TaxonForest<I>, time: f64) -> Self {
        Self {
            num_active: forest.num_active(),
            num_ancestors: forest.num_ancestors(),
            num_outside: forest.num_outside(),
            num_roots: forest.num_roots(),
            total_orgs: forest.total_orgs(),
            max_depth: forest.max_depth(),
            mrca_depth: forest.mrca_depth(),
            shannon_diversity: forest.shannon_diversity(),
            phylogenetic_diversity: forest.phylogenetic_diversity(),
            sackin_index: forest.sackin_index(),
            colless_like_index: forest.colless_like_index(),
            mean_pairwise_distance: forest.mean_pairwise_distance(false),
            average_origin_time: forest.average_origin_time(false),
            evolutionary_distinctiveness: forest.evolutionary_distinctiveness(time),
        }
    }

    /// Emits the summary as a structured `info` event.
    pub fn log(&self) {
        tracing::info!(
            active = self.num_active,
            ancestors = self.num_ancestors,
            outside = self.num_outside,
            roots = self.num_roots,
            orgs = self.total_orgs,
            shannon = self.shannon_diversity,
            pd = self.phylogenetic_diversity,
            "Phylogeny summary"
        );
    }
}

/// Initialize tracing subscriber for logging.
pub fn init_logging() {
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .ok();
}

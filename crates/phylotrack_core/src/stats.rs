//! Phylostatistics over the current tree.
//!
//! Unless noted otherwise every statistic is computed over the active taxa.
//! Results are recomputed on each call; nothing here mutates the forest.

use crate::forest::TaxonForest;
use phylotrack_data::{Taxon, TaxonId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Aggregate evolutionary distinctiveness of the active taxa.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DistinctivenessSummary {
    pub mean: f64,
    pub sum: f64,
    /// Population variance.
    pub variance: f64,
}

fn entropy(counts: impl Iterator<Item = usize>, log: fn(f64) -> f64) -> f64 {
    let counts: Vec<usize> = counts.filter(|&c| c > 0).collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    -counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * log(p)
        })
        .sum::<f64>()
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

impl<I> TaxonForest<I> {
    /// Shannon diversity of organisms across active taxa, in nats.
    pub fn shannon_diversity(&self) -> f64 {
        entropy(self.active_orgs(), f64::ln)
    }

    /// Shannon diversity of organisms across active taxa, in bits.
    pub fn calc_diversity(&self) -> f64 {
        entropy(self.active_orgs(), f64::log2)
    }

    fn active_orgs(&self) -> impl Iterator<Item = usize> + '_ {
        self.active_taxa()
            .iter()
            .filter_map(|id| self.get(*id))
            .map(Taxon::num_orgs)
    }

    /// Generations between the deepest active taxon and the MRCA, or `-1`
    /// without an MRCA.
    pub fn mrca_depth(&self) -> i32 {
        let Some(mrca) = self.mrca() else {
            return -1;
        };
        let base = self.depth(mrca);
        let deepest = self
            .active_taxa()
            .iter()
            .map(|&id| self.depth(id))
            .max()
            .unwrap_or(base);
        deepest.saturating_sub(base) as i32
    }

    /// Sum of [`TaxonForest::distance_to_root`] over the active taxa.
    pub fn sackin_index(&self) -> i32 {
        self.active_taxa()
            .iter()
            .map(|&id| self.distance_to_root(id) as i32)
            .sum()
    }

    fn tree_roots(&self) -> BTreeSet<TaxonId> {
        self.active_taxa()
            .iter()
            .filter_map(|&id| self.lineage(id).last().copied())
            .collect()
    }

    /// Colless-like balance index for multifurcating trees (Mir, Rosselló
    /// and Rotger, 2018).
    ///
    /// Subtree sizes weigh each node by `ln(out_degree + e)`; every node with
    /// two or more children adds the mean absolute deviation of its
    /// children's sizes from their median.
    pub fn colless_like_index(&self) -> f64 {
        let mut sizes: HashMap<TaxonId, f64> = HashMap::new();
        let mut index = 0.0;

        for root in self.tree_roots() {
            let mut stack = vec![(root, false)];
            while let Some((id, expanded)) = stack.pop() {
                let taxon = self.taxon(id);
                let children: Vec<TaxonId> = taxon
                    .offspring()
                    .iter()
                    .copied()
                    .filter(|child| self.contains(*child))
                    .collect();
                if !expanded {
                    stack.push((id, true));
                    stack.extend(children.iter().map(|&child| (child, false)));
                    continue;
                }

                let mut child_sizes: Vec<f64> = children.iter().map(|c| sizes[c]).collect();
                let own = (children.len() as f64 + std::f64::consts::E).ln();
                sizes.insert(id, own + child_sizes.iter().sum::<f64>());

                if child_sizes.len() >= 2 {
                    child_sizes.sort_by(f64::total_cmp);
                    let mid = median(&child_sizes);
                    let deviation = child_sizes.iter().map(|s| (s - mid).abs()).sum::<f64>()
                        / child_sizes.len() as f64;
                    index += deviation;
                }
            }
        }
        index
    }

    /// Edges of the smallest subtree connecting every active taxon to the
    /// MRCA, or to its root when there is no MRCA.
    pub fn phylogenetic_diversity(&self) -> i32 {
        let mrca = self.mrca();
        let mut seen: HashSet<TaxonId> = HashSet::new();
        let mut edges = 0;
        for &id in self.active_taxa() {
            let mut cursor = id;
            while Some(cursor) != mrca {
                let Some(parent) = self.parent(cursor) else {
                    break;
                };
                if !seen.insert(cursor) {
                    break;
                }
                edges += 1;
                cursor = parent;
            }
        }
        edges
    }

    /// Mean origination time over the current tree.
    ///
    /// With `normalize`, each taxon is weighted by `max(out_degree - 1, 0)`,
    /// approximating the statistic on a strictly bifurcating reconstruction.
    pub fn average_origin_time(&self, normalize: bool) -> f64 {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for taxon in self.tree_taxa() {
            let weight = if normalize {
                taxon.out_degree().saturating_sub(1) as f64
            } else {
                1.0
            };
            weighted += taxon.origination_time() * weight;
            total_weight += weight;
        }
        if total_weight == 0.0 {
            0.0
        } else {
            weighted / total_weight
        }
    }

    /// Histogram of out-degrees over the current tree.
    pub fn out_degree_distribution(&self) -> BTreeMap<i32, i32> {
        let mut histogram = BTreeMap::new();
        for taxon in self.tree_taxa() {
            *histogram.entry(taxon.out_degree() as i32).or_insert(0) += 1;
        }
        histogram
    }

    fn distinctiveness_scores(&self, time: f64) -> Vec<f64> {
        let mrca = self.mrca();
        let mut sharing: HashMap<TaxonId, usize> = HashMap::new();
        for &id in self.active_taxa() {
            let mut cursor = id;
            loop {
                *sharing.entry(cursor).or_default() += 1;
                if Some(cursor) == mrca {
                    break;
                }
                match self.parent(cursor) {
                    Some(parent) => cursor = parent,
                    None => break,
                }
            }
        }

        self.active_taxa()
            .iter()
            .map(|&id| {
                let mut score = 0.0;
                let mut segment_end = time;
                let mut cursor = id;
                loop {
                    let origin = self.taxon(cursor).origination_time();
                    score += (segment_end - origin).max(0.0) / sharing[&cursor] as f64;
                    if Some(cursor) == mrca {
                        break;
                    }
                    segment_end = origin;
                    match self.parent(cursor) {
                        Some(parent) => cursor = parent,
                        None => break,
                    }
                }
                score
            })
            .collect()
    }

    /// Evolutionary distinctiveness of the active taxa at `time`.
    ///
    /// Each lineage segment between an active taxon and the MRCA is split
    /// evenly among the active taxa that descend through it.
    pub fn evolutionary_distinctiveness(&self, time: f64) -> DistinctivenessSummary {
        let scores = self.distinctiveness_scores(time);
        if scores.is_empty() {
            return DistinctivenessSummary::default();
        }
        let n = scores.len() as f64;
        let sum: f64 = scores.iter().sum();
        let mean = sum / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        DistinctivenessSummary {
            mean,
            sum,
            variance,
        }
    }

    pub fn mean_evolutionary_distinctiveness(&self, time: f64) -> f64 {
        self.evolutionary_distinctiveness(time).mean
    }

    pub fn sum_evolutionary_distinctiveness(&self, time: f64) -> f64 {
        self.evolutionary_distinctiveness(time).sum
    }

    pub fn variance_evolutionary_distinctiveness(&self, time: f64) -> f64 {
        self.evolutionary_distinctiveness(time).variance
    }
}

//! Lineage queries: common ancestors, depths and pairwise distances.
//!
//! "Root" in the distance functions means the MRCA of the active taxa when it
//! lies on the walked path, and the taxon's own root otherwise.

use crate::forest::TaxonForest;
use phylotrack_data::TaxonId;
use std::collections::HashSet;

impl<I> TaxonForest<I> {
    /// Ids from `id` up to its root, starting with `id` itself.
    pub fn lineage(&self, id: TaxonId) -> Vec<TaxonId> {
        self.taxon(id);
        let mut chain = vec![id];
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor) {
            chain.push(parent);
            cursor = parent;
        }
        chain
    }

    /// Parent edges between `id` and its own root.
    pub fn depth(&self, id: TaxonId) -> usize {
        self.lineage(id).len() - 1
    }

    /// Walks from `id` towards the MRCA, feeding each parent to `visit`.
    fn walk_to_root(&self, id: TaxonId, mut visit: impl FnMut(TaxonId)) {
        self.taxon(id);
        let mrca = self.mrca();
        let mut cursor = id;
        while Some(cursor) != mrca {
            let Some(parent) = self.parent(cursor) else {
                break;
            };
            visit(parent);
            cursor = parent;
        }
    }

    /// Parent edges from `id` up to the MRCA, unifurcations included.
    pub fn distance_to_root(&self, id: TaxonId) -> u32 {
        let mut distance = 0;
        self.walk_to_root(id, |_| distance += 1);
        distance
    }

    /// Like [`TaxonForest::distance_to_root`], counting only ancestors that
    /// currently branch into two or more children.
    pub fn branches_to_root(&self, id: TaxonId) -> u32 {
        let mut branches = 0;
        self.walk_to_root(id, |ancestor| {
            if self.taxon(ancestor).out_degree() >= 2 {
                branches += 1;
            }
        });
        branches
    }

    /// Lowest taxon that is an ancestor of (or equal to) both `a` and `b`.
    pub fn shared_ancestor(&self, a: TaxonId, b: TaxonId) -> Option<TaxonId> {
        let marked: HashSet<TaxonId> = self.lineage(a).into_iter().collect();
        self.lineage(b).into_iter().find(|id| marked.contains(id))
    }

    /// Edges between `a` and `b`, or, with `branch_only`, the branching
    /// ancestors passed on the way from each side up to their shared ancestor.
    ///
    /// `None` when the two taxa are in different trees.
    pub fn pairwise_distance(&self, a: TaxonId, b: TaxonId, branch_only: bool) -> Option<u32> {
        let lca = self.shared_ancestor(a, b)?;
        Some(self.distance_below(a, lca, branch_only) + self.distance_below(b, lca, branch_only))
    }

    fn distance_below(&self, from: TaxonId, ancestor: TaxonId, branch_only: bool) -> u32 {
        let mut distance = 0;
        let mut cursor = from;
        while cursor != ancestor {
            let Some(parent) = self.parent(cursor) else {
                break;
            };
            if !branch_only || self.taxon(parent).out_degree() >= 2 {
                distance += 1;
            }
            cursor = parent;
        }
        distance
    }

    /// Distances between every pair of active taxa.
    ///
    /// Empty when the forest has several roots, where the statistic is undefined.
    pub fn all_pairwise_distances(&self, branch_only: bool) -> Vec<u32> {
        if self.num_roots() > 1 {
            return Vec::new();
        }
        let active: Vec<TaxonId> = self.active_taxa().iter().copied().collect();
        let mut distances = Vec::with_capacity(active.len() * active.len().saturating_sub(1) / 2);
        for (i, &a) in active.iter().enumerate() {
            for &b in &active[i + 1..] {
                match self.pairwise_distance(a, b, branch_only) {
                    Some(d) => distances.push(d),
                    None => return Vec::new(),
                }
            }
        }
        distances
    }

    /// Sum of all pairwise distances; `-1.0` for a disconnected forest.
    pub fn sum_pairwise_distance(&self, branch_only: bool) -> f64 {
        if self.num_roots() > 1 {
            return -1.0;
        }
        self.all_pairwise_distances(branch_only)
            .iter()
            .map(|&d| f64::from(d))
            .sum()
    }

    /// Mean pairwise distance; `-1.0` for a disconnected forest.
    pub fn mean_pairwise_distance(&self, branch_only: bool) -> f64 {
        if self.num_roots() > 1 {
            return -1.0;
        }
        let distances = self.all_pairwise_distances(branch_only);
        if distances.is_empty() {
            return 0.0;
        }
        distances.iter().map(|&d| f64::from(d)).sum::<f64>() / distances.len() as f64
    }

    /// Population variance of pairwise distances; `-1.0` for a disconnected forest.
    pub fn variance_pairwise_distance(&self, branch_only: bool) -> f64 {
        if self.num_roots() > 1 {
            return -1.0;
        }
        let distances = self.all_pairwise_distances(branch_only);
        if distances.is_empty() {
            return 0.0;
        }
        let n = distances.len() as f64;
        let mean = distances.iter().map(|&d| f64::from(d)).sum::<f64>() / n;
        distances
            .iter()
            .map(|&d| (f64::from(d) - mean).powi(2))
            .sum::<f64>()
            / n
    }

    /// Longest lineage, in taxa, among the active taxa.
    pub fn max_depth(&self) -> usize {
        self.active_taxa()
            .iter()
            .map(|&id| self.depth(id) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Organism-weighted mean of [`TaxonForest::distance_to_root`].
    pub fn ave_depth(&self) -> f64 {
        let total = self.total_orgs();
        if total == 0 {
            return 0.0;
        }
        let weighted: f64 = self
            .active_taxa()
            .iter()
            .map(|&id| f64::from(self.distance_to_root(id)) * self.taxon(id).num_orgs() as f64)
            .sum();
        weighted / total as f64
    }
}

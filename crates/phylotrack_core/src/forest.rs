//! Ownership and partition bookkeeping for all taxa.
//!
//! The forest is an arena keyed by [`TaxonId`]. Parent and offspring links are
//! ids into the arena, so the arena is the only owner of taxon storage. Every
//! stored taxon is in exactly one partition:
//!
//! - **active**: at least one living organism
//! - **ancestor**: extinct, but on the path from an active taxon to a root
//! - **outside**: extinct with no living descendants, kept only when archiving
//!
//! Lineage queries live in [`crate::lineage`] and tree statistics in
//! [`crate::stats`]; both are further `impl` blocks on [`TaxonForest`].

use crate::config::SystematicsConfig;
use crate::error::{Result, SystematicsError};
use phylotrack_data::{Taxon, TaxonId, TaxonRecord, TaxonState};
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Listener invoked with a taxon that changed lifecycle state.
pub type TaxonCallback<I> = Box<dyn FnMut(&Taxon<I>)>;

/// Counters read from a snapshot row, applied once the tree is linked.
struct LoadedCounts {
    id: TaxonId,
    num_orgs: Option<usize>,
    tot_orgs: Option<usize>,
    total_offspring: Option<usize>,
    destruction: Option<f64>,
}

pub struct TaxonForest<I> {
    taxa: HashMap<TaxonId, Taxon<I>>,
    active: BTreeSet<TaxonId>,
    ancestors: BTreeSet<TaxonId>,
    outside: BTreeSet<TaxonId>,
    num_roots: usize,
    next_id: u64,
    most_recent: Option<TaxonId>,
    /// Outer `None` means the cached value is stale.
    mrca: Cell<Option<Option<TaxonId>>>,
    config: SystematicsConfig,
    on_extinct: Option<TaxonCallback<I>>,
    on_prune: Option<TaxonCallback<I>>,
}

impl<I> fmt::Debug for TaxonForest<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaxonForest")
            .field("taxa", &self.taxa.len())
            .field("active", &self.active.len())
            .field("ancestors", &self.ancestors.len())
            .field("outside", &self.outside.len())
            .field("num_roots", &self.num_roots)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl<I> TaxonForest<I> {
    pub fn new(config: SystematicsConfig) -> Self {
        Self {
            taxa: HashMap::new(),
            active: BTreeSet::new(),
            ancestors: BTreeSet::new(),
            outside: BTreeSet::new(),
            num_roots: 0,
            next_id: 1,
            most_recent: None,
            mrca: Cell::new(None),
            config,
            on_extinct: None,
            on_prune: None,
        }
    }

    pub fn config(&self) -> &SystematicsConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut SystematicsConfig {
        &mut self.config
    }

    // --- Accessors ---

    /// Looks up a stored taxon.
    pub fn get(&self, id: TaxonId) -> Option<&Taxon<I>> {
        self.taxa.get(&id)
    }

    /// Looks up a taxon that must exist.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not owned by this forest.
    pub fn taxon(&self, id: TaxonId) -> &Taxon<I> {
        self.taxa
            .get(&id)
            .unwrap_or_else(|| panic!("invalid taxon reference {id}"))
    }

    fn taxon_mut(&mut self, id: TaxonId) -> &mut Taxon<I> {
        self.taxa
            .get_mut(&id)
            .unwrap_or_else(|| panic!("invalid taxon reference {id}"))
    }

    pub fn contains(&self, id: TaxonId) -> bool {
        self.taxa.contains_key(&id)
    }

    /// Parent of `id`, if both are stored. Parents removed by
    /// [`TaxonForest::remove_before`] read as absent.
    pub fn parent(&self, id: TaxonId) -> Option<TaxonId> {
        self.taxa
            .get(&id)
            .and_then(Taxon::parent)
            .filter(|p| self.taxa.contains_key(p))
    }

    pub fn active_taxa(&self) -> &BTreeSet<TaxonId> {
        &self.active
    }

    pub fn ancestor_taxa(&self) -> &BTreeSet<TaxonId> {
        &self.ancestors
    }

    pub fn outside_taxa(&self) -> &BTreeSet<TaxonId> {
        &self.outside
    }

    /// Active then ancestor taxa: the current tree.
    pub fn tree_taxa(&self) -> impl Iterator<Item = &Taxon<I>> + '_ {
        self.active
            .iter()
            .chain(self.ancestors.iter())
            .filter_map(|id| self.taxa.get(id))
    }

    /// Every stored taxon, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Taxon<I>> + '_ {
        self.taxa.values()
    }

    pub fn num_active(&self) -> usize {
        self.active.len()
    }

    pub fn num_ancestors(&self) -> usize {
        self.ancestors.len()
    }

    pub fn num_outside(&self) -> usize {
        self.outside.len()
    }

    /// Active plus ancestor taxa.
    pub fn tree_size(&self) -> usize {
        self.active.len() + self.ancestors.len()
    }

    /// Every taxon currently stored, whatever its partition.
    pub fn num_taxa(&self) -> usize {
        self.taxa.len()
    }

    pub fn num_roots(&self) -> usize {
        self.num_roots
    }

    /// Id the next created taxon will receive.
    pub fn next_id(&self) -> TaxonId {
        TaxonId(self.next_id)
    }

    /// The most recently created taxon, while it is still stored.
    pub fn most_recent(&self) -> Option<TaxonId> {
        self.most_recent.filter(|id| self.taxa.contains_key(id))
    }

    /// Living organisms across all active taxa.
    pub fn total_orgs(&self) -> usize {
        self.active
            .iter()
            .filter_map(|id| self.taxa.get(id))
            .map(Taxon::num_orgs)
            .sum()
    }

    // --- Signals ---

    pub fn set_on_extinct(&mut self, callback: impl FnMut(&Taxon<I>) + 'static) {
        self.on_extinct = Some(Box::new(callback));
    }

    pub fn set_on_prune(&mut self, callback: impl FnMut(&Taxon<I>) + 'static) {
        self.on_prune = Some(Box::new(callback));
    }

    /// Moves the registered listeners of `other` into this forest.
    pub(crate) fn adopt_signals(&mut self, other: &mut TaxonForest<I>) {
        self.on_extinct = other.on_extinct.take();
        self.on_prune = other.on_prune.take();
    }

    // --- MRCA cache ---

    pub(crate) fn invalidate_mrca(&self) {
        self.mrca.set(None);
    }

    /// Most recent common ancestor of all active taxa.
    ///
    /// `None` when nothing is active or the active taxa span several roots.
    pub fn mrca(&self) -> Option<TaxonId> {
        if let Some(cached) = self.mrca.get() {
            return cached;
        }
        let computed = self.compute_mrca();
        self.mrca.set(Some(computed));
        computed
    }

    fn compute_mrca(&self) -> Option<TaxonId> {
        if self.num_roots != 1 {
            return None;
        }
        let first = *self.active.iter().next()?;
        let mut candidate = first;
        let mut cursor = self.parent(first);
        while let Some(id) = cursor {
            let taxon = self.taxon(id);
            if taxon.is_active() || taxon.out_degree() > 1 {
                candidate = id;
            }
            cursor = self.parent(id);
        }
        Some(candidate)
    }

    // --- Mutation ---

    /// Allocates a new taxon holding one organism.
    ///
    /// `on_new` observes the taxon after its id is assigned and before it is
    /// registered in the active partition.
    pub(crate) fn create(
        &mut self,
        info: I,
        parent: Option<TaxonId>,
        time: f64,
        on_new: impl FnOnce(&Taxon<I>),
    ) -> TaxonId {
        let id = TaxonId(self.next_id);
        self.next_id += 1;

        let mut taxon = Taxon::new(id, info, parent, time);
        taxon.add_org();

        match parent {
            Some(parent_id) => {
                let parent_taxon = self.taxon_mut(parent_id);
                parent_taxon.add_offspring(id);
                let archived = parent_taxon.state() == TaxonState::Outside;
                if !parent_taxon.is_active() {
                    self.invalidate_mrca();
                }
                if archived {
                    self.revive(parent_id);
                }
                let mut cursor = Some(parent_id);
                while let Some(ancestor) = cursor {
                    match self.taxa.get_mut(&ancestor) {
                        Some(t) => {
                            t.add_total_offspring();
                            cursor = t.parent();
                        }
                        None => break,
                    }
                }
            }
            None => {
                self.num_roots += 1;
                self.invalidate_mrca();
            }
        }

        on_new(&taxon);
        tracing::debug!(taxon = %id, parent = ?parent.map(|p| p.0), time, "Taxon created");

        self.taxa.insert(id, taxon);
        if self.config.store_active {
            self.active.insert(id);
        }
        self.most_recent = Some(id);
        id
    }

    /// Returns an archived taxon, and every archived taxon above it, to the
    /// tree as ancestors of a new birth.
    fn revive(&mut self, start: TaxonId) {
        let mut cursor = start;
        loop {
            self.outside.remove(&cursor);
            self.taxon_mut(cursor).set_state(TaxonState::Ancestor);
            if self.config.store_ancestors {
                self.ancestors.insert(cursor);
            }
            tracing::debug!(taxon = %cursor, "Archived taxon revived");

            let Some(parent_id) = self.parent(cursor) else {
                self.num_roots += 1;
                break;
            };
            let parent = self.taxon_mut(parent_id);
            parent.relink_offspring(cursor);
            if parent.state() != TaxonState::Outside {
                break;
            }
            cursor = parent_id;
        }
    }

    /// Adds an organism to an existing taxon.
    pub(crate) fn join(&mut self, id: TaxonId) {
        self.taxon_mut(id).add_org();
    }

    /// Removes one organism from `id` and returns `true` if the taxon went
    /// extinct as a result.
    pub(crate) fn retire(&mut self, id: TaxonId, time: f64) -> bool {
        let extinct = self.taxon_mut(id).remove_org();
        if extinct {
            self.mark_extinct(id, time);
        }
        extinct
    }

    fn mark_extinct(&mut self, id: TaxonId, time: f64) {
        let taxon = self.taxon_mut(id);
        taxon.set_destruction_time(time);
        let has_offspring = taxon.out_degree() > 0;
        self.active.remove(&id);

        if let Some(callback) = self.on_extinct.as_mut() {
            callback(&self.taxa[&id]);
        }
        if self.mrca.get() == Some(Some(id)) {
            self.invalidate_mrca();
        }
        tracing::debug!(taxon = %id, time, "Taxon extinct");

        if has_offspring {
            self.taxon_mut(id).set_state(TaxonState::Ancestor);
            if self.config.store_ancestors {
                self.ancestors.insert(id);
            }
        } else {
            self.prune_from(id);
        }
    }

    /// Removes a dead, childless taxon from the tree and walks up through
    /// parents that become dead and childless as a result.
    fn prune_from(&mut self, start: TaxonId) {
        let keep_outside = self.config.keeps_outside();
        let mut cursor = start;
        loop {
            if let Some(callback) = self.on_prune.as_mut() {
                callback(&self.taxa[&cursor]);
            }
            self.ancestors.remove(&cursor);
            let parent = self.taxon(cursor).parent();

            if keep_outside {
                self.taxon_mut(cursor).set_state(TaxonState::Outside);
                self.outside.insert(cursor);
            } else {
                self.taxa.remove(&cursor);
            }
            self.invalidate_mrca();
            tracing::debug!(taxon = %cursor, archived = keep_outside, "Taxon pruned");

            let Some(parent_id) = parent else {
                self.num_roots = self.num_roots.saturating_sub(1);
                break;
            };
            let Some(parent_taxon) = self.taxa.get_mut(&parent_id) else {
                break;
            };
            let has_children = parent_taxon.remove_offspring(cursor);
            if has_children || parent_taxon.is_active() {
                break;
            }
            cursor = parent_id;
        }
    }

    /// Deletes old extinct history.
    ///
    /// A taxon is removed when it is extinct, died before `threshold`, and
    /// every stored ancestor also died before `threshold`. Survivors whose
    /// parent was removed become roots. Returns the number of removed taxa.
    pub fn remove_before(&mut self, threshold: f64) -> usize {
        let doomed: HashSet<TaxonId> = self
            .taxa
            .values()
            .filter(|t| t.state() != TaxonState::Active && t.destruction_time() < threshold)
            .filter(|t| {
                let mut cursor = self.parent(t.id());
                while let Some(id) = cursor {
                    if self.taxon(id).destruction_time() >= threshold {
                        return false;
                    }
                    cursor = self.parent(id);
                }
                true
            })
            .map(Taxon::id)
            .collect();

        if doomed.is_empty() {
            return 0;
        }

        for id in &doomed {
            self.taxa.remove(id);
            self.ancestors.remove(id);
            self.outside.remove(id);
        }
        for taxon in self.taxa.values_mut() {
            if taxon.parent().is_some_and(|p| doomed.contains(&p)) {
                taxon.clear_parent();
            }
        }
        self.num_roots = self
            .taxa
            .values()
            .filter(|t| t.state().in_tree() && t.is_root())
            .count();
        self.invalidate_mrca();

        tracing::info!(
            removed = doomed.len(),
            remaining = self.taxa.len(),
            roots = self.num_roots,
            threshold,
            "Removed old history"
        );
        doomed.len()
    }

    // --- Reconstruction ---

    /// Builds a forest from snapshot records.
    ///
    /// Only the first listed parent of each record is linked. A taxon counts
    /// as active when its destruction time is infinite, or when it is a leaf
    /// and `assume_leaves_extant` is set. Extinct taxa on a path to an active
    /// taxon become ancestors; the rest are outside and are kept only when the
    /// configuration archives them.
    pub fn from_records(
        records: Vec<TaxonRecord<I>>,
        config: SystematicsConfig,
        assume_leaves_extant: bool,
        adjust_total_offspring: bool,
    ) -> Result<Self> {
        let mut forest = Self::new(config);
        let mut loaded: Vec<LoadedCounts> = Vec::with_capacity(records.len());

        for record in records {
            let id = record.id;
            if forest.taxa.contains_key(&id) {
                return Err(SystematicsError::DuplicateTaxon(id));
            }
            let parent = record.parent();
            let origination = record.origination_time.unwrap_or(0.0);
            loaded.push(LoadedCounts {
                id,
                num_orgs: record.num_orgs,
                tot_orgs: record.tot_orgs,
                total_offspring: record.total_offspring,
                destruction: record.destruction_time,
            });
            forest
                .taxa
                .insert(id, Taxon::new(id, record.info, parent, origination));
            forest.next_id = forest.next_id.max(id.0 + 1);
        }

        for &LoadedCounts { id, .. } in &loaded {
            if let Some(parent) = forest.taxa[&id].parent() {
                if parent == id || !forest.taxa.contains_key(&parent) {
                    return Err(SystematicsError::UnknownParent { child: id, parent });
                }
                forest.taxon_mut(parent).add_offspring(id);
            }
        }

        // Every chain must reach a root within `n` steps.
        let limit = forest.taxa.len();
        let mut descendants: HashMap<TaxonId, usize> = HashMap::new();
        for &LoadedCounts { id, .. } in &loaded {
            let mut steps = 0;
            let mut cursor = forest.taxa[&id].parent();
            while let Some(ancestor) = cursor {
                steps += 1;
                if steps > limit {
                    return Err(SystematicsError::CyclicAncestry(id));
                }
                *descendants.entry(ancestor).or_default() += 1;
                cursor = forest.taxa[&ancestor].parent();
            }
        }

        for counts in &loaded {
            let id = counts.id;
            let leaf = forest.taxa[&id].out_degree() == 0;
            let alive = (assume_leaves_extant && leaf)
                || counts.destruction.is_some_and(|d| d.is_infinite() && d > 0.0);
            let num_orgs = if alive {
                counts.num_orgs.filter(|n| *n > 0).unwrap_or(1)
            } else {
                0
            };
            let total_offspring = if adjust_total_offspring {
                descendants.get(&id).copied().unwrap_or(0)
            } else {
                counts.total_offspring.unwrap_or(0)
            };
            let tot_orgs = counts.tot_orgs.unwrap_or(num_orgs);
            let destruction = counts.destruction;
            let taxon = forest.taxon_mut(id);
            taxon.restore_counts(num_orgs, tot_orgs, total_offspring);
            if !alive {
                let time = destruction.unwrap_or_else(|| taxon.origination_time());
                taxon.set_destruction_time(time);
            }
        }

        let active: Vec<TaxonId> = forest
            .taxa
            .values()
            .filter(|t| t.is_active())
            .map(Taxon::id)
            .collect();
        let mut in_tree: HashSet<TaxonId> = active.iter().copied().collect();
        for id in &active {
            let mut cursor = forest.taxa[id].parent();
            while let Some(ancestor) = cursor {
                if !in_tree.insert(ancestor) {
                    break;
                }
                cursor = forest.taxa[&ancestor].parent();
            }
        }

        let keep_outside = forest.config.keeps_outside();
        let mut ids: Vec<TaxonId> = forest.taxa.keys().copied().collect();
        ids.sort_unstable();
        let mut dropped = Vec::new();
        for id in ids {
            let taxon = forest.taxon_mut(id);
            if taxon.is_active() {
                taxon.set_state(TaxonState::Active);
                if forest.config.store_active {
                    forest.active.insert(id);
                }
            } else if in_tree.contains(&id) {
                taxon.set_state(TaxonState::Ancestor);
                if forest.config.store_ancestors {
                    forest.ancestors.insert(id);
                }
            } else {
                taxon.set_state(TaxonState::Outside);
                if let Some(parent) = taxon.parent() {
                    forest.taxon_mut(parent).remove_offspring(id);
                }
                if keep_outside {
                    forest.outside.insert(id);
                } else {
                    dropped.push(id);
                }
            }
        }
        for id in dropped {
            forest.taxa.remove(&id);
        }

        forest.num_roots = forest
            .taxa
            .values()
            .filter(|t| t.state().in_tree() && t.is_root())
            .count();
        Ok(forest)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Stable identifier of a taxon. Ids are handed out sequentially and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxonId(pub u64);

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaxonId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Which partition of the forest a taxon currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaxonState {
    /// At least one living organism.
    #[default]
    Active,
    /// Extinct, but on the path between an active taxon and a root.
    Ancestor,
    /// Extinct with no surviving descendants; only kept when archiving.
    Outside,
}

impl TaxonState {
    /// True for the partitions that make up the current tree.
    pub fn in_tree(self) -> bool {
        matches!(self, Self::Active | Self::Ancestor)
    }
}

/// A maximal run of organisms sharing one classification along a lineage.
///
/// Taxa are owned by the forest that created them. Parent and offspring links
/// are ids into that forest, never owning references.
#[derive(Debug, Clone)]
pub struct Taxon<I> {
    id: TaxonId,
    info: I,
    parent: Option<TaxonId>,
    state: TaxonState,
    num_orgs: usize,
    tot_orgs: usize,
    num_offspring: usize,
    total_offspring: usize,
    offspring: BTreeSet<TaxonId>,
    origination_time: f64,
    destruction_time: f64,
}

impl<I> Taxon<I> {
    /// Creates a taxon with no organisms yet.
    pub fn new(id: TaxonId, info: I, parent: Option<TaxonId>, origination_time: f64) -> Self {
        Self {
            id,
            info,
            parent,
            state: TaxonState::Active,
            num_orgs: 0,
            tot_orgs: 0,
            num_offspring: 0,
            total_offspring: 0,
            offspring: BTreeSet::new(),
            origination_time,
            destruction_time: f64::INFINITY,
        }
    }

    pub fn id(&self) -> TaxonId {
        self.id
    }

    pub fn info(&self) -> &I {
        &self.info
    }

    pub fn parent(&self) -> Option<TaxonId> {
        self.parent
    }

    pub fn state(&self) -> TaxonState {
        self.state
    }

    /// Living organisms currently classified under this taxon.
    pub fn num_orgs(&self) -> usize {
        self.num_orgs
    }

    /// Organisms ever classified under this taxon.
    pub fn tot_orgs(&self) -> usize {
        self.tot_orgs
    }

    /// Direct child taxa ever spawned.
    pub fn num_offspring(&self) -> usize {
        self.num_offspring
    }

    /// Direct and indirect descendant taxa ever spawned.
    pub fn total_offspring(&self) -> usize {
        self.total_offspring
    }

    /// Children that are still part of the tree.
    pub fn offspring(&self) -> &BTreeSet<TaxonId> {
        &self.offspring
    }

    /// Number of children currently in the tree.
    pub fn out_degree(&self) -> usize {
        self.offspring.len()
    }

    pub fn origination_time(&self) -> f64 {
        self.origination_time
    }

    /// `+inf` while any organism of this taxon is alive.
    pub fn destruction_time(&self) -> f64 {
        self.destruction_time
    }

    pub fn is_active(&self) -> bool {
        self.num_orgs > 0
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Records one more living organism.
    pub fn add_org(&mut self) {
        self.num_orgs += 1;
        self.tot_orgs += 1;
    }

    /// Records the death of one organism and returns `true` if none are left.
    ///
    /// # Panics
    ///
    /// Panics if the taxon has no living organisms.
    pub fn remove_org(&mut self) -> bool {
        assert!(
            self.num_orgs > 0,
            "taxon {} has no living organisms to remove",
            self.id
        );
        self.num_orgs -= 1;
        self.num_orgs == 0
    }

    /// Registers a newly created child taxon.
    pub fn add_offspring(&mut self, child: TaxonId) {
        self.num_offspring += 1;
        self.offspring.insert(child);
    }

    /// Reattaches a child that was detached by pruning, without counting a
    /// new birth.
    pub fn relink_offspring(&mut self, child: TaxonId) {
        self.offspring.insert(child);
    }

    /// Counts one more descendant somewhere below this taxon.
    pub fn add_total_offspring(&mut self) {
        self.total_offspring += 1;
    }

    /// Detaches a child from the tree and returns `true` if children remain.
    pub fn remove_offspring(&mut self, child: TaxonId) -> bool {
        self.offspring.remove(&child);
        !self.offspring.is_empty()
    }

    pub fn set_state(&mut self, state: TaxonState) {
        self.state = state;
    }

    pub fn set_destruction_time(&mut self, time: f64) {
        self.destruction_time = time;
    }

    /// Forgets the parent link, turning this taxon into a root.
    pub fn clear_parent(&mut self) {
        self.parent = None;
    }

    /// Overwrites the organism counters when rebuilding a forest from records.
    pub fn restore_counts(&mut self, num_orgs: usize, tot_orgs: usize, total_offspring: usize) {
        self.num_orgs = num_orgs;
        self.tot_orgs = tot_orgs.max(num_orgs);
        self.total_offspring = total_offspring;
    }
}

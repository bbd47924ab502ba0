//! The systematics manager: turns organism birth, death and move events into
//! forest updates.

use crate::config::SystematicsConfig;
use crate::error::{Result, SystematicsError};
use crate::forest::TaxonForest;
use crate::position_index::PositionIndex;
use phylotrack_data::{Taxon, TaxonId, TaxonRecord, WorldPosition};
use std::fmt;
use std::ops::Deref;

/// Listener invoked with a freshly created taxon and the organism that founded it.
pub type NewTaxonCallback<I, O> = Box<dyn FnMut(&Taxon<I>, &O)>;

/// Extra snapshot column: a name and a function producing the cell value.
pub type SnapshotFun<I> = Box<dyn Fn(&Taxon<I>) -> String>;

/// Tracks the phylogeny of a population of organisms of type `O`, grouped into
/// taxa by the classification value `I`.
///
/// Read-only queries (lineage, statistics, counters) are available through
/// `Deref` to [`TaxonForest`].
pub struct Systematics<O, I> {
    forest: TaxonForest<I>,
    classify: Box<dyn Fn(&O) -> I>,
    positions: PositionIndex,
    curr_update: u64,
    next_parent: Option<TaxonId>,
    pending_removal: Option<(TaxonId, Option<WorldPosition>)>,
    on_new: Option<NewTaxonCallback<I, O>>,
    snapshot_funs: Vec<(String, SnapshotFun<I>)>,
}

impl<O, I> fmt::Debug for Systematics<O, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Systematics")
            .field("forest", &self.forest)
            .field("curr_update", &self.curr_update)
            .field("next_parent", &self.next_parent)
            .field("pending_removal", &self.pending_removal)
            .finish()
    }
}

impl<O, I> Deref for Systematics<O, I> {
    type Target = TaxonForest<I>;

    fn deref(&self) -> &Self::Target {
        &self.forest
    }
}

impl<I: Clone + PartialEq + 'static> Systematics<I, I> {
    /// A manager whose organisms are their own classification.
    pub fn identity() -> Self {
        Self::new(|org: &I| org.clone())
    }
}

impl<O, I: PartialEq> Systematics<O, I> {
    /// Creates a manager with the default configuration.
    pub fn new(classify: impl Fn(&O) -> I + 'static) -> Self {
        Self {
            forest: TaxonForest::new(SystematicsConfig::default()),
            classify: Box::new(classify),
            positions: PositionIndex::new(),
            curr_update: 0,
            next_parent: None,
            pending_removal: None,
            on_new: None,
            snapshot_funs: Vec::new(),
        }
    }

    /// Creates a manager after validating `config`.
    pub fn with_config(
        classify: impl Fn(&O) -> I + 'static,
        config: SystematicsConfig,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let mut sys = Self::new(classify);
        *sys.forest.config_mut() = config;
        Ok(sys)
    }

    pub fn forest(&self) -> &TaxonForest<I> {
        &self.forest
    }

    /// Replaces the classification function for future births.
    pub fn set_classifier(&mut self, classify: impl Fn(&O) -> I + 'static) {
        self.classify = Box::new(classify);
    }

    // --- Configuration ---

    pub fn store_active(&self) -> bool {
        self.config().store_active
    }

    pub fn store_ancestors(&self) -> bool {
        self.config().store_ancestors
    }

    pub fn store_outside(&self) -> bool {
        self.config().store_outside
    }

    pub fn archive(&self) -> bool {
        self.config().archive
    }

    pub fn store_position(&self) -> bool {
        self.config().store_position
    }

    pub fn track_synchronous(&self) -> bool {
        self.config().track_synchronous
    }

    pub fn set_store_active(&mut self, value: bool) {
        self.forest.config_mut().store_active = value;
    }

    pub fn set_store_ancestors(&mut self, value: bool) {
        self.forest.config_mut().store_ancestors = value;
    }

    /// Enabling outside storage also enables archiving.
    pub fn set_store_outside(&mut self, value: bool) {
        let config = self.forest.config_mut();
        config.store_outside = value;
        config.archive |= value;
    }

    /// Disabling archiving also disables outside storage.
    pub fn set_archive(&mut self, value: bool) {
        let config = self.forest.config_mut();
        config.archive = value;
        config.store_outside &= value;
    }

    /// Disabling position tracking also disables synchronous tracking and
    /// forgets every recorded position.
    pub fn set_store_position(&mut self, value: bool) {
        let config = self.forest.config_mut();
        config.store_position = value;
        config.track_synchronous &= value;
        if !value {
            self.positions.clear_all();
        }
    }

    /// Enabling synchronous tracking also enables position tracking.
    pub fn set_track_synchronous(&mut self, value: bool) {
        let config = self.forest.config_mut();
        config.track_synchronous = value;
        config.store_position |= value;
    }

    // --- Signals ---

    pub fn set_on_new(&mut self, callback: impl FnMut(&Taxon<I>, &O) + 'static) {
        self.on_new = Some(Box::new(callback));
    }

    pub fn set_on_extinct(&mut self, callback: impl FnMut(&Taxon<I>) + 'static) {
        self.forest.set_on_extinct(callback);
    }

    pub fn set_on_prune(&mut self, callback: impl FnMut(&Taxon<I>) + 'static) {
        self.forest.set_on_prune(callback);
    }

    // --- Time ---

    /// Advances the clock by one update.
    ///
    /// With synchronous tracking the next generation replaces the current
    /// one; organisms left in the replaced generation die with it.
    pub fn update(&mut self) {
        self.curr_update += 1;
        if self.config().track_synchronous {
            let replaced = self.positions.advance_generation();
            let now = self.now();
            for id in &replaced {
                if self.forest.get(*id).is_some_and(Taxon::is_active) {
                    self.forest.retire(*id, now);
                }
            }
            tracing::debug!(
                update = self.curr_update,
                replaced = replaced.len(),
                "Generation advanced"
            );
        }
    }

    pub fn set_update(&mut self, update: u64) {
        self.curr_update = update;
    }

    pub fn current_update(&self) -> u64 {
        self.curr_update
    }

    fn now(&self) -> f64 {
        self.curr_update as f64
    }

    // --- Positions ---

    fn require_positions(&self) -> Result<()> {
        if self.config().store_position {
            Ok(())
        } else {
            tracing::warn!("Positional operation requested without position tracking");
            Err(SystematicsError::PositionTrackingDisabled)
        }
    }

    /// Active taxon recorded at `pos`.
    pub fn taxon_at(&self, pos: WorldPosition) -> Option<TaxonId> {
        self.positions
            .get(pos)
            .filter(|id| self.forest.get(*id).is_some_and(Taxon::is_active))
    }

    pub fn is_taxon_at(&self, pos: WorldPosition) -> bool {
        self.taxon_at(pos).is_some()
    }

    /// Occupied slots of the current population.
    pub fn occupied_positions(&self) -> impl Iterator<Item = (WorldPosition, TaxonId)> + '_ {
        self.positions.occupied()
    }

    fn resolve(&self, pos: WorldPosition) -> Result<TaxonId> {
        self.require_positions()?;
        self.taxon_at(pos).ok_or_else(|| {
            tracing::warn!(position = %pos, "No taxon at position");
            SystematicsError::NoTaxonAtPosition(pos)
        })
    }

    /// Exchanges the taxa recorded at two positions.
    pub fn swap_positions(&mut self, a: WorldPosition, b: WorldPosition) {
        if self.config().store_position {
            self.positions.swap(a, b);
        }
    }

    // --- Births ---

    /// Stages the parent of the next birth that names none.
    pub fn set_next_parent(&mut self, parent: TaxonId) {
        self.forest.taxon(parent);
        self.next_parent = Some(parent);
    }

    /// Stages the taxon at `pos` as the parent of the next parentless birth.
    pub fn set_next_parent_at(&mut self, pos: WorldPosition) -> Result<()> {
        let parent = self.resolve(pos)?;
        self.next_parent = Some(parent);
        Ok(())
    }

    pub fn next_parent(&self) -> Option<TaxonId> {
        self.next_parent
    }

    /// Records the birth of `org` without a position.
    pub fn add_org(&mut self, org: &O, parent: Option<TaxonId>) -> TaxonId {
        self.record_birth(org, None, parent)
    }

    /// Records the birth of `org` at `pos`.
    pub fn add_org_at(&mut self, org: &O, pos: WorldPosition, parent: Option<TaxonId>) -> TaxonId {
        self.record_birth(org, Some(pos), parent)
    }

    /// Records the birth of `org` at `pos`, descended from the organism at
    /// `parent_pos`.
    pub fn add_org_at_with_parent_pos(
        &mut self,
        org: &O,
        pos: WorldPosition,
        parent_pos: WorldPosition,
    ) -> Result<TaxonId> {
        let parent = self.resolve(parent_pos)?;
        Ok(self.record_birth(org, Some(pos), Some(parent)))
    }

    fn record_birth(
        &mut self,
        org: &O,
        pos: Option<WorldPosition>,
        parent: Option<TaxonId>,
    ) -> TaxonId {
        let parent = parent.or_else(|| self.next_parent.take());
        let info = (self.classify)(org);
        let joined = parent.filter(|p| {
            let taxon = self.forest.taxon(*p);
            taxon.is_active() && *taxon.info() == info
        });

        let taxon = match joined {
            Some(existing) => {
                self.forest.join(existing);
                existing
            }
            None => {
                let time = self.now();
                let on_new = &mut self.on_new;
                self.forest.create(info, parent, time, |taxon| {
                    if let Some(callback) = on_new.as_mut() {
                        callback(taxon, org);
                    }
                })
            }
        };

        let written = pos.filter(|_| self.config().store_position);
        if let Some(pos) = written {
            self.positions.place(pos, taxon);
        }
        self.apply_pending_removal(written);
        taxon
    }

    // --- Deaths ---

    /// Records the death of one organism of `taxon`. Returns `true` if the
    /// taxon went extinct.
    pub fn remove_org(&mut self, taxon: TaxonId) -> bool {
        let now = self.now();
        self.forest.retire(taxon, now)
    }

    /// Records the death of the organism at `pos`.
    pub fn remove_org_at(&mut self, pos: WorldPosition) -> Result<bool> {
        let taxon = self.resolve(pos)?;
        self.positions.clear(pos);
        Ok(self.remove_org(taxon))
    }

    /// Defers the death of an organism of `taxon` until the next birth is
    /// recorded, so a parent can die in the same step it reproduces.
    pub fn remove_org_after_repro(&mut self, taxon: TaxonId) {
        self.forest.taxon(taxon);
        self.apply_pending_removal(None);
        self.pending_removal = Some((taxon, None));
    }

    /// Positional form of [`Systematics::remove_org_after_repro`].
    pub fn remove_org_at_after_repro(&mut self, pos: WorldPosition) -> Result<()> {
        let taxon = self.resolve(pos)?;
        self.apply_pending_removal(None);
        self.pending_removal = Some((taxon, Some(pos)));
        Ok(())
    }

    /// Applies a deferred death. The dead organism's slot is left alone when
    /// the birth that triggered this just wrote to it.
    fn apply_pending_removal(&mut self, written: Option<WorldPosition>) {
        let Some((taxon, pos)) = self.pending_removal.take() else {
            return;
        };
        if let Some(pos) = pos.filter(|p| Some(*p) != written) {
            self.positions.clear(pos);
        }
        self.remove_org(taxon);
    }

    // --- History ---

    /// Deletes extinct history older than `threshold`; see
    /// [`TaxonForest::remove_before`].
    pub fn remove_before(&mut self, threshold: f64) -> usize {
        self.forest.remove_before(threshold)
    }

    /// Replaces the forest with one rebuilt from snapshot records.
    ///
    /// On error the manager is left untouched. On success recorded positions,
    /// the staged parent and any deferred death are discarded.
    pub fn restore(
        &mut self,
        records: Vec<TaxonRecord<I>>,
        assume_leaves_extant: bool,
        adjust_total_offspring: bool,
    ) -> Result<()> {
        let mut forest = TaxonForest::from_records(
            records,
            *self.config(),
            assume_leaves_extant,
            adjust_total_offspring,
        )?;
        forest.adopt_signals(&mut self.forest);
        self.forest = forest;
        self.positions.clear_all();
        self.next_parent = None;
        self.pending_removal = None;

        tracing::info!(
            taxa = self.forest.num_taxa(),
            active = self.forest.num_active(),
            ancestors = self.forest.num_ancestors(),
            outside = self.forest.num_outside(),
            roots = self.forest.num_roots(),
            "Forest restored"
        );
        Ok(())
    }

    // --- Snapshot columns ---

    /// Registers an extra snapshot column.
    pub fn add_snapshot_fun(
        &mut self,
        key: impl Into<String>,
        fun: impl Fn(&Taxon<I>) -> String + 'static,
    ) {
        self.snapshot_funs.push((key.into(), Box::new(fun)));
    }

    pub fn snapshot_funs(&self) -> impl Iterator<Item = (&str, &SnapshotFun<I>)> {
        self.snapshot_funs.iter().map(|(k, f)| (k.as_str(), f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn positional() -> Systematics<char, char> {
        Systematics::with_config(
            |c: &char| *c,
            SystematicsConfig {
                store_position: true,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_same_info_joins_parent() {
        let mut sys = Systematics::<char, char>::identity();
        let root = sys.add_org(&'A', None);
        let same = sys.add_org(&'A', Some(root));
        let other = sys.add_org(&'B', Some(root));

        assert_eq!(same, root);
        assert_ne!(other, root);
        assert_eq!(sys.num_taxa(), 2);
        assert_eq!(sys.taxon(root).num_orgs(), 2);
        assert_eq!(sys.taxon(other).num_orgs(), 1);
        assert_eq!(sys.num_roots(), 1);
    }

    #[test]
    fn test_extinct_parent_spawns_new_taxon() {
        let mut sys = Systematics::<char, char>::identity();
        let root = sys.add_org(&'A', None);
        let child = sys.add_org(&'B', Some(root));
        sys.remove_org(root);
        let again = sys.add_org(&'A', Some(root));
        assert_ne!(again, root);
        assert_eq!(sys.taxon(root).out_degree(), 2);
        assert!(sys.contains(child));
    }

    #[test]
    fn test_next_parent_is_used_once() {
        let mut sys = Systematics::<char, char>::identity();
        let root = sys.add_org(&'A', None);
        sys.set_next_parent(root);
        let child = sys.add_org(&'B', None);
        let orphan = sys.add_org(&'C', None);
        assert_eq!(sys.parent(child), Some(root));
        assert_eq!(sys.parent(orphan), None);
        assert_eq!(sys.num_roots(), 2);
        assert_eq!(sys.next_parent(), None);
    }

    #[test]
    fn test_on_new_receives_founder() {
        let mut sys = Systematics::<char, char>::identity();
        let founders = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&founders);
        sys.set_on_new(move |taxon, org| log.borrow_mut().push((taxon.id(), *org)));

        let root = sys.add_org(&'A', None);
        sys.add_org(&'A', Some(root));
        let child = sys.add_org(&'B', Some(root));
        assert_eq!(*founders.borrow(), vec![(root, 'A'), (child, 'B')]);
    }

    #[test]
    fn test_positional_birth_and_death() {
        let mut sys = positional();
        let parent_pos = WorldPosition::active(1);
        let child_pos = WorldPosition::active(2);
        let root = sys.add_org_at(&'A', parent_pos, None);
        let child = sys
            .add_org_at_with_parent_pos(&'B', child_pos, parent_pos)
            .unwrap();

        assert_eq!(sys.taxon_at(parent_pos), Some(root));
        assert_eq!(sys.parent(child), Some(root));
        assert_eq!(sys.remove_org_at(parent_pos), Ok(true));
        assert_eq!(sys.num_ancestors(), 1);
        assert_eq!(
            sys.remove_org_at(parent_pos),
            Err(SystematicsError::NoTaxonAtPosition(parent_pos))
        );
    }

    #[test]
    fn test_positional_ops_require_tracking() {
        let mut sys = Systematics::<char, char>::identity();
        sys.add_org_at(&'A', WorldPosition::active(0), None);
        assert_eq!(
            sys.remove_org_at(WorldPosition::active(0)),
            Err(SystematicsError::PositionTrackingDisabled)
        );
    }

    #[test]
    fn test_swap_positions() {
        let mut sys = positional();
        let a = sys.add_org_at(&'A', WorldPosition::active(0), None);
        let b = sys.add_org_at(&'B', WorldPosition::active(1), Some(a));
        sys.swap_positions(WorldPosition::active(0), WorldPosition::active(1));
        assert_eq!(sys.taxon_at(WorldPosition::active(0)), Some(b));
        assert_eq!(sys.taxon_at(WorldPosition::active(1)), Some(a));
        assert_eq!(sys.taxon(a).num_orgs(), 1);
    }

    #[test]
    fn test_deferred_removal_applies_after_birth() {
        let mut sys = positional();
        let pos = WorldPosition::active(0);
        let root = sys.add_org_at(&'A', pos, None);
        sys.remove_org_at_after_repro(pos).unwrap();
        assert!(sys.taxon(root).is_active());

        // Offspring replaces its parent in the same slot.
        let child = sys.add_org_at(&'B', pos, Some(root));
        assert_eq!(sys.taxon_at(pos), Some(child));
        assert_eq!(sys.num_active(), 1);
        assert_eq!(sys.num_ancestors(), 1);
    }

    #[test]
    fn test_second_deferral_applies_first() {
        let mut sys = Systematics::<char, char>::identity();
        let a = sys.add_org(&'A', None);
        let b = sys.add_org(&'B', None);
        sys.remove_org_after_repro(a);
        sys.remove_org_after_repro(b);
        assert!(!sys.contains(a));
        assert!(sys.contains(b));
        sys.add_org(&'C', None);
        assert!(!sys.contains(b));
    }

    #[test]
    fn test_synchronous_generations() {
        let mut sys = Systematics::with_config(
            |c: &char| *c,
            SystematicsConfig {
                store_position: true,
                track_synchronous: true,
                ..Default::default()
            },
        )
        .unwrap();
        let root = sys.add_org_at(&'A', WorldPosition::active(0), None);
        let child = sys.add_org_at(&'B', WorldPosition::new(0, 1), Some(root));
        assert_eq!(sys.taxon_at(WorldPosition::active(0)), Some(root));

        sys.update();
        assert_eq!(sys.current_update(), 1);
        assert_eq!(sys.taxon_at(WorldPosition::active(0)), Some(child));
        assert!(!sys.taxon(root).is_active());
        assert_eq!(sys.taxon(root).destruction_time(), 1.0);
    }

    #[test]
    fn test_config_setters_keep_settings_consistent() {
        let mut sys = Systematics::<char, char>::identity();
        sys.set_store_outside(true);
        assert!(sys.archive());
        sys.set_archive(false);
        assert!(!sys.store_outside());
        sys.set_track_synchronous(true);
        assert!(sys.store_position());
        sys.set_store_position(false);
        assert!(!sys.track_synchronous());
        assert!(sys.config().validate().is_ok());
    }

    #[test]
    fn test_failed_restore_keeps_state() {
        let mut sys = Systematics::<char, char>::identity();
        let root = sys.add_org(&'A', None);
        let records = vec![TaxonRecord::new(TaxonId(5), vec![TaxonId(6)], 'X')];
        assert!(sys.restore(records, true, true).is_err());
        assert!(sys.contains(root));
        assert_eq!(sys.num_active(), 1);
    }
}

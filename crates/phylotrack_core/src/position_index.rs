use phylotrack_data::{TaxonId, WorldPosition};

/// Slot tables mapping population positions to the taxon occupying them.
///
/// Population 0 is the current population. Any other population id addresses
/// the next generation, which only exists in synchronous worlds.
#[derive(Debug, Default, Clone)]
pub struct PositionIndex {
    current: Vec<Option<TaxonId>>,
    next: Vec<Option<TaxonId>>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, pos: WorldPosition) -> &Vec<Option<TaxonId>> {
        if pos.is_active() {
            &self.current
        } else {
            &self.next
        }
    }

    fn table_mut(&mut self, pos: WorldPosition) -> &mut Vec<Option<TaxonId>> {
        if pos.is_active() {
            &mut self.current
        } else {
            &mut self.next
        }
    }

    /// Taxon recorded at `pos`, if any.
    pub fn get(&self, pos: WorldPosition) -> Option<TaxonId> {
        if !pos.is_valid() {
            return None;
        }
        self.table(pos).get(pos.index()).copied().flatten()
    }

    /// Records `taxon` at `pos` and returns whatever was there before.
    pub fn place(&mut self, pos: WorldPosition, taxon: TaxonId) -> Option<TaxonId> {
        if !pos.is_valid() {
            return None;
        }
        let table = self.table_mut(pos);
        if table.len() <= pos.index() {
            table.resize(pos.index() + 1, None);
        }
        table[pos.index()].replace(taxon)
    }

    /// Empties the slot at `pos`, returning its previous occupant.
    pub fn clear(&mut self, pos: WorldPosition) -> Option<TaxonId> {
        if !pos.is_valid() {
            return None;
        }
        self.table_mut(pos)
            .get_mut(pos.index())
            .and_then(Option::take)
    }

    /// Exchanges two slots, possibly across populations.
    pub fn swap(&mut self, a: WorldPosition, b: WorldPosition) {
        let at_a = self.get(a);
        let at_b = self.get(b);
        match at_b {
            Some(id) => {
                self.place(a, id);
            }
            None => {
                self.clear(a);
            }
        }
        match at_a {
            Some(id) => {
                self.place(b, id);
            }
            None => {
                self.clear(b);
            }
        }
    }

    /// Promotes the next generation to current and returns the taxa that
    /// occupied the replaced generation.
    pub fn advance_generation(&mut self) -> Vec<TaxonId> {
        let replaced = std::mem::take(&mut self.current);
        self.current = std::mem::take(&mut self.next);
        replaced.into_iter().flatten().collect()
    }

    /// Removes every occupant of every population.
    pub fn clear_all(&mut self) {
        self.current.clear();
        self.next.clear();
    }

    /// Occupied positions of the current population, in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (WorldPosition, TaxonId)> + '_ {
        self.current
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.map(|id| (WorldPosition::active(idx), id)))
    }
}

use super::taxon::TaxonId;

/// One taxon as read back from a snapshot, before the forest is rebuilt.
///
/// Optional fields correspond to optional snapshot columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonRecord<I> {
    pub id: TaxonId,
    /// Parents listed in the ancestor column. Only the first one is linked.
    pub parents: Vec<TaxonId>,
    pub info: I,
    pub origination_time: Option<f64>,
    pub destruction_time: Option<f64>,
    pub num_orgs: Option<usize>,
    pub tot_orgs: Option<usize>,
    pub total_offspring: Option<usize>,
}

impl<I> TaxonRecord<I> {
    /// A record carrying only the mandatory columns.
    pub fn new(id: TaxonId, parents: Vec<TaxonId>, info: I) -> Self {
        Self {
            id,
            parents,
            info,
            origination_time: None,
            destruction_time: None,
            num_orgs: None,
            tot_orgs: None,
            total_offspring: None,
        }
    }

    pub fn parent(&self) -> Option<TaxonId> {
        self.parents.first().copied()
    }
}

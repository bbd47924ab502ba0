use serde::{Deserialize, Serialize};
use std::fmt;

/// Location of an organism: a slot index inside a numbered population.
///
/// Population 0 holds the organisms currently alive. In synchronous
/// (generational) worlds, population 1 holds the generation being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPosition {
    index: usize,
    pop_id: usize,
}

impl WorldPosition {
    /// Slot value marking a position that is not to be used.
    pub const INVALID_INDEX: usize = usize::MAX;

    pub fn new(index: usize, pop_id: usize) -> Self {
        Self { index, pop_id }
    }

    /// A position in the active population.
    pub fn active(index: usize) -> Self {
        Self::new(index, 0)
    }

    /// Sentinel for "not applicable".
    pub fn invalid() -> Self {
        Self::new(Self::INVALID_INDEX, 0)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pop_id(&self) -> usize {
        self.pop_id
    }

    /// By convention the population under selection has id 0.
    pub fn is_active(&self) -> bool {
        self.pop_id == 0
    }

    pub fn is_valid(&self) -> bool {
        self.index != Self::INVALID_INDEX
    }
}

impl Default for WorldPosition {
    fn default() -> Self {
        Self::invalid()
    }
}

impl From<usize> for WorldPosition {
    fn from(index: usize) -> Self {
        Self::active(index)
    }
}

impl fmt::Display for WorldPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}:{}", self.pop_id, self.index)
        } else {
            write!(f, "{}:-1", self.pop_id)
        }
    }
}

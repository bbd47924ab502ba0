//! Taxa, population positions and load-time records.

pub mod position;
pub mod record;
pub mod taxon;

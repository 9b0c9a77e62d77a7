mod config;
mod nasberg;
mod result;
mod section;
mod value_table;

pub use config::{BuckingConfig, SpeciesOverride, SpeciesSettings, TieBreak};
pub use nasberg::{BranchAndBoundBucker, MAX_NODES, MIN_LOG_LENGTH_DM};
pub use result::BuckingResult;
pub use section::{merge_sections, CrossCutSection, QualityType};
pub use value_table::ValueTable;

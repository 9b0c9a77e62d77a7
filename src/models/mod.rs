mod estimate;
mod species;
mod timber;

pub use estimate::{Estimate, OutOfRangeWarning};
pub(crate) use estimate::check_min;
pub use species::Species;
pub use timber::{Region, Timber, DEFAULT_STUMP_HEIGHT_RATIO};

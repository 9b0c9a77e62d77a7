pub mod bucking;
pub mod config;
pub mod cube;
pub mod error;
pub mod models;
pub mod pricelist;
pub mod taper;
pub mod visualization;

pub use bucking::{BranchAndBoundBucker, BuckingConfig, BuckingResult, CrossCutSection, QualityType};
pub use config::AppConfig;
pub use cube::{CubeGrid, SolutionCube};
pub use error::ForestError;
pub use models::{Species, Timber};
pub use pricelist::{create_pricelist_from_data, PriceData, Pricelist};
pub use taper::{Taper, TaperKind, TaperModel};

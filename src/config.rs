use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bucking::BuckingConfig;
use crate::cube::CubeGrid;
use crate::error::ForestError;
use crate::pricelist::{load_price_data, mellanskog_2013, PriceData};
use crate::taper::TaperKind;

/// Diameter above which no stem counts as dead wood.
pub const DEFAULT_MIN_DIAM_DEAD_WOOD: f64 = 99.0;

/// Settings read from a TOML file. Every field has a default, so an empty
/// file is valid.
///
/// ```toml
/// taper = "schmidt-2001"
/// pricelist = "prices.json"
///
/// [bucking]
/// use_downgrading = true
/// tie_break = "longest"
///
/// [bucking.species.picea]
/// timber_price_factor = 1.1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub taper: TaperKind,
    pub min_diam_dead_wood: f64,
    /// Price data JSON; the bundled Mellanskog 2013 list when absent
    pub pricelist: Option<PathBuf>,
    pub bucking: BuckingConfig,
    pub cube: CubeGrid,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            taper: TaperKind::default(),
            min_diam_dead_wood: DEFAULT_MIN_DIAM_DEAD_WOOD,
            pricelist: None,
            bucking: BuckingConfig::default(),
            cube: CubeGrid::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ForestError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        // Price list paths are relative to the config file.
        if let (Some(pl), Some(dir)) = (config.pricelist.as_mut(), path.parent()) {
            if pl.is_relative() {
                *pl = dir.join(&*pl);
            }
        }
        tracing::debug!(path = %path.display(), taper = %config.taper, "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ForestError> {
        if !(self.min_diam_dead_wood.is_finite() && self.min_diam_dead_wood >= 0.0) {
            return Err(ForestError::ConfigurationError(format!(
                "min_diam_dead_wood must be a non-negative number, got {}",
                self.min_diam_dead_wood
            )));
        }
        self.bucking.validate()
    }

    /// Price data named by the config, or the bundled list.
    pub fn price_data(&self) -> Result<PriceData, ForestError> {
        match &self.pricelist {
            Some(path) => load_price_data(path),
            None => mellanskog_2013(),
        }
    }
}

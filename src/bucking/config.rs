use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ForestError;
use crate::models::Species;

/// Which cut wins when several log lengths give the same value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Prefer the shortest qualifying log.
    #[default]
    Shortest,
    /// Prefer the longest qualifying log.
    Longest,
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TieBreak::Shortest => write!(f, "shortest"),
            TieBreak::Longest => write!(f, "longest"),
        }
    }
}

impl std::str::FromStr for TieBreak {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shortest" => Ok(TieBreak::Shortest),
            "longest" => Ok(TieBreak::Longest),
            _ => Err(ForestError::ParseError(format!(
                "Unknown tie-break policy: '{s}'"
            ))),
        }
    }
}

/// Per-species replacements for the global price factors and downgrading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesOverride {
    pub timber_price_factor: Option<f64>,
    pub pulp_price_factor: Option<f64>,
    pub use_downgrading: Option<bool>,
}

/// Settings resolved for one species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesSettings {
    pub timber_price_factor: f64,
    pub pulp_price_factor: f64,
    pub use_downgrading: bool,
}

/// Options for one bucking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuckingConfig {
    pub timber_price_factor: f64,
    pub pulp_price_factor: f64,
    pub use_downgrading: bool,
    /// Keep the cutting plan in the result
    pub save_sections: bool,
    /// Leave the stem below the price list's high stump height standing
    pub leave_high_stump: bool,
    pub tie_break: TieBreak,
    /// Overrides keyed by species or genus name
    pub species: BTreeMap<String, SpeciesOverride>,
}

impl Default for BuckingConfig {
    fn default() -> Self {
        Self {
            timber_price_factor: 1.0,
            pulp_price_factor: 1.0,
            use_downgrading: false,
            save_sections: false,
            leave_high_stump: false,
            tie_break: TieBreak::default(),
            species: BTreeMap::new(),
        }
    }
}

impl BuckingConfig {
    pub fn with_downgrading(mut self, on: bool) -> Self {
        self.use_downgrading = on;
        self
    }

    pub fn with_sections(mut self, on: bool) -> Self {
        self.save_sections = on;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_high_stump(mut self, leave: bool) -> Self {
        self.leave_high_stump = leave;
        self
    }

    fn find_override(&self, species: &Species) -> Option<&SpeciesOverride> {
        let by_name = |wanted: &str| {
            self.species
                .iter()
                .find(|(k, _)| Species::new(k.as_str()).name() == wanted)
                .map(|(_, v)| v)
        };
        by_name(species.name()).or_else(|| by_name(species.genus()))
    }

    /// Global settings with any override for `species` (or its genus) applied.
    pub fn for_species(&self, species: &Species) -> SpeciesSettings {
        let o = self.find_override(species).copied().unwrap_or_default();
        SpeciesSettings {
            timber_price_factor: o.timber_price_factor.unwrap_or(self.timber_price_factor),
            pulp_price_factor: o.pulp_price_factor.unwrap_or(self.pulp_price_factor),
            use_downgrading: o.use_downgrading.unwrap_or(self.use_downgrading),
        }
    }

    pub fn validate(&self) -> Result<(), ForestError> {
        let check = |owner: &str, name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ForestError::ConfigurationError(format!(
                    "{owner}: {name} must be a non-negative number, got {v}"
                )))
            }
        };
        check("bucking", "timber_price_factor", self.timber_price_factor)?;
        check("bucking", "pulp_price_factor", self.pulp_price_factor)?;
        for (name, o) in &self.species {
            if let Some(v) = o.timber_price_factor {
                check(name, "timber_price_factor", v)?;
            }
            if let Some(v) = o.pulp_price_factor {
                check(name, "pulp_price_factor", v)?;
            }
        }
        Ok(())
    }
}

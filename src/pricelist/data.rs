use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    DiameterRange, DowngradeProportions, LengthCorrections, LengthRange, MaxHeights, Pricelist,
    PulpPricelist, TimberPriceForDiameter, TimberPricelist, VolumeType,
};
use crate::error::ForestError;
use crate::models::Species;

const MELLANSKOG_2013: &str = include_str!("../../data/mellanskog_2013.json");

/// Raw price data as stored on disk: a `Common` block plus one block per
/// species with a sawlog price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    #[serde(rename = "Common", default, skip_serializing_if = "Option::is_none")]
    pub common: Option<CommonData>,
    #[serde(flatten)]
    pub species: BTreeMap<String, SpeciesPriceData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommonData {
    pub sawlog_length_range: (f64, f64),
    pub pulpwood_length_range: (f64, f64),
    pub pulp_log_diameter_range: (f64, f64),
    pub top_diameter: f64,
    pub pulpwood_prices: BTreeMap<String, f64>,
    #[serde(default)]
    pub pulpwood_cull_proportion: f64,
    #[serde(default)]
    pub fuelwood_proportion: f64,
    pub harvest_residue_price: f64,
    pub fuelwood_log_price: f64,
    #[serde(default)]
    pub stump_price: f64,
    #[serde(default)]
    pub high_stump_height: f64,
    /// Decimetres; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_tree_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_price_trends: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeciesPriceData {
    pub volume_type: VolumeType,
    /// Diameter class (cm) to [butt, middle, top] prices. Keys stay strings
    /// because species blocks are read through a flattened map.
    pub diameter_prices: BTreeMap<String, [f64; 3]>,
    /// Diameter class to { length (dm): percent of base price }.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub length_corrections_percent: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub quality_outcome: BTreeMap<String, Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downgrade_proportions: Option<DowngradeData>,
    pub max_height: MaxHeightData,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DowngradeData {
    #[serde(default)]
    pub pulpwood: f64,
    #[serde(default)]
    pub fuelwood: f64,
    #[serde(default)]
    pub harvest_residue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaxHeightData {
    pub butt: f64,
    pub middle: f64,
    pub top: f64,
}

impl PriceData {
    pub fn from_json_str(json: &str) -> Result<Self, ForestError> {
        Ok(serde_json::from_str(json)?)
    }

    fn species_entry(&self, species: &Species) -> Option<(&String, &SpeciesPriceData)> {
        self.species
            .iter()
            .find(|(key, _)| Species::new(key.as_str()) == *species)
    }
}

/// Read price data from a JSON file.
pub fn load_price_data(path: impl AsRef<Path>) -> Result<PriceData, ForestError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    PriceData::from_json_str(&content)
}

/// The bundled Mellanskog 2013 price list (pine, spruce, birch pulpwood).
pub fn mellanskog_2013() -> Result<PriceData, ForestError> {
    PriceData::from_json_str(MELLANSKOG_2013)
}

/// Hex blake3 digest of the canonical JSON form of `data`.
///
/// Keys are sorted and numbers re-serialized, so formatting differences in
/// the source file do not change the hash.
pub fn content_hash(data: &PriceData) -> Result<String, ForestError> {
    let canonical = serde_json::to_value(data)?.to_string();
    Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
}

/// Build a `Pricelist` from raw price data.
///
/// With `species_to_load = None` every species block is loaded. Otherwise
/// only the named species are; a name missing from both the sawlog blocks
/// and the pulpwood prices is an error.
pub fn create_pricelist_from_data(
    data: &PriceData,
    species_to_load: Option<&[&str]>,
) -> Result<Pricelist, ForestError> {
    let common = data.common.as_ref().ok_or_else(|| {
        ForestError::ConfigurationError(
            "Price data is missing the mandatory 'Common' block".to_string(),
        )
    })?;

    let mut pricelist = Pricelist {
        timber: BTreeMap::new(),
        pulp: PulpPricelist::new(
            common
                .pulpwood_prices
                .iter()
                .map(|(name, price)| (Species::new(name), *price)),
        ),
        top_diameter: common.top_diameter,
        pulp_log_diameter: DiameterRange::new(
            common.pulp_log_diameter_range.0,
            common.pulp_log_diameter_range.1,
        ),
        timber_log_length: LengthRange::new(
            common.sawlog_length_range.0,
            common.sawlog_length_range.1,
        ),
        pulp_log_length: LengthRange::new(
            common.pulpwood_length_range.0,
            common.pulpwood_length_range.1,
        ),
        log_cull_price: common.harvest_residue_price,
        fuelwood_price: common.fuelwood_log_price,
        stump_price: common.stump_price,
        high_stump_height: common.high_stump_height,
        pulpwood_cull_proportion: common.pulpwood_cull_proportion,
        pulpwood_fuelwood_proportion: common.fuelwood_proportion,
    };

    match species_to_load {
        None => {
            for (name, block) in &data.species {
                pricelist
                    .timber
                    .insert(Species::new(name), timber_pricelist(name, block)?);
            }
        }
        Some(names) => {
            for name in names {
                let species = Species::new(name);
                if let Some((key, block)) = data.species_entry(&species) {
                    pricelist.timber.insert(species, timber_pricelist(key, block)?);
                } else if !pricelist.pulp.contains(&species) {
                    return Err(ForestError::ConfigurationError(format!(
                        "Species '{species}' not found in timber prices or pulp prices"
                    )));
                }
            }
        }
    }

    pricelist.validate()?;
    tracing::debug!(
        species = pricelist.timber.len(),
        "loaded timber price tables"
    );
    Ok(pricelist)
}

fn parse_class(species: &str, table: &str, key: &str) -> Result<u32, ForestError> {
    key.trim().parse().map_err(|_| {
        ForestError::ParseError(format!(
            "{species}: {table} key '{key}' is not a whole number"
        ))
    })
}

fn timber_pricelist(species: &str, block: &SpeciesPriceData) -> Result<TimberPricelist, ForestError> {
    let mut tp = TimberPricelist::new(block.volume_type);
    for (diameter, [butt, middle, top]) in &block.diameter_prices {
        let class = parse_class(species, "DiameterPrices", diameter)?;
        tp.set_price_for_diameter(class, TimberPriceForDiameter::new(*butt, *middle, *top));
    }
    let mut corrections = BTreeMap::new();
    for (diameter, lengths) in &block.length_corrections_percent {
        let class = parse_class(species, "LengthCorrectionsPercent", diameter)?;
        let mut by_length = BTreeMap::new();
        for (length, pct) in lengths {
            by_length.insert(parse_class(species, "LengthCorrectionsPercent", length)?, *pct);
        }
        corrections.insert(class, by_length);
    }
    tp.length_corrections = LengthCorrections(corrections);
    tp.quality_outcome = block.quality_outcome.clone();
    if let Some(d) = block.downgrade_proportions {
        tp.downgrade_proportions = DowngradeProportions::new(d.pulpwood, d.fuelwood, d.harvest_residue);
    }
    tp.max_height = MaxHeights {
        butt: block.max_height.butt,
        middle: block.max_height.middle,
        top: block.max_height.top,
    };
    Ok(tp)
}

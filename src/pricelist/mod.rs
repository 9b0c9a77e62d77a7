//! Timber and pulpwood price lists used to value log sections.

mod data;

pub use data::{
    content_hash, create_pricelist_from_data, load_price_data, mellanskog_2013, CommonData,
    DowngradeData, MaxHeightData, PriceData, SpeciesPriceData,
};

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ForestError;
use crate::models::Species;

/// Pulpwood price used when neither the species nor its genus is listed.
pub const DEFAULT_PULPWOOD_PRICE: f64 = 200.0;

/// Inclusive diameter range in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiameterRange {
    pub min: f64,
    pub max: f64,
}

impl DiameterRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, diameter_cm: f64) -> bool {
        diameter_cm >= self.min && diameter_cm <= self.max
    }
}

/// Inclusive log length range in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthRange {
    pub min: f64,
    pub max: f64,
}

impl LengthRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn min_dm(&self) -> u32 {
        metres_to_dm(self.min)
    }

    pub fn max_dm(&self) -> u32 {
        metres_to_dm(self.max)
    }

    pub fn contains_dm(&self, length_dm: u32) -> bool {
        length_dm >= self.min_dm() && length_dm <= self.max_dm()
    }
}

fn metres_to_dm(m: f64) -> u32 {
    (m * 10.0).round().max(0.0) as u32
}

/// Sawlog part of the stem; each has its own price column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogPart {
    Butt,
    Middle,
    Top,
}

impl LogPart {
    pub const ALL: [LogPart; 3] = [LogPart::Butt, LogPart::Middle, LogPart::Top];

    pub fn index(self) -> usize {
        match self {
            LogPart::Butt => 0,
            LogPart::Middle => 1,
            LogPart::Top => 2,
        }
    }
}

impl std::fmt::Display for LogPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogPart::Butt => write!(f, "Butt"),
            LogPart::Middle => write!(f, "Middle"),
            LogPart::Top => write!(f, "Top"),
        }
    }
}

/// Prices per cubic metre for one diameter class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimberPriceForDiameter {
    pub butt: f64,
    pub middle: f64,
    pub top: f64,
}

impl TimberPriceForDiameter {
    pub fn new(butt: f64, middle: f64, top: f64) -> Self {
        Self { butt, middle, top }
    }

    pub fn price_for_log_part(&self, part: LogPart) -> f64 {
        match part {
            LogPart::Butt => self.butt,
            LogPart::Middle => self.middle,
            LogPart::Top => self.top,
        }
    }
}

/// How timber prices relate to log volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeType {
    /// Priced per cylinder volume computed from the top diameter.
    #[default]
    M3to,
    /// Priced per solid cubic metre under bark.
    M3fub,
}

impl std::fmt::Display for VolumeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeType::M3to => write!(f, "m3to"),
            VolumeType::M3fub => write!(f, "m3fub"),
        }
    }
}

/// Length-dependent price percentages keyed by diameter class, then by
/// the shortest log length (dm) each percentage applies to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LengthCorrections(pub BTreeMap<u32, BTreeMap<u32, f64>>);

impl LengthCorrections {
    /// Percentage of the base price for a log of `length_dm` in `diameter_class`.
    ///
    /// Uses the nearest bucket at or below the length. Returns 0 when the
    /// class has no table or the log is shorter than every bucket; 0 means
    /// the base price applies unchanged.
    pub fn get_length_correction(&self, diameter_class: u32, length_dm: u32) -> f64 {
        self.0
            .get(&diameter_class)
            .and_then(|lengths| lengths.range(..=length_dm).next_back())
            .map(|(_, pct)| *pct)
            .unwrap_or(0.0)
    }

    /// Apply the correction for a log to `base_price`.
    pub fn corrected_price(&self, base_price: f64, diameter_class: u32, length_dm: u32) -> f64 {
        let pct = self.get_length_correction(diameter_class, length_dm);
        if pct == 0.0 {
            base_price
        } else {
            base_price * pct / 100.0
        }
    }
}

/// Shares of a log's volume redirected to lower assortments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DowngradeProportions {
    pub pulpwood: f64,
    pub fuelwood: f64,
    pub cull: f64,
}

impl DowngradeProportions {
    pub fn new(pulpwood: f64, fuelwood: f64, cull: f64) -> Self {
        Self {
            pulpwood,
            fuelwood,
            cull,
        }
    }

    /// Proportions with cull reduced so the three never exceed 1.
    pub fn normalized(&self) -> Self {
        let mut p = *self;
        if p.pulpwood + p.fuelwood + p.cull > 1.0 {
            p.cull = (1.0 - p.pulpwood - p.fuelwood).max(0.0);
        }
        p
    }

    /// Share of the volume kept in the original assortment.
    pub fn retained(&self) -> f64 {
        1.0 - self.pulpwood - self.fuelwood - self.cull
    }

    fn validate(&self, owner: &str) -> Result<(), ForestError> {
        for (name, v) in [
            ("pulpwood", self.pulpwood),
            ("fuelwood", self.fuelwood),
            ("cull", self.cull),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ForestError::ValidationError(format!(
                    "{owner}: {name} proportion must be in 0..=1, got {v}"
                )));
            }
        }
        Ok(())
    }
}

/// Highest point (m above ground) each sawlog part may reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxHeights {
    pub butt: f64,
    pub middle: f64,
    pub top: f64,
}

impl Default for MaxHeights {
    fn default() -> Self {
        Self {
            butt: 99.9,
            middle: 99.9,
            top: 99.9,
        }
    }
}

impl MaxHeights {
    pub fn for_part(&self, part: LogPart) -> f64 {
        match part {
            LogPart::Butt => self.butt,
            LogPart::Middle => self.middle,
            LogPart::Top => self.top,
        }
    }
}

/// Sawlog prices for one species.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimberPricelist {
    prices: BTreeMap<u32, TimberPriceForDiameter>,
    pub volume_type: VolumeType,
    pub length_corrections: LengthCorrections,
    /// Expected quality shares per log part, kept for reporting.
    pub quality_outcome: BTreeMap<String, Vec<f64>>,
    pub downgrade_proportions: DowngradeProportions,
    pub max_height: MaxHeights,
}

impl TimberPricelist {
    pub fn new(volume_type: VolumeType) -> Self {
        Self {
            volume_type,
            ..Default::default()
        }
    }

    pub fn set_price_for_diameter(&mut self, diameter_class: u32, prices: TimberPriceForDiameter) {
        self.prices.insert(diameter_class, prices);
    }

    pub fn price_for_diameter(&self, diameter_class: u32) -> Option<&TimberPriceForDiameter> {
        self.prices.get(&diameter_class)
    }

    /// Diameter classes in ascending order.
    pub fn diameter_classes(&self) -> impl Iterator<Item = u32> + '_ {
        self.prices.keys().copied()
    }

    pub fn min_diameter(&self) -> u32 {
        self.prices.keys().next().copied().unwrap_or(0)
    }

    pub fn max_diameter(&self) -> u32 {
        self.prices.keys().next_back().copied().unwrap_or(0)
    }

    /// Nearest class at or below `diameter_cm`; clamps to the largest class.
    /// `None` below the smallest class.
    pub fn diameter_class(&self, diameter_cm: f64) -> Option<u32> {
        if !(diameter_cm >= 0.0) {
            return None;
        }
        let floor = diameter_cm.floor().min(u32::MAX as f64) as u32;
        self.prices.range(..=floor).next_back().map(|(d, _)| *d)
    }

    /// Price per cubic metre for a log part with the given top diameter.
    pub fn price_for_log_part(&self, part: LogPart, diameter_cm: f64) -> f64 {
        self.diameter_class(diameter_cm)
            .and_then(|d| self.prices.get(&d))
            .map(|p| p.price_for_log_part(part))
            .unwrap_or(0.0)
    }

    pub fn get_length_correction(&self, diameter_cm: f64, length_dm: u32) -> f64 {
        self.diameter_class(diameter_cm)
            .map(|d| self.length_corrections.get_length_correction(d, length_dm))
            .unwrap_or(0.0)
    }

    fn validate(&self, species: &Species) -> Result<(), ForestError> {
        if self.prices.is_empty() {
            return Err(ForestError::ValidationError(format!(
                "{species}: timber price list has no diameter classes"
            )));
        }
        self.downgrade_proportions.validate(species.name())
    }
}

/// Flat pulpwood prices per species or genus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PulpPricelist {
    prices: HashMap<Species, f64>,
}

impl PulpPricelist {
    pub fn new(prices: impl IntoIterator<Item = (Species, f64)>) -> Self {
        Self {
            prices: prices.into_iter().collect(),
        }
    }

    pub fn contains(&self, species: &Species) -> bool {
        self.prices.contains_key(species)
    }

    /// Price for the exact species, then its genus, then the default.
    pub fn pulpwood_price(&self, species: &Species) -> f64 {
        self.prices
            .get(species)
            .or_else(|| self.prices.get(&Species::new(species.genus())))
            .copied()
            .unwrap_or(DEFAULT_PULPWOOD_PRICE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Species, &f64)> {
        self.prices.iter()
    }
}

/// Complete price list: sawlog tables per species plus common settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricelist {
    pub timber: BTreeMap<Species, TimberPricelist>,
    pub pulp: PulpPricelist,
    /// Smallest top diameter (cm) of any merchantable log
    pub top_diameter: f64,
    pub pulp_log_diameter: DiameterRange,
    pub timber_log_length: LengthRange,
    pub pulp_log_length: LengthRange,
    /// Harvest residue price per m³
    pub log_cull_price: f64,
    pub fuelwood_price: f64,
    pub stump_price: f64,
    /// Metres above ground; 0 disables high stumps
    pub high_stump_height: f64,
    pub pulpwood_cull_proportion: f64,
    pub pulpwood_fuelwood_proportion: f64,
}

impl Default for Pricelist {
    fn default() -> Self {
        Self {
            timber: BTreeMap::new(),
            pulp: PulpPricelist::default(),
            top_diameter: 5.0,
            pulp_log_diameter: DiameterRange::new(5.0, 70.0),
            timber_log_length: LengthRange::new(3.1, 5.5),
            pulp_log_length: LengthRange::new(3.0, 5.0),
            log_cull_price: 50.0,
            fuelwood_price: 25.0,
            stump_price: 0.0,
            high_stump_height: 0.0,
            pulpwood_cull_proportion: 0.0,
            pulpwood_fuelwood_proportion: 0.0,
        }
    }
}

impl Pricelist {
    pub fn timber_prices(&self, species: &Species) -> Option<&TimberPricelist> {
        self.timber.get(species)
    }

    pub fn pulpwood_price(&self, species: &Species) -> f64 {
        self.pulp.pulpwood_price(species)
    }

    /// Downgrading applied to pulp logs of any species.
    pub fn pulpwood_downgrade(&self) -> DowngradeProportions {
        DowngradeProportions::new(
            0.0,
            self.pulpwood_fuelwood_proportion,
            self.pulpwood_cull_proportion,
        )
    }

    pub fn validate(&self) -> Result<(), ForestError> {
        for (name, range) in [
            ("SawlogLengthRange", self.timber_log_length),
            ("PulpwoodLengthRange", self.pulp_log_length),
        ] {
            if !(range.min > 0.0) || range.min > range.max {
                return Err(ForestError::ValidationError(format!(
                    "{name}: invalid range {}..{} m",
                    range.min, range.max
                )));
            }
        }
        if self.pulp_log_diameter.min > self.pulp_log_diameter.max {
            return Err(ForestError::ValidationError(format!(
                "PulpLogDiameterRange: invalid range {}..{} cm",
                self.pulp_log_diameter.min, self.pulp_log_diameter.max
            )));
        }
        self.pulpwood_downgrade().validate("Common")?;
        for (species, prices) in &self.timber {
            prices.validate(species)?;
        }
        Ok(())
    }
}

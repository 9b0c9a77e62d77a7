//! Näslund (1947) form factor functions for Swedish pine, spruce and birch,
//! and the Pettersson (1949) form quotient used by the Edgren–Nylinder taper.

use crate::error::ForestError;
use crate::models::{check_min, Estimate, Region, Species, Timber};

const MODEL: &str = "Näslund 1947";

/// Smallest DBH (cm) covered by the Näslund material.
pub const MIN_DIAMETER_CM: f64 = 5.0;

/// Species groups with published Swedish form factor and taper functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwedishSpeciesGroup {
    Pine,
    Spruce,
    Birch,
}

impl SwedishSpeciesGroup {
    pub fn from_species(species: &Species) -> Option<Self> {
        match species.name() {
            "pinus sylvestris" => Some(Self::Pine),
            "picea abies" => Some(Self::Spruce),
            _ if species.genus() == "betula" => Some(Self::Birch),
            _ => None,
        }
    }
}

/// Stem form factor (volume / (basal area * height)), dimensionless.
///
/// Uses the crown and bark variants when `crown_base_height_m` and
/// `double_bark_mm` are present and positive.
pub fn form_factor(timber: &Timber) -> Result<Estimate, ForestError> {
    let group = SwedishSpeciesGroup::from_species(&timber.species).ok_or_else(|| {
        ForestError::ValidationError(format!(
            "{MODEL}: no form factor function for '{}'",
            timber.species
        ))
    })?;

    let h = timber.height_m;
    let d = timber.diameter_cm;
    // Crown ratio and relative bark thickness, both in percent.
    let k = timber
        .crown_base_height_m
        .filter(|cb| *cb > 0.0)
        .map(|cb| (h - cb) / h * 100.0);
    let b = timber
        .double_bark_mm
        .filter(|bark| *bark > 0.0)
        .map(|bark| (bark / 10.0) / d * 100.0);
    let ob = timber.over_bark;

    let f = match (timber.region, group) {
        (Region::Southern, SwedishSpeciesGroup::Pine) => match (ob, k, b) {
            (true, Some(k), Some(b)) => {
                420.16 + 1519.24 / h + 51.62 * (h / d) - 3.962 * b - 0.9246 * k
            }
            (true, _, _) => 308.97 + 1365.38 / h + 93.14 * (h / d),
            (false, Some(k), Some(b)) => {
                448.53 + 909.21 / h + 44.71 * (h / d) + 1.339 * b - 1.201 * k
            }
            (false, _, _) => 408.49 + 798.46 / h + 72.89 * (h / d),
        },
        (Region::Southern, SwedishSpeciesGroup::Spruce) => match (ob, k) {
            (true, Some(k)) => {
                329.09 + 1348.92 / h + 186.94 * (h / d) - 583.74 * h / (d * d) - 0.7854 * k
            }
            (true, None) => 245.09 + 1405.66 / h + 231.11 * (h / d) - 628.48 * h / (d * d),
            (false, Some(k)) => {
                325.04 + 1322.62 / h + 180.36 * (h / d) - 551.55 * h / (d * d) - 0.7566 * k
            }
            (false, None) => 245.57 + 1369.89 / h + 219.34 * (h / d) - 587.65 * h / (d * d),
        },
        (Region::Southern, SwedishSpeciesGroup::Birch) => match (ob, b) {
            (true, Some(b)) => {
                302.45 + 1221.63 / h + 155.44 * (h / d) - 462.95 * h / (d * d) - 5.864 * b
            }
            (true, None) => 109.01 + 1823.03 / h + 277.56 * (h / d) - 844.17 * h / (d * d),
            (false, Some(b)) => {
                267.44 + 1139.98 / h + 149.04 * (h / d) - 406.04 * h / (d * d) - 0.9224 * b
            }
            (false, None) => 237.03 + 1266.05 / h + 162.72 * (h / d) - 451.26 * h / (d * d),
        },
        (Region::Northern, SwedishSpeciesGroup::Pine) => match (ob, k, b) {
            (true, Some(k), Some(b)) => 489.35 + 1296.11 / h - 3.700 * b - 0.9310 * k,
            (true, _, _) => 390.81 + 1185.86 / h + 35.88 * (h / d),
            (false, Some(k), Some(b)) => 502.22 + 771.5 / h + 2.257 * b - 1.008 * k,
            (false, _, _) => 463.55 + 699.14 / h + 34.36 * (h / d),
        },
        (Region::Northern, SwedishSpeciesGroup::Spruce) => match (ob, k) {
            (true, Some(k)) => {
                290.93 + 1346.06 / h + 226.83 * (h / d) - 595.98 * (h / (d * d)) - 0.7980 * k
            }
            (true, None) => 193.84 + 1467.46 / h + 276.26 * (h / d) - 700.45 * (h / (d * d)),
            (false, Some(k)) => {
                306.60 + 1363.31 / h + 199.71 * (h / d) - 591.81 * (h / (d * d)) - 0.7403 * k
            }
            (false, None) => 221.51 + 1431.21 / h + 244.14 * (h / d) - 652.09 * (h / (d * d)),
        },
        (Region::Northern, SwedishSpeciesGroup::Birch) => match (ob, k, b) {
            (true, Some(k), Some(b)) => {
                414.20 + 533.74 / h + 47.35 * (h / d) - 2.154 * b - 0.4154 * k
            }
            (true, _, _) => 368.17 + 473.0 / h + 63.44 * (h / d),
            (false, Some(k), _) => 404.30 + 423.71 / h + 47.05 * (h / d) - 0.3808 * k,
            (false, None, _) => 384.88 + 344.14 / h + 55.34 * (h / d),
        },
    } / 1000.0;

    let mut estimate = Estimate::exact(f);
    if let Some(w) = check_min(MODEL, "diameter_cm", d, MIN_DIAMETER_CM) {
        estimate = estimate.with_warning(w);
    }
    Ok(estimate)
}

/// Pettersson (1949) form quotient from height, DBH under bark and form factor.
pub fn form_quotient(
    group: SwedishSpeciesGroup,
    region: Region,
    height_m: f64,
    dbh_ub_cm: f64,
    form_factor: f64,
) -> f64 {
    let spruce = group == SwedishSpeciesGroup::Spruce;
    match (region, spruce) {
        (Region::Northern, true) => {
            0.239 + 0.01046 * height_m - 0.004407 * dbh_ub_cm + 0.6532 * form_factor
        }
        (Region::Northern, false) => {
            0.293 + 0.00669 * height_m - 0.001384 * dbh_ub_cm + 0.6348 * form_factor
        }
        (Region::Southern, true) => {
            0.209 + 0.00859 * height_m - 0.003157 * dbh_ub_cm + 0.7385 * form_factor
        }
        (Region::Southern, false) => {
            0.372 + 0.008742 * height_m - 0.003263 * dbh_ub_cm + 0.4929 * form_factor
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::section::{CrossCutSection, QualityType};
use crate::error::ForestError;
use crate::models::Species;

/// Outcome of bucking one tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuckingResult {
    pub species: Species,
    pub total_value: f64,
    /// Share of stem volume above the last cut
    pub top_proportion: f64,
    pub dead_wood_proportion: f64,
    pub high_stump_volume_proportion: f64,
    pub high_stump_value_proportion: f64,
    /// Height of the last cut divided by tree height
    pub last_cut_relative_height: f64,
    /// m³ per `QualityType` index
    pub volume_per_quality: Vec<f64>,
    /// Average undowngraded sawlog price per m³ per `QualityType` index
    pub timber_price_by_quality: Vec<f64>,
    pub top_volume: f64,
    pub high_stump_volume: f64,
    /// Volume under bark from stump to a 5 cm top
    pub vol_fub_5cm: f64,
    /// Volume under bark from stump to tip
    pub vol_sk_ub: f64,
    pub dbh_cm: f64,
    pub height_m: f64,
    pub stump_height_m: f64,
    pub diameter_stump_cm: f64,
    pub taper_diams_cm: Vec<f64>,
    pub taper_heights_m: Vec<f64>,
    pub sections: Option<Vec<CrossCutSection>>,
}

impl BuckingResult {
    /// Keys accepted by `get`: every field, then derived values.
    pub const KEYS: [&'static str; 21] = [
        "species",
        "total_value",
        "top_proportion",
        "dead_wood_proportion",
        "high_stump_volume_proportion",
        "high_stump_value_proportion",
        "last_cut_relative_height",
        "volume_per_quality",
        "timber_price_by_quality",
        "top_volume",
        "high_stump_volume",
        "vol_fub_5cm",
        "vol_sk_ub",
        "dbh_cm",
        "height_m",
        "stump_height_m",
        "diameter_stump_cm",
        "taper_diams_cm",
        "taper_heights_m",
        "sections",
        "merchantable_volume",
    ];

    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        Self::KEYS.iter().copied()
    }

    /// Look up a field by name, like a map. Unknown keys return `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        let value = match key {
            "species" => serde_json::to_value(&self.species).ok()?,
            "total_value" => Value::from(self.total_value),
            "top_proportion" => Value::from(self.top_proportion),
            "dead_wood_proportion" => Value::from(self.dead_wood_proportion),
            "high_stump_volume_proportion" => Value::from(self.high_stump_volume_proportion),
            "high_stump_value_proportion" => Value::from(self.high_stump_value_proportion),
            "last_cut_relative_height" => Value::from(self.last_cut_relative_height),
            "volume_per_quality" => Value::from(self.volume_per_quality.clone()),
            "timber_price_by_quality" => Value::from(self.timber_price_by_quality.clone()),
            "top_volume" => Value::from(self.top_volume),
            "high_stump_volume" => Value::from(self.high_stump_volume),
            "vol_fub_5cm" => Value::from(self.vol_fub_5cm),
            "vol_sk_ub" => Value::from(self.vol_sk_ub),
            "dbh_cm" => Value::from(self.dbh_cm),
            "height_m" => Value::from(self.height_m),
            "stump_height_m" => Value::from(self.stump_height_m),
            "diameter_stump_cm" => Value::from(self.diameter_stump_cm),
            "taper_diams_cm" => Value::from(self.taper_diams_cm.clone()),
            "taper_heights_m" => Value::from(self.taper_heights_m.clone()),
            "sections" => serde_json::to_value(&self.sections).ok()?,
            "merchantable_volume" => Value::from(self.merchantable_volume()),
            _ => return None,
        };
        Some(value)
    }

    /// Numeric field by name, e.g. `"total_value"`.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    pub fn volume_of(&self, quality: QualityType) -> f64 {
        self.volume_per_quality
            .get(quality.index())
            .copied()
            .unwrap_or(0.0)
    }

    /// Volume assigned to any assortment (everything except top and high stump).
    pub fn merchantable_volume(&self) -> f64 {
        self.volume_per_quality.iter().sum()
    }

    pub fn sections(&self) -> &[CrossCutSection] {
        self.sections.as_deref().unwrap_or(&[])
    }

    /// Sections as a JSON array, `"[]"` when none were saved.
    pub fn sections_json(&self) -> Result<String, ForestError> {
        Ok(serde_json::to_string(self.sections())?)
    }
}

use serde::{Deserialize, Serialize};

use super::Species;
use crate::error::ForestError;

/// Stump height as a share of total tree height when none is given.
pub const DEFAULT_STUMP_HEIGHT_RATIO: f64 = 0.01;

/// Geographic region used by the Swedish regression models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Northern,
    #[default]
    Southern,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Northern => write!(f, "northern"),
            Region::Southern => write!(f, "southern"),
        }
    }
}

impl std::str::FromStr for Region {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "northern" | "north" | "n" => Ok(Region::Northern),
            "southern" | "south" | "s" => Ok(Region::Southern),
            _ => Err(ForestError::ParseError(format!("Unknown region: '{s}'"))),
        }
    }
}

/// One standing tree to be bucked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timber {
    pub species: Species,
    /// Diameter at breast height (1.3 m) in centimetres
    pub diameter_cm: f64,
    /// Total height in metres
    pub height_m: f64,
    /// Felling height above ground in metres
    pub stump_height_m: f64,
    /// Double bark thickness at breast height in millimetres
    pub double_bark_mm: Option<f64>,
    /// Height to the lowest live branch in metres
    pub crown_base_height_m: Option<f64>,
    /// Whether `diameter_cm` was measured over bark
    pub over_bark: bool,
    pub region: Region,
}

impl Timber {
    /// Create a validated tree with the default stump height (1 % of height).
    pub fn new(
        species: impl Into<Species>,
        diameter_cm: f64,
        height_m: f64,
    ) -> Result<Self, ForestError> {
        let timber = Self {
            species: species.into(),
            diameter_cm,
            height_m,
            stump_height_m: DEFAULT_STUMP_HEIGHT_RATIO * height_m,
            double_bark_mm: None,
            crown_base_height_m: None,
            over_bark: true,
            region: Region::default(),
        };
        timber.validate()?;
        Ok(timber)
    }

    pub fn with_stump_height(mut self, stump_height_m: f64) -> Self {
        self.stump_height_m = stump_height_m;
        self
    }

    pub fn with_double_bark(mut self, double_bark_mm: f64) -> Self {
        self.double_bark_mm = Some(double_bark_mm);
        self
    }

    pub fn with_crown_base_height(mut self, crown_base_height_m: f64) -> Self {
        self.crown_base_height_m = Some(crown_base_height_m);
        self
    }

    pub fn with_over_bark(mut self, over_bark: bool) -> Self {
        self.over_bark = over_bark;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Validate the measurements. Returns `ForestError::ValidationError` on failure.
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.species.name().is_empty() {
            return Err(ForestError::ValidationError(
                "species must be a non-empty name".to_string(),
            ));
        }
        if !(self.diameter_cm > 0.0) {
            return Err(ForestError::ValidationError(format!(
                "{}: diameter_cm must be positive, got {}",
                self.species, self.diameter_cm
            )));
        }
        if !(self.height_m > 0.0) {
            return Err(ForestError::ValidationError(format!(
                "{}: height_m must be positive, got {}",
                self.species, self.height_m
            )));
        }
        if !(self.stump_height_m >= 0.0) || self.stump_height_m >= self.height_m {
            return Err(ForestError::ValidationError(format!(
                "{}: stump_height_m must be in 0.0..height_m ({}), got {}",
                self.species, self.height_m, self.stump_height_m
            )));
        }
        if let Some(cb) = self.crown_base_height_m {
            if !(0.0..=self.height_m).contains(&cb) {
                return Err(ForestError::ValidationError(format!(
                    "{}: crown_base_height_m must be in 0.0..={}, got {}",
                    self.species, self.height_m, cb
                )));
            }
        }
        if let Some(bark) = self.double_bark_mm {
            if bark < 0.0 {
                return Err(ForestError::ValidationError(format!(
                    "{}: double_bark_mm cannot be negative, got {}",
                    self.species, bark
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pine(diameter_cm: f64, height_m: f64) -> Timber {
        Timber::new("pinus sylvestris", diameter_cm, height_m).unwrap()
    }

    // --- Region tests ---

    #[test]
    fn test_region_parse() {
        assert_eq!("northern".parse::<Region>().unwrap(), Region::Northern);
        assert_eq!("S".parse::<Region>().unwrap(), Region::Southern);
        assert!("east".parse::<Region>().is_err());
    }

    #[test]
    fn test_region_display_roundtrip() {
        for region in [Region::Northern, Region::Southern] {
            assert_eq!(region.to_string().parse::<Region>().unwrap(), region);
        }
    }

    // --- Construction tests ---

    #[test]
    fn test_default_stump_height() {
        let t = pine(25.0, 20.0);
        assert!((t.stump_height_m - 0.2).abs() < 1e-12);
        assert!(t.over_bark);
        assert_eq!(t.region, Region::Southern);
    }

    #[test]
    fn test_builder_fields() {
        let t = pine(25.0, 20.0)
            .with_stump_height(0.0)
            .with_double_bark(12.0)
            .with_crown_base_height(9.0)
            .with_region(Region::Northern);
        assert_eq!(t.stump_height_m, 0.0);
        assert_eq!(t.double_bark_mm, Some(12.0));
        assert_eq!(t.crown_base_height_m, Some(9.0));
        assert_eq!(t.region, Region::Northern);
        assert!(t.validate().is_ok());
    }

    // --- Validation tests ---

    #[test]
    fn test_zero_diameter_rejected() {
        let err = Timber::new("pinus sylvestris", 0.0, 20.0).unwrap_err();
        assert!(err.to_string().contains("diameter_cm must be positive"));
    }

    #[test]
    fn test_nan_diameter_rejected() {
        assert!(Timber::new("pinus sylvestris", f64::NAN, 20.0).is_err());
    }

    #[test]
    fn test_negative_height_rejected() {
        let err = Timber::new("pinus sylvestris", 20.0, -1.0).unwrap_err();
        assert!(err.to_string().contains("height_m must be positive"));
    }

    #[test]
    fn test_stump_above_height_rejected() {
        let t = pine(20.0, 10.0).with_stump_height(10.0);
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("stump_height_m"));
    }

    #[test]
    fn test_crown_base_above_height_rejected() {
        let t = pine(20.0, 10.0).with_crown_base_height(10.5);
        assert!(t.validate().is_err());
        let t = pine(20.0, 10.0).with_crown_base_height(10.0);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_negative_bark_rejected() {
        let t = pine(20.0, 10.0).with_double_bark(-1.0);
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_empty_species_rejected() {
        assert!(Timber::new("   ", 20.0, 10.0).is_err());
    }

    #[test]
    fn test_timber_json_roundtrip() {
        let t = pine(22.0, 18.0).with_region(Region::Northern);
        let json = serde_json::to_string(&t).unwrap();
        let back: Timber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}

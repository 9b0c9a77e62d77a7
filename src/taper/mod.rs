//! Stem taper curves: diameter as a function of height above ground.

mod edgren_nylinder;
pub mod integrate;
pub mod naslund;
mod schmidt;

pub use edgren_nylinder::EdgrenNylinder1949;
pub use schmidt::Schmidt2001;

use serde::{Deserialize, Serialize};

use crate::error::ForestError;
use crate::models::{OutOfRangeWarning, Timber};

const BISECTION_STEPS: usize = 50;

/// A fitted taper curve for one tree. Heights are metres above ground,
/// diameters centimetres.
pub trait TaperModel {
    fn total_height(&self) -> f64;

    /// Stem diameter at `height_m`; 0 outside the stem.
    fn diameter_at_height(&self, height_m: f64) -> f64;

    /// Largest height at which the stem is at least `diameter_cm` thick.
    ///
    /// Returns 0 when the stem is thinner than `diameter_cm` already at the
    /// ground, and the total height when it never gets that thin.
    fn height_at_diameter(&self, diameter_cm: f64) -> f64 {
        let total = self.total_height();
        if !(diameter_cm > 0.0) || self.diameter_at_height(0.0) < diameter_cm {
            return 0.0;
        }
        if self.diameter_at_height(total) >= diameter_cm {
            return total;
        }
        let (mut lo, mut hi) = (0.0, total);
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if self.diameter_at_height(mid) >= diameter_cm {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Solid volume in m³ between two heights, clamped to the stem.
    fn volume_section(&self, from_m: f64, to_m: f64) -> f64 {
        let total = self.total_height();
        let a = from_m.clamp(0.0, total);
        let b = to_m.clamp(0.0, total);
        integrate::adaptive_simpson(
            |h| {
                let r = self.diameter_at_height(h) / 200.0;
                std::f64::consts::PI * r * r
            },
            a,
            b,
            integrate::VOLUME_TOLERANCE,
        )
    }
}

/// Taper families available for bucking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaperKind {
    #[default]
    #[serde(rename = "edgren-nylinder-1949")]
    EdgrenNylinder1949,
    #[serde(rename = "schmidt-2001")]
    Schmidt2001,
}

impl std::fmt::Display for TaperKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaperKind::EdgrenNylinder1949 => write!(f, "edgren-nylinder-1949"),
            TaperKind::Schmidt2001 => write!(f, "schmidt-2001"),
        }
    }
}

impl std::str::FromStr for TaperKind {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "edgren-nylinder-1949" | "edgren" | "edgren-nylinder" => {
                Ok(TaperKind::EdgrenNylinder1949)
            }
            "schmidt-2001" | "schmidt" => Ok(TaperKind::Schmidt2001),
            _ => Err(ForestError::ParseError(format!(
                "Unknown taper model: '{s}'. Expected edgren-nylinder-1949 or schmidt-2001"
            ))),
        }
    }
}

/// A fitted taper of any supported family.
#[derive(Debug, Clone)]
pub enum Taper {
    EdgrenNylinder1949(EdgrenNylinder1949),
    Schmidt2001(Schmidt2001),
}

impl Taper {
    /// Fit the chosen family to `timber`, logging any out-of-range inputs.
    pub fn new(kind: TaperKind, timber: &Timber) -> Result<Self, ForestError> {
        let taper = match kind {
            TaperKind::EdgrenNylinder1949 => {
                Taper::EdgrenNylinder1949(EdgrenNylinder1949::new(timber)?)
            }
            TaperKind::Schmidt2001 => Taper::Schmidt2001(Schmidt2001::new(timber)?),
        };
        for w in taper.warnings() {
            tracing::warn!(species = %timber.species, "{w}");
        }
        Ok(taper)
    }

    pub fn kind(&self) -> TaperKind {
        match self {
            Taper::EdgrenNylinder1949(_) => TaperKind::EdgrenNylinder1949,
            Taper::Schmidt2001(_) => TaperKind::Schmidt2001,
        }
    }

    pub fn warnings(&self) -> &[OutOfRangeWarning] {
        match self {
            Taper::EdgrenNylinder1949(t) => t.warnings(),
            Taper::Schmidt2001(t) => t.warnings(),
        }
    }
}

impl TaperModel for Taper {
    fn total_height(&self) -> f64 {
        match self {
            Taper::EdgrenNylinder1949(t) => t.total_height(),
            Taper::Schmidt2001(t) => t.total_height(),
        }
    }

    fn diameter_at_height(&self, height_m: f64) -> f64 {
        match self {
            Taper::EdgrenNylinder1949(t) => t.diameter_at_height(height_m),
            Taper::Schmidt2001(t) => t.diameter_at_height(height_m),
        }
    }
}

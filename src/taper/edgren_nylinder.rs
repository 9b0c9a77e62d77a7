//! Edgren & Nylinder (1949) taper curves for Swedish conifers.
//!
//! The relative diameter (percent of the diameter at ground) is a piecewise
//! logarithmic function of relative height with an inflexion point that
//! depends on the Pettersson form quotient. Birch and other species use the
//! pine constants.

use super::naslund::{self, SwedishSpeciesGroup};
use super::TaperModel;
use crate::error::ForestError;
use crate::models::{OutOfRangeWarning, Region, Timber};

/// One row of the published constants: form quotient, beta, gamma, q, Q, R.
/// `beta` and `big_q` are missing for the lowest form quotient class, where
/// the middle segment is a straight line.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ConstantsRow {
    form_quotient: f64,
    beta: Option<f64>,
    gamma: f64,
    q: f64,
    big_q: Option<f64>,
    r: f64,
}

const fn row(fq: f64, beta: Option<f64>, gamma: f64, q: f64, big_q: Option<f64>, r: f64) -> ConstantsRow {
    ConstantsRow {
        form_quotient: fq,
        beta,
        gamma,
        q,
        big_q,
        r,
    }
}

const SPRUCE_NORTH: [ConstantsRow; 7] = [
    row(0.50, None, 1.671, 16.104, None, 103.06),
    row(0.55, Some(0.62), 1.422, 14.883, Some(286.36), 140.91),
    row(0.60, Some(1.594), 1.976, 13.784, Some(151.04), 127.89),
    row(0.65, Some(3.240), 2.906, 12.906, Some(102.7), 110.68),
    row(0.70, Some(6.320), 3.759, 12.099, Some(76.543), 105.15),
    row(0.75, Some(13.056), 4.026, 11.321, Some(59.096), 112.59),
    row(0.80, Some(32.012), 3.595, 10.540, Some(45.754), 134.76),
];

const SPRUCE_SOUTH: [ConstantsRow; 7] = [
    row(0.50, None, 0.892, 15.765, None, 176.40),
    row(0.55, Some(0.620), 0.923, 14.818, Some(287.44), 202.65),
    row(0.60, Some(1.594), 1.093, 14.032, Some(148.97), 202.51),
    row(0.65, Some(3.240), 2.164, 13.479, Some(99.532), 132.69),
    row(0.70, Some(6.320), 3.324, 13.040, Some(72.736), 108.43),
    row(0.75, Some(13.059), 4.463, 12.775, Some(54.618), 97.49),
    row(0.80, Some(33.208), 5.586, 12.578, Some(40.509), 91.77),
];

const PINE_NORTH: [ConstantsRow; 7] = [
    row(0.50, None, 1.513, 14.233, None, 123.91),
    row(0.55, Some(0.620), 1.228, 13.321, Some(311.68), 172.85),
    row(0.60, Some(1.594), 1.506, 12.657, Some(160.29), 167.68),
    row(0.65, Some(3.240), 2.493, 12.177, Some(106.67), 128.16),
    row(0.70, Some(6.320), 4.488, 11.880, Some(77.416), 94.947),
    row(0.75, Some(13.056), 6.602, 11.759, Some(57.767), 81.725),
    row(0.80, Some(32.307), 7.594, 11.753, Some(42.808), 80.776),
];

const PINE_SOUTH: [ConstantsRow; 7] = [
    row(0.50, None, 0.8409, 15.970, None, 183.44),
    row(0.55, Some(0.620), 0.3694, 14.948, Some(285.28), 458.59),
    row(0.60, Some(1.594), 0.4251, 14.214, Some(147.44), 463.07),
    row(0.65, Some(3.240), 1.529, 13.646, Some(98.601), 171.70),
    row(0.70, Some(6.320), 3.974, 13.240, Some(71.915), 95.286),
    row(0.75, Some(13.070), 5.510, 12.951, Some(54.050), 84.904),
    row(0.80, Some(33.502), 6.445, 12.755, Some(39.982), 83.659),
];

/// Relative height above which the top segment of the curve applies.
const UPPER_SEGMENT_START: f64 = 0.6;

fn constants_for(group: SwedishSpeciesGroup, region: Region, form_quotient: f64) -> ConstantsRow {
    let table = match (group, region) {
        (SwedishSpeciesGroup::Spruce, Region::Northern) => &SPRUCE_NORTH,
        (SwedishSpeciesGroup::Spruce, Region::Southern) => &SPRUCE_SOUTH,
        (_, Region::Northern) => &PINE_NORTH,
        (_, Region::Southern) => &PINE_SOUTH,
    };
    // Nearest tabulated form quotient; the table is clamped at both ends.
    let mut best = table[0];
    for r in table.iter().skip(1) {
        if (r.form_quotient - form_quotient).abs() < (best.form_quotient - form_quotient).abs() {
            best = *r;
        }
    }
    best
}

fn inflexion_point(group: SwedishSpeciesGroup, region: Region, form_quotient: f64) -> f64 {
    let rest = (1.0 - form_quotient).max(f64::EPSILON);
    match (region, group) {
        (Region::Northern, SwedishSpeciesGroup::Spruce) => 0.08631 / rest.powf(0.5),
        (Region::Northern, _) => 0.05270 / rest.powf(0.9),
        (Region::Southern, SwedishSpeciesGroup::Spruce) => 0.06731 / rest.powf(0.8),
        (Region::Southern, _) => 0.06873 / rest.powf(0.8),
    }
}

/// Fitted Edgren–Nylinder taper for one tree.
#[derive(Debug, Clone)]
pub struct EdgrenNylinder1949 {
    height_m: f64,
    constants: ConstantsRow,
    inflexion_point: f64,
    form_quotient: f64,
    base_diameter_cm: f64,
    warnings: Vec<OutOfRangeWarning>,
}

impl EdgrenNylinder1949 {
    pub fn new(timber: &Timber) -> Result<Self, ForestError> {
        timber.validate()?;
        let group = SwedishSpeciesGroup::from_species(&timber.species).ok_or_else(|| {
            ForestError::ValidationError(format!(
                "Edgren-Nylinder 1949: unsupported species '{}'",
                timber.species
            ))
        })?;

        let mut warnings = Vec::new();
        let form_factor = naslund::form_factor(timber)?.take(&mut warnings);
        let form_quotient = naslund::form_quotient(
            group,
            timber.region,
            timber.height_m,
            timber.diameter_cm,
            form_factor,
        );

        let mut taper = Self {
            height_m: timber.height_m,
            constants: constants_for(group, timber.region, form_quotient),
            inflexion_point: inflexion_point(group, timber.region, form_quotient),
            form_quotient,
            base_diameter_cm: 0.0,
            warnings,
        };

        let dbh_relative = taper.relative_diameter(1.3 / timber.height_m);
        if !(dbh_relative > 0.0) {
            return Err(ForestError::ValidationError(format!(
                "Edgren-Nylinder 1949: invalid relative diameter at breast height ({dbh_relative}) \
                 for height {} m",
                timber.height_m
            )));
        }
        taper.base_diameter_cm = 100.0 * timber.diameter_cm / dbh_relative;
        Ok(taper)
    }

    /// Diameter at relative height, in percent of the diameter at ground.
    pub fn relative_diameter(&self, rel_height: f64) -> f64 {
        let c = &self.constants;
        let ip = self.inflexion_point;
        let lower = |x: f64| 100.0 - c.q * (1.0 + 10_000.0 * x).log10();
        let upper = |x: f64| c.r * (1.0 + (1.0 - x) * c.gamma).log10();

        if !(0.0..1.0).contains(&rel_height) {
            0.0
        } else if rel_height <= ip {
            lower(rel_height)
        } else if rel_height <= UPPER_SEGMENT_START {
            match (c.big_q, c.beta) {
                (Some(big_q), Some(beta)) => big_q * (1.0 + (1.0 - rel_height) * beta).log10(),
                _ => {
                    let d_ip = lower(ip);
                    let d_60 = upper(UPPER_SEGMENT_START);
                    let slope = (d_60 - d_ip) / (UPPER_SEGMENT_START - ip);
                    d_ip + slope * (rel_height - ip)
                }
            }
        } else {
            upper(rel_height)
        }
    }

    pub fn form_quotient(&self) -> f64 {
        self.form_quotient
    }

    pub fn base_diameter_cm(&self) -> f64 {
        self.base_diameter_cm
    }

    pub fn warnings(&self) -> &[OutOfRangeWarning] {
        &self.warnings
    }
}

impl TaperModel for EdgrenNylinder1949 {
    fn total_height(&self) -> f64 {
        self.height_m
    }

    fn diameter_at_height(&self, height_m: f64) -> f64 {
        if !(height_m >= 0.0) || height_m >= self.height_m {
            return 0.0;
        }
        let rel = self.relative_diameter(height_m / self.height_m);
        if rel <= 0.0 {
            return 0.0;
        }
        self.base_diameter_cm * rel / 100.0
    }
}

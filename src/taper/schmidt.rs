//! Schmidt (2001) taper curves for German species.
//!
//! Conifers use the Pain & Boyer model, broadleaves the Brink & von Gadow
//! model. Both return the stem radius; diameters are twice that.

use super::TaperModel;
use crate::error::ForestError;
use crate::models::{check_min, OutOfRangeWarning, Timber};

const MODEL: &str = "Schmidt 2001";
const BREAST_HEIGHT: f64 = 1.3;
/// Relative height floor for `ln(x)` in the Pain model.
const MIN_RELATIVE_HEIGHT: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PainParameters {
    a0: f64,
    a1: f64,
    a2: f64,
    b0: f64,
    b1: f64,
    b2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BrinkParameters {
    k: f64,
    p: f64,
    q: f64,
}

fn pain_parameters(species: &str) -> Option<PainParameters> {
    let p = |a0, a1, a2, b0, b1, b2| PainParameters { a0, a1, a2, b0, b1, b2 };
    match species {
        "picea abies" => Some(p(-0.223, 1.595, -3.155, 0.512, -0.158, -0.502)),
        "pseudotsuga menziesii" => Some(p(-0.5828, 1.4423, -2.1807, 0.4369, -0.2008, -0.2836)),
        "pinus sylvestris" => Some(p(-1.7258, 1.3311, -0.7016, 0.0, -0.2142, 0.1306)),
        _ => None,
    }
}

fn brink_parameters(species: &str) -> Option<BrinkParameters> {
    match species {
        "fagus sylvatica" => Some(BrinkParameters {
            k: 0.6946140,
            p: 0.0862735,
            q: 0.1359840,
        }),
        "quercus robur" | "quercus petraea" => Some(BrinkParameters {
            k: 0.5698770,
            p: 0.0450652,
            q: 0.2452940,
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Curve {
    Pain { alpha: f64, beta: f64 },
    Brink { u: f64, v: f64, w: f64, p: f64, q: f64 },
}

/// Fitted Schmidt taper for one tree.
#[derive(Debug, Clone)]
pub struct Schmidt2001 {
    height_m: f64,
    dbh_cm: f64,
    curve: Curve,
    warnings: Vec<OutOfRangeWarning>,
}

impl Schmidt2001 {
    pub fn new(timber: &Timber) -> Result<Self, ForestError> {
        timber.validate()?;
        let name = timber.species.name();
        let d = timber.diameter_cm;
        let h = timber.height_m;

        let curve = if let Some(c) = pain_parameters(name) {
            let ln_h = h.ln();
            // ln(1) = 0; treat a one metre tree as having no height term.
            let d_ln_h = if ln_h.abs() < f64::EPSILON { 0.0 } else { d / ln_h };
            let d_h2 = (d / h).powi(2);
            Curve::Pain {
                alpha: c.a0 + c.a1 * d_ln_h + c.a2 * d_h2,
                beta: c.b0 + c.b1 * d_ln_h + c.b2 * d_h2,
            }
        } else if let Some(c) = brink_parameters(name) {
            if !(h > BREAST_HEIGHT) {
                return Err(ForestError::ValidationError(format!(
                    "{MODEL}: tree height must exceed {BREAST_HEIGHT} m, got {h}"
                )));
            }
            let r13 = d / 2.0;
            let i = c.k * r13;
            let den_q = 1.0 - (c.q * (BREAST_HEIGHT - h)).exp();
            let den_p = 1.0 - (c.p * (BREAST_HEIGHT - h)).exp();
            Curve::Brink {
                u: i / den_q + (r13 - i) * (1.0 - 1.0 / den_p),
                v: (r13 - i) * (BREAST_HEIGHT * c.p).exp() / den_p,
                w: i * (-c.q * h).exp() / den_q,
                p: c.p,
                q: c.q,
            }
        } else {
            return Err(ForestError::ValidationError(format!(
                "{MODEL}: unsupported species '{}'",
                timber.species
            )));
        };

        let warnings = check_min(MODEL, "height_m", h, BREAST_HEIGHT)
            .into_iter()
            .collect();

        Ok(Self {
            height_m: h,
            dbh_cm: d,
            curve,
            warnings,
        })
    }

    pub fn dbh_cm(&self) -> f64 {
        self.dbh_cm
    }

    pub fn warnings(&self) -> &[OutOfRangeWarning] {
        &self.warnings
    }

    fn radius_at_height(&self, height_m: f64) -> f64 {
        match self.curve {
            Curve::Pain { alpha, beta } => {
                let x = (height_m / self.height_m).clamp(MIN_RELATIVE_HEIGHT, 1.0);
                alpha * (1.0 - x.powi(3)) + beta * x.ln()
            }
            Curve::Brink { u, v, w, p, q } => {
                u + v * (-p * height_m).exp() - w * (q * height_m).exp()
            }
        }
    }
}

impl TaperModel for Schmidt2001 {
    fn total_height(&self) -> f64 {
        self.height_m
    }

    fn diameter_at_height(&self, height_m: f64) -> f64 {
        if !(height_m >= 0.0) || height_m > self.height_m {
            return 0.0;
        }
        (2.0 * self.radius_at_height(height_m)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taper(species: &str, d: f64, h: f64) -> Schmidt2001 {
        Schmidt2001::new(&Timber::new(species, d, h).unwrap()).unwrap()
    }

    #[test]
    fn test_brink_reproduces_dbh() {
        let t = taper("fagus sylvatica", 35.0, 28.0);
        assert!((t.diameter_at_height(1.3) - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_brink_zero_at_top() {
        let t = taper("quercus robur", 40.0, 24.0);
        assert!(t.diameter_at_height(24.0).abs() < 1e-9);
    }

    #[test]
    fn test_pain_positive_along_stem() {
        let t = taper("picea abies", 30.0, 26.0);
        let d_low = t.diameter_at_height(1.3);
        let d_mid = t.diameter_at_height(13.0);
        assert!((d_low - 30.0).abs() < 3.0, "dbh {d_low}");
        assert!(d_low > d_mid);
        assert!(d_mid > 0.0);
        assert!(t.diameter_at_height(26.0).abs() < 1e-9);
        assert_eq!(t.diameter_at_height(30.0), 0.0);
    }

    #[test]
    fn test_height_at_diameter_inverts() {
        let t = taper("fagus sylvatica", 35.0, 28.0);
        let h = t.height_at_diameter(20.0);
        assert!((t.diameter_at_height(h) - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_one_metre_pain_tree_is_finite() {
        let t = taper("pinus sylvestris", 2.0, 1.0);
        assert!(t.diameter_at_height(0.5).is_finite());
        assert!(!t.warnings().is_empty());
    }

    #[test]
    fn test_unsupported_species() {
        let t = Timber::new("betula pendula", 20.0, 18.0).unwrap();
        assert!(Schmidt2001::new(&t).is_err());
    }
}

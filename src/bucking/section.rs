use serde::{Deserialize, Serialize};

use crate::models::Species;
use crate::pricelist::LogPart;

/// Assortment of a log section. The discriminant indexes the per-quality
/// vectors in `BuckingResult`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityType {
    #[default]
    Undefined = 0,
    ButtLog = 1,
    MiddleLog = 2,
    TopLog = 3,
    Pulp = 4,
    LogCull = 5,
    Fuelwood = 6,
}

impl QualityType {
    pub const COUNT: usize = 7;

    pub const ALL: [QualityType; Self::COUNT] = [
        QualityType::Undefined,
        QualityType::ButtLog,
        QualityType::MiddleLog,
        QualityType::TopLog,
        QualityType::Pulp,
        QualityType::LogCull,
        QualityType::Fuelwood,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_log_part(part: LogPart) -> Self {
        match part {
            LogPart::Butt => QualityType::ButtLog,
            LogPart::Middle => QualityType::MiddleLog,
            LogPart::Top => QualityType::TopLog,
        }
    }

    pub fn log_part(self) -> Option<LogPart> {
        match self {
            QualityType::ButtLog => Some(LogPart::Butt),
            QualityType::MiddleLog => Some(LogPart::Middle),
            QualityType::TopLog => Some(LogPart::Top),
            _ => None,
        }
    }

    pub fn is_timber(self) -> bool {
        self.log_part().is_some()
    }
}

impl std::fmt::Display for QualityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QualityType::Undefined => "Undefined",
            QualityType::ButtLog => "Butt log",
            QualityType::MiddleLog => "Middle log",
            QualityType::TopLog => "Top log",
            QualityType::Pulp => "Pulp",
            QualityType::LogCull => "Log cull",
            QualityType::Fuelwood => "Fuelwood",
        };
        write!(f, "{name}")
    }
}

/// One log in a cutting plan. Points are decimetres above the stump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCutSection {
    pub start_point: u32,
    pub end_point: u32,
    /// Solid volume under bark, m³
    pub volume: f64,
    pub top_diameter: f64,
    pub value: f64,
    pub species: Species,
    pub timber_proportion: f64,
    pub pulp_proportion: f64,
    pub cull_proportion: f64,
    pub fuelwood_proportion: f64,
    pub quality: QualityType,
}

impl CrossCutSection {
    pub fn length_dm(&self) -> u32 {
        self.end_point.saturating_sub(self.start_point)
    }

    /// Whether `other` continues this section as the same log assortment.
    pub fn can_merge(&self, other: &CrossCutSection) -> bool {
        self.quality == other.quality
            && self.species == other.species
            && (self.end_point == other.start_point || other.end_point == self.start_point)
    }

    /// Combine two adjacent sections: volume and value add up, the range
    /// spans both, proportions are volume-weighted and the top diameter is
    /// taken from the upper section.
    pub fn merge(&self, other: &CrossCutSection) -> CrossCutSection {
        let volume = self.volume + other.volume;
        let weighted = |a: f64, b: f64| {
            if volume > 0.0 {
                (a * self.volume + b * other.volume) / volume
            } else {
                0.5 * (a + b)
            }
        };
        let upper = if other.end_point > self.end_point {
            other
        } else {
            self
        };
        CrossCutSection {
            start_point: self.start_point.min(other.start_point),
            end_point: self.end_point.max(other.end_point),
            volume,
            top_diameter: upper.top_diameter,
            value: self.value + other.value,
            species: self.species.clone(),
            timber_proportion: weighted(self.timber_proportion, other.timber_proportion),
            pulp_proportion: weighted(self.pulp_proportion, other.pulp_proportion),
            cull_proportion: weighted(self.cull_proportion, other.cull_proportion),
            fuelwood_proportion: weighted(self.fuelwood_proportion, other.fuelwood_proportion),
            quality: self.quality,
        }
    }
}

/// Merge runs of adjacent same-quality sections, keeping stump-to-top order.
pub fn merge_sections(sections: Vec<CrossCutSection>) -> Vec<CrossCutSection> {
    let mut merged: Vec<CrossCutSection> = Vec::with_capacity(sections.len());
    for section in sections {
        match merged.last_mut() {
            Some(last) if last.can_merge(&section) => *last = last.merge(&section),
            _ => merged.push(section),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(start: u32, end: u32, volume: f64, value: f64, quality: QualityType) -> CrossCutSection {
        CrossCutSection {
            start_point: start,
            end_point: end,
            volume,
            top_diameter: 30.0 - end as f64 / 10.0,
            value,
            species: Species::new("pinus sylvestris"),
            timber_proportion: 1.0,
            pulp_proportion: 0.0,
            cull_proportion: 0.0,
            fuelwood_proportion: 0.0,
            quality,
        }
    }

    #[test]
    fn test_merge_sums_and_spans() {
        let a = section(0, 40, 0.2, 50.0, QualityType::ButtLog);
        let b = section(40, 85, 0.15, 30.0, QualityType::ButtLog);
        let m = a.merge(&b);
        assert_eq!(m.start_point, 0);
        assert_eq!(m.end_point, 85);
        assert!((m.volume - 0.35).abs() < 1e-12);
        assert!((m.value - 80.0).abs() < 1e-12);
        assert_eq!(m.top_diameter, b.top_diameter);
        assert_eq!(m.length_dm(), 85);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = section(0, 40, 0.2, 50.0, QualityType::Pulp);
        let b = section(40, 85, 0.15, 30.0, QualityType::Pulp);
        assert_eq!(a.merge(&b), b.merge(&a));
    }

    #[test]
    fn test_merge_weights_proportions_by_volume() {
        let mut a = section(0, 40, 0.3, 50.0, QualityType::ButtLog);
        let mut b = section(40, 80, 0.1, 30.0, QualityType::ButtLog);
        a.timber_proportion = 0.8;
        a.pulp_proportion = 0.2;
        b.timber_proportion = 0.4;
        b.pulp_proportion = 0.6;
        let m = a.merge(&b);
        assert!((m.timber_proportion - 0.7).abs() < 1e-12);
        assert!((m.pulp_proportion - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_merge_sections_only_joins_matching_neighbours() {
        let sections = vec![
            section(0, 40, 0.2, 50.0, QualityType::ButtLog),
            section(40, 80, 0.15, 40.0, QualityType::ButtLog),
            section(80, 120, 0.1, 20.0, QualityType::MiddleLog),
            section(120, 150, 0.05, 5.0, QualityType::Pulp),
            section(150, 180, 0.04, 4.0, QualityType::Pulp),
        ];
        let merged = merge_sections(sections);
        let ranges: Vec<_> = merged
            .iter()
            .map(|s| (s.start_point, s.end_point, s.quality))
            .collect();
        assert_eq!(
            ranges,
            vec![
                (0, 80, QualityType::ButtLog),
                (80, 120, QualityType::MiddleLog),
                (120, 180, QualityType::Pulp),
            ]
        );
    }

    #[test]
    fn test_gap_prevents_merge() {
        let a = section(0, 40, 0.2, 50.0, QualityType::Pulp);
        let b = section(41, 80, 0.2, 50.0, QualityType::Pulp);
        assert!(!a.can_merge(&b));
    }

    #[test]
    fn test_quality_indices() {
        for (i, q) in QualityType::ALL.iter().enumerate() {
            assert_eq!(q.index(), i);
        }
        assert_eq!(QualityType::from_log_part(LogPart::Middle), QualityType::MiddleLog);
        assert!(QualityType::TopLog.is_timber());
        assert!(!QualityType::Pulp.is_timber());
    }
}

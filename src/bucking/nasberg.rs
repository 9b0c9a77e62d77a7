//! Näsberg (1985) bucking: a longest-path dynamic program over cut points
//! spaced one decimetre apart along the stem.

use super::config::{BuckingConfig, SpeciesSettings, TieBreak};
use super::result::BuckingResult;
use super::section::{merge_sections, CrossCutSection, QualityType};
use super::value_table::ValueTable;
use crate::error::ForestError;
use crate::models::{Species, Timber};
use crate::pricelist::{DowngradeProportions, LogPart, Pricelist, TimberPricelist, VolumeType};
use crate::taper::TaperModel;

/// Upper bound on the number of cut-point steps along one stem.
pub const MAX_NODES: usize = 400;

/// Shortest log length the solver accepts, in decimetres.
pub const MIN_LOG_LENGTH_DM: u32 = 10;

/// Values closer than this are treated as equal when choosing cuts.
const VALUE_TOLERANCE: f64 = 1e-9;

/// Guards node index rounding against `x.99999999` heights.
const INDEX_EPSILON: f64 = 1e-9;

/// One priced log between two nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    quality: QualityType,
    value: f64,
    /// Sawlog value before downgrading; 0 for other assortments
    timber_value: f64,
    volume: f64,
    proportions: Proportions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Proportions {
    timber: f64,
    pulp: f64,
    cull: f64,
    fuelwood: f64,
}

/// Stem sampled at one-decimetre steps from the stump.
struct Stem {
    heights: Vec<f64>,
    diameters: Vec<f64>,
    /// Volume from the stump up to each node
    cumulative_volume: Vec<f64>,
}

impl Stem {
    fn sample<T: TaperModel + ?Sized>(taper: &T, stump_m: f64, nodes: usize) -> Self {
        let heights: Vec<f64> = (0..=nodes).map(|i| stump_m + i as f64 / 10.0).collect();
        let diameters = heights.iter().map(|&h| taper.diameter_at_height(h)).collect();
        let mut cumulative_volume = Vec::with_capacity(heights.len());
        let mut total = 0.0;
        cumulative_volume.push(total);
        for pair in heights.windows(2) {
            total += taper.volume_section(pair[0], pair[1]);
            cumulative_volume.push(total);
        }
        Self {
            heights,
            diameters,
            cumulative_volume,
        }
    }

    fn last(&self) -> usize {
        self.heights.len() - 1
    }

    fn volume(&self, from: usize, to: usize) -> f64 {
        self.cumulative_volume[to] - self.cumulative_volume[from]
    }
}

/// Node limits for each sawlog part: a log ending at or below the limit
/// may be sold as that part.
#[derive(Debug, Clone, Copy)]
struct PartLimits {
    butt: i64,
    middle: i64,
    top: i64,
}

impl PartLimits {
    fn part_for_end(&self, end: usize) -> Option<LogPart> {
        let end = end as i64;
        if end <= self.butt {
            Some(LogPart::Butt)
        } else if end <= self.middle {
            Some(LogPart::Middle)
        } else if end <= self.top {
            Some(LogPart::Top)
        } else {
            None
        }
    }
}

/// Per-species prices that stay fixed for a whole bucking run.
#[derive(Debug, Clone, Copy)]
struct SegmentPricing {
    timber_price_factor: f64,
    /// Pulpwood price per m³ with the pulp factor applied
    pulp_price: f64,
    timber_downgrade: DowngradeProportions,
    pulp_downgrade: DowngradeProportions,
}

impl SegmentPricing {
    fn new(pricelist: &Pricelist, timber_prices: &TimberPricelist, species: &Species, settings: SpeciesSettings) -> Self {
        let (timber_downgrade, pulp_downgrade) = if settings.use_downgrading {
            (
                timber_prices.downgrade_proportions.normalized(),
                pricelist.pulpwood_downgrade().normalized(),
            )
        } else {
            (DowngradeProportions::default(), DowngradeProportions::default())
        };
        Self {
            timber_price_factor: settings.timber_price_factor,
            pulp_price: settings.pulp_price_factor * pricelist.pulpwood_price(species),
            timber_downgrade,
            pulp_downgrade,
        }
    }
}

/// Last node at or below `height_m`. A height that falls exactly on a node
/// maps to that node, so a log ending exactly at a part's maximum height
/// still counts as that part.
fn node_index(height_m: f64, stump_m: f64) -> i64 {
    ((height_m - stump_m) * 10.0 + INDEX_EPSILON).floor() as i64
}

/// Optimal bucking of one tree against one price list.
pub struct BranchAndBoundBucker<'a, T: TaperModel + ?Sized> {
    timber: &'a Timber,
    pricelist: &'a Pricelist,
    timber_prices: &'a TimberPricelist,
    taper: &'a T,
    modules: Vec<u32>,
    value_table: ValueTable,
}

impl<'a, T: TaperModel + ?Sized> BranchAndBoundBucker<'a, T> {
    /// Validate the inputs and build the value table.
    ///
    /// Fails with `ConfigurationError` when the tree geometry is invalid, when
    /// the species has no sawlog prices,
    /// when the log length ranges are inverted, or when the shortest log is
    /// under one metre.
    pub fn new(
        timber: &'a Timber,
        pricelist: &'a Pricelist,
        taper: &'a T,
    ) -> Result<Self, ForestError> {
        timber.validate().map_err(|e| match e {
            ForestError::ValidationError(msg) => ForestError::ConfigurationError(msg),
            other => other,
        })?;
        let timber_prices = pricelist.timber_prices(&timber.species).ok_or_else(|| {
            ForestError::ConfigurationError(format!(
                "No timber prices for species '{}'",
                timber.species
            ))
        })?;
        if timber_prices.diameter_classes().next().is_none() {
            return Err(ForestError::ConfigurationError(format!(
                "Timber price table for '{}' has no diameter classes",
                timber.species
            )));
        }

        let timber_len = pricelist.timber_log_length;
        let pulp_len = pricelist.pulp_log_length;
        for (name, range) in [("sawlog", timber_len), ("pulpwood", pulp_len)] {
            if range.min_dm() > range.max_dm() {
                return Err(ForestError::ConfigurationError(format!(
                    "Inverted {name} length range: {} m > {} m",
                    range.min, range.max
                )));
            }
        }
        let min_len = timber_len.min_dm().min(pulp_len.min_dm());
        let max_len = timber_len.max_dm().max(pulp_len.max_dm());
        if min_len < MIN_LOG_LENGTH_DM {
            return Err(ForestError::ConfigurationError(format!(
                "Minimum log length must be at least {} m, got {} m",
                MIN_LOG_LENGTH_DM as f64 / 10.0,
                min_len as f64 / 10.0
            )));
        }

        let modules: Vec<u32> = (min_len..=max_len).collect();
        let value_table = ValueTable::build(timber_prices, timber_len, &modules);

        Ok(Self {
            timber,
            pricelist,
            timber_prices,
            taper,
            modules,
            value_table,
        })
    }

    pub fn value_table(&self) -> &ValueTable {
        &self.value_table
    }

    pub fn species(&self) -> &Species {
        &self.timber.species
    }

    /// Find the most valuable cutting plan.
    ///
    /// `min_diam_dead_wood` (cm) only affects `dead_wood_proportion`.
    pub fn calculate_tree_value(
        &self,
        min_diam_dead_wood: f64,
        config: &BuckingConfig,
    ) -> Result<BuckingResult, ForestError> {
        config.validate()?;
        let settings = config.for_species(&self.timber.species);
        let pricing =
            SegmentPricing::new(self.pricelist, self.timber_prices, &self.timber.species, settings);
        let pl = self.pricelist;
        let taper = self.taper;
        let stump = self.timber.stump_height_m;
        let height = taper.total_height();

        let top_limit = pl.top_diameter.max(pl.pulp_log_diameter.min);
        let h_top = taper.height_at_diameter(top_limit);
        let nodes = node_index(h_top, stump).clamp(0, MAX_NODES as i64) as usize;
        let stem = Stem::sample(taper, stump, nodes);

        let vol_sk = taper.volume_section(stump, height);
        let share = |v: f64| if vol_sk > 0.0 { v / vol_sk } else { 0.0 };

        let h_5cm = taper.height_at_diameter(5.0);
        let vol_fub_5cm = taper.volume_section(stump, h_5cm);

        let dead_wood_volume = (0..=stem.last())
            .rev()
            .find(|&i| stem.diameters[i] >= min_diam_dead_wood)
            .map(|i| stem.cumulative_volume[i])
            .unwrap_or(0.0);

        // First node at or above the high stump height.
        let high_stump_node = (pl.high_stump_height > stump).then(|| {
            ((pl.high_stump_height - stump) * 10.0 - INDEX_EPSILON)
                .ceil()
                .clamp(0.0, stem.last() as f64) as usize
        });
        let high_stump_cut_volume = if pl.high_stump_height > stump {
            taper.volume_section(stump, pl.high_stump_height)
        } else {
            0.0
        };
        let start = match high_stump_node {
            Some(node) if config.leave_high_stump => node,
            _ => 0,
        };

        let limits = self.part_limits(stump);
        tracing::debug!(
            species = %self.timber.species,
            nodes,
            modules = self.modules.len(),
            start,
            "bucking stem"
        );

        let (best_value, choice) = self.solve(&stem, start, &limits, &pricing, config.tie_break);

        let mut volume_per_quality = vec![0.0; QualityType::COUNT];
        let mut timber_value = vec![0.0; QualityType::COUNT];
        let mut sections = Vec::new();
        let mut value_below_high_stump = 0.0;
        let mut cur = start;
        while let Some(next) = choice[cur] {
            let seg = self
                .segment(&stem, cur, next, &limits, &pricing)
                .ok_or_else(|| {
                    ForestError::ValidationError(format!(
                        "cut {cur}..{next} has no admissible assortment"
                    ))
                })?;
            volume_per_quality[seg.quality.index()] += seg.volume;
            if seg.quality.is_timber() {
                timber_value[seg.quality.index()] += seg.timber_value;
            }
            if matches!(high_stump_node, Some(node) if next <= node) {
                value_below_high_stump += seg.value;
            }
            if config.save_sections {
                sections.push(CrossCutSection {
                    start_point: cur as u32,
                    end_point: next as u32,
                    volume: seg.volume,
                    top_diameter: stem.diameters[next],
                    value: seg.value,
                    species: self.timber.species.clone(),
                    timber_proportion: seg.proportions.timber,
                    pulp_proportion: seg.proportions.pulp,
                    cull_proportion: seg.proportions.cull,
                    fuelwood_proportion: seg.proportions.fuelwood,
                    quality: seg.quality,
                });
            }
            cur = next;
        }
        let end = cur;

        let timber_price_by_quality = timber_value
            .iter()
            .zip(&volume_per_quality)
            .map(|(value, volume)| if *volume > 0.0 { value / volume } else { 0.0 })
            .collect();

        let top_volume = taper.volume_section(stem.heights[end], height);
        let high_stump_volume = if config.leave_high_stump {
            stem.cumulative_volume[start]
        } else {
            0.0
        };

        Ok(BuckingResult {
            species: self.timber.species.clone(),
            total_value: best_value,
            top_proportion: share(top_volume),
            dead_wood_proportion: share(dead_wood_volume),
            high_stump_volume_proportion: share(high_stump_cut_volume),
            high_stump_value_proportion: if best_value > 0.0 {
                value_below_high_stump / best_value
            } else {
                0.0
            },
            last_cut_relative_height: if height > 0.0 {
                stem.heights[end] / height
            } else {
                0.0
            },
            volume_per_quality,
            timber_price_by_quality,
            top_volume,
            high_stump_volume,
            vol_fub_5cm,
            vol_sk_ub: vol_sk,
            dbh_cm: taper.diameter_at_height(1.3),
            height_m: height,
            stump_height_m: stump,
            diameter_stump_cm: taper.diameter_at_height(stump),
            taper_diams_cm: stem.diameters.clone(),
            taper_heights_m: stem.heights.clone(),
            sections: config.save_sections.then(|| merge_sections(sections)),
        })
    }

    fn part_limits(&self, stump: f64) -> PartLimits {
        let q_height = self
            .taper
            .height_at_diameter(self.timber_prices.min_diameter() as f64);
        let limit = |part: LogPart| {
            let h = self.timber_prices.max_height.for_part(part).min(q_height);
            node_index(h, stump)
        };
        PartLimits {
            butt: limit(LogPart::Butt),
            middle: limit(LogPart::Middle),
            top: limit(LogPart::Top),
        }
    }

    /// Backward pass: best value from every node to the top and the next
    /// cut that achieves it (`None` means stop cutting).
    fn solve(
        &self,
        stem: &Stem,
        start: usize,
        limits: &PartLimits,
        pricing: &SegmentPricing,
        tie_break: TieBreak,
    ) -> (f64, Vec<Option<usize>>) {
        let n = stem.last();
        let mut best = vec![0.0_f64; n + 1];
        let mut choice: Vec<Option<usize>> = vec![None; n + 1];

        for i in (start..n).rev() {
            for &length in &self.modules {
                let j = i + length as usize;
                if j > n {
                    break;
                }
                let Some(seg) = self.segment(stem, i, j, limits, pricing) else {
                    continue;
                };
                let candidate = seg.value + best[j];
                let better = candidate > best[i] + VALUE_TOLERANCE;
                let tied_longer = tie_break == TieBreak::Longest
                    && choice[i].is_some()
                    && (candidate - best[i]).abs() <= VALUE_TOLERANCE;
                if better || tied_longer {
                    best[i] = candidate;
                    choice[i] = Some(j);
                }
            }
        }
        (best[start], choice)
    }

    /// Price the log between nodes `from` and `to`; `None` if no assortment
    /// admits it.
    fn segment(
        &self,
        stem: &Stem,
        from: usize,
        to: usize,
        limits: &PartLimits,
        pricing: &SegmentPricing,
    ) -> Option<Segment> {
        let pl = self.pricelist;
        let tp = self.timber_prices;
        let length = (to - from) as u32;
        let volume = stem.volume(from, to);
        let top_diameter = stem.diameters[to];
        let d_class = top_diameter.floor().max(0.0);

        let timber_part = limits.part_for_end(to).filter(|_| {
            pl.timber_log_length.contains_dm(length) && d_class >= tp.min_diameter() as f64
        });

        if let Some(part) = timber_part {
            let row = (d_class as usize).min(self.value_table.max_row());
            let module = self.value_table.module_index(length)?;
            let mut price = self.value_table.get(row, module, part)? * pricing.timber_price_factor;
            if tp.volume_type == VolumeType::M3fub {
                price *= volume;
            }
            let downgrade = pricing.timber_downgrade;
            let pulp_price = pricing.pulp_price;
            let value = price * downgrade.retained()
                + downgrade.pulpwood * pulp_price * volume
                + downgrade.cull * pl.log_cull_price * volume
                + downgrade.fuelwood * pl.fuelwood_price * volume;
            return Some(Segment {
                quality: QualityType::from_log_part(part),
                value,
                timber_value: price,
                volume,
                proportions: Proportions {
                    timber: downgrade.retained(),
                    pulp: downgrade.pulpwood,
                    cull: downgrade.cull,
                    fuelwood: downgrade.fuelwood,
                },
            });
        }

        if pl.pulp_log_length.contains_dm(length) && pl.pulp_log_diameter.contains(d_class) {
            let downgrade = pricing.pulp_downgrade;
            let pulp_price = pricing.pulp_price;
            let value = pulp_price * volume * downgrade.retained()
                + downgrade.fuelwood * pl.fuelwood_price * volume
                + downgrade.cull * pl.log_cull_price * volume;
            return Some(Segment {
                quality: QualityType::Pulp,
                value,
                timber_value: 0.0,
                volume,
                proportions: Proportions {
                    timber: 0.0,
                    pulp: downgrade.retained(),
                    cull: downgrade.cull,
                    fuelwood: downgrade.fuelwood,
                },
            });
        }

        if 2 * length >= pl.pulp_log_length.min_dm() {
            return Some(Segment {
                quality: QualityType::LogCull,
                value: pl.log_cull_price * volume,
                timber_value: 0.0,
                volume,
                proportions: Proportions {
                    cull: 1.0,
                    ..Default::default()
                },
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricelist::{DiameterRange, LengthRange, TimberPriceForDiameter};

    /// Constant-diameter stem.
    struct Cylinder {
        diameter_cm: f64,
        height_m: f64,
    }

    impl TaperModel for Cylinder {
        fn total_height(&self) -> f64 {
            self.height_m
        }

        fn diameter_at_height(&self, h: f64) -> f64 {
            if (0.0..=self.height_m).contains(&h) {
                self.diameter_cm
            } else {
                0.0
            }
        }
    }

    fn pricelist(prices: [f64; 3], volume_type: VolumeType) -> Pricelist {
        let mut tp = TimberPricelist::new(volume_type);
        tp.set_price_for_diameter(15, TimberPriceForDiameter::new(prices[0], prices[1], prices[2]));
        let mut pl = Pricelist {
            timber_log_length: LengthRange::new(2.0, 2.0),
            pulp_log_length: LengthRange::new(2.0, 2.0),
            pulp_log_diameter: DiameterRange::new(5.0, 60.0),
            log_cull_price: 0.0,
            fuelwood_price: 10.0,
            ..Default::default()
        };
        pl.timber.insert(Species::new("pine"), tp);
        pl
    }

    fn tree(height_m: f64) -> Timber {
        Timber::new("pine", 15.0, height_m)
            .unwrap()
            .with_stump_height(0.0)
    }

    #[test]
    fn test_missing_species_is_configuration_error() {
        let pl = pricelist([10.0; 3], VolumeType::M3fub);
        let t = Timber::new("spruce", 15.0, 6.0).unwrap();
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        let err = BranchAndBoundBucker::new(&t, &pl, &taper).err().unwrap();
        assert!(matches!(err, ForestError::ConfigurationError(_)));
        assert!(err.to_string().contains("spruce"));
    }

    #[test]
    fn test_invalid_geometry_is_configuration_error() {
        let pl = pricelist([10.0; 3], VolumeType::M3fub);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        let mut t = tree(6.0);
        t.diameter_cm = -1.0;
        let err = BranchAndBoundBucker::new(&t, &pl, &taper).err().unwrap();
        assert!(matches!(err, ForestError::ConfigurationError(_)));
        assert!(err.to_string().contains("diameter_cm"));

        let mut t = tree(6.0);
        t.height_m = 0.0;
        let err = BranchAndBoundBucker::new(&t, &pl, &taper).err().unwrap();
        assert!(matches!(err, ForestError::ConfigurationError(_)));
    }

    #[test]
    fn test_segment_pricing_is_resolved_once() {
        let mut pl = pricelist([10.0; 3], VolumeType::M3fub);
        pl.pulp = crate::pricelist::PulpPricelist::new([(Species::new("pinus"), 150.0)]);
        pl.pulpwood_cull_proportion = 0.3;
        let tp = pl.timber_prices(&Species::new("pine")).unwrap().clone();
        let settings = SpeciesSettings {
            timber_price_factor: 1.0,
            pulp_price_factor: 2.0,
            use_downgrading: true,
        };
        let pricing = SegmentPricing::new(&pl, &tp, &Species::new("pinus sylvestris"), settings);
        assert_eq!(pricing.pulp_price, 300.0);
        assert_eq!(pricing.pulp_downgrade.cull, 0.3);

        let plain = SegmentPricing::new(
            &pl,
            &tp,
            &Species::new("pine"),
            SpeciesSettings {
                use_downgrading: false,
                ..settings
            },
        );
        assert_eq!(plain.pulp_price, 400.0);
        assert_eq!(plain.pulp_downgrade, DowngradeProportions::default());
    }

    #[test]
    fn test_log_ending_at_part_limit_keeps_that_part() {
        assert_eq!(node_index(2.0, 0.0), 20);
        assert_eq!(node_index(2.3, 0.3), 20);
        assert_eq!(node_index(1.99, 0.0), 19);
    }

    #[test]
    fn test_short_minimum_log_rejected() {
        let mut pl = pricelist([10.0; 3], VolumeType::M3fub);
        pl.pulp_log_length = LengthRange::new(0.5, 2.0);
        let t = tree(6.0);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        let err = BranchAndBoundBucker::new(&t, &pl, &taper).err().unwrap();
        assert!(err.to_string().contains("Minimum log length"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut pl = pricelist([10.0; 3], VolumeType::M3fub);
        pl.timber_log_length = LengthRange::new(3.0, 2.0);
        let t = tree(6.0);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        assert!(BranchAndBoundBucker::new(&t, &pl, &taper).is_err());
    }

    #[test]
    fn test_modules_span_both_ranges() {
        let mut pl = pricelist([10.0; 3], VolumeType::M3fub);
        pl.timber_log_length = LengthRange::new(3.4, 5.5);
        pl.pulp_log_length = LengthRange::new(2.7, 5.0);
        let t = tree(6.0);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        let b = BranchAndBoundBucker::new(&t, &pl, &taper).unwrap();
        assert_eq!(b.value_table().modules().first(), Some(&27));
        assert_eq!(b.value_table().modules().last(), Some(&55));
    }

    #[test]
    fn test_single_class_cylinder_without_downgrading() {
        let pl = pricelist([10.0; 3], VolumeType::M3fub);
        let t = tree(6.0);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        let b = BranchAndBoundBucker::new(&t, &pl, &taper).unwrap();
        let r = b
            .calculate_tree_value(99.0, &BuckingConfig::default().with_sections(true))
            .unwrap();
        let volume = std::f64::consts::PI * 0.075_f64.powi(2) * 6.0;
        assert!((r.total_value - 10.0 * volume).abs() < 1e-6);
        assert_eq!(r.sections().len(), 1);
        assert_eq!(r.sections()[0].start_point, 0);
        assert_eq!(r.sections()[0].end_point, 60);
        assert!(r.top_volume.abs() < 1e-9);
        assert_eq!(r.last_cut_relative_height, 1.0);
    }

    #[test]
    fn test_part_limits_follow_max_heights() {
        let mut pl = pricelist([10.0; 3], VolumeType::M3fub);
        pl.timber
            .get_mut(&Species::new("pine"))
            .unwrap()
            .max_height = crate::pricelist::MaxHeights {
            butt: 2.0,
            middle: 4.0,
            top: 99.0,
        };
        let t = tree(6.0);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        let b = BranchAndBoundBucker::new(&t, &pl, &taper).unwrap();
        let limits = b.part_limits(0.0);
        assert_eq!(limits.butt, 20);
        assert_eq!(limits.middle, 40);
        assert_eq!(limits.top, 60);
        assert_eq!(limits.part_for_end(20), Some(LogPart::Butt));
        assert_eq!(limits.part_for_end(21), Some(LogPart::Middle));
        assert_eq!(limits.part_for_end(61), None);
    }

    #[test]
    fn test_thin_stem_falls_back_to_pulp() {
        let pl = pricelist([10.0; 3], VolumeType::M3fub);
        let t = Timber::new("pine", 12.0, 6.0)
            .unwrap()
            .with_stump_height(0.0);
        let taper = Cylinder {
            diameter_cm: 12.0,
            height_m: 6.0,
        };
        let b = BranchAndBoundBucker::new(&t, &pl, &taper).unwrap();
        let r = b.calculate_tree_value(99.0, &BuckingConfig::default()).unwrap();
        let volume = std::f64::consts::PI * 0.06_f64.powi(2) * 6.0;
        assert!((r.volume_of(QualityType::Pulp) - volume).abs() < 1e-6);
        assert!((r.total_value - 200.0 * volume).abs() < 1e-6);
        assert_eq!(r.timber_price_by_quality[QualityType::Pulp.index()], 0.0);
    }

    #[test]
    fn test_cull_when_no_assortment_fits() {
        // 3 m logs are too long for sawlogs and too thick for pulp, but long
        // enough to be sold as cull.
        let mut pl = pricelist([10.0; 3], VolumeType::M3fub);
        pl.pulp_log_length = LengthRange::new(2.0, 3.0);
        pl.pulp_log_diameter = DiameterRange::new(5.0, 10.0);
        pl.log_cull_price = 10.0;
        let t = tree(3.0);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 3.0,
        };
        let b = BranchAndBoundBucker::new(&t, &pl, &taper).unwrap();
        let r = b
            .calculate_tree_value(99.0, &BuckingConfig::default().with_sections(true))
            .unwrap();
        let volume = std::f64::consts::PI * 0.075_f64.powi(2) * 3.0;
        assert!((r.volume_of(QualityType::LogCull) - volume).abs() < 1e-9);
        assert!((r.total_value - 10.0 * volume).abs() < 1e-9);
        assert_eq!(r.sections()[0].quality, QualityType::LogCull);
        assert_eq!(r.sections()[0].cull_proportion, 1.0);
    }

    #[test]
    fn test_dead_wood_proportion() {
        let pl = pricelist([10.0; 3], VolumeType::M3fub);
        let t = tree(6.0);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        let b = BranchAndBoundBucker::new(&t, &pl, &taper).unwrap();
        let r = b.calculate_tree_value(10.0, &BuckingConfig::default()).unwrap();
        assert!((r.dead_wood_proportion - 1.0).abs() < 1e-9);
        let r = b.calculate_tree_value(99.0, &BuckingConfig::default()).unwrap();
        assert_eq!(r.dead_wood_proportion, 0.0);
    }

    #[test]
    fn test_high_stump_left_standing() {
        let mut pl = pricelist([10.0; 3], VolumeType::M3fub);
        pl.high_stump_height = 2.0;
        let t = tree(6.0);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        let b = BranchAndBoundBucker::new(&t, &pl, &taper).unwrap();

        let cut = b.calculate_tree_value(99.0, &BuckingConfig::default()).unwrap();
        assert!((cut.high_stump_volume_proportion - 1.0 / 3.0).abs() < 1e-9);
        assert!((cut.high_stump_value_proportion - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(cut.high_stump_volume, 0.0);

        let left = b
            .calculate_tree_value(99.0, &BuckingConfig::default().with_high_stump(true))
            .unwrap();
        assert!((left.total_value - cut.total_value * 2.0 / 3.0).abs() < 1e-9);
        assert!((left.high_stump_volume - cut.vol_sk_ub / 3.0).abs() < 1e-9);
        assert_eq!(left.high_stump_value_proportion, 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let pl = pricelist([10.0; 3], VolumeType::M3fub);
        let t = tree(6.0);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        let b = BranchAndBoundBucker::new(&t, &pl, &taper).unwrap();
        let config = BuckingConfig {
            pulp_price_factor: f64::NAN,
            ..Default::default()
        };
        assert!(b.calculate_tree_value(99.0, &config).is_err());
    }

    #[test]
    fn test_timber_factor_override_for_species() {
        let pl = pricelist([10.0; 3], VolumeType::M3fub);
        let t = tree(6.0);
        let taper = Cylinder {
            diameter_cm: 15.0,
            height_m: 6.0,
        };
        let b = BranchAndBoundBucker::new(&t, &pl, &taper).unwrap();
        let base = b.calculate_tree_value(99.0, &BuckingConfig::default()).unwrap();
        let mut config = BuckingConfig::default();
        config.species.insert(
            "pine".to_string(),
            crate::bucking::SpeciesOverride {
                timber_price_factor: Some(2.0),
                ..Default::default()
            },
        );
        let doubled = b.calculate_tree_value(99.0, &config).unwrap();
        assert!((doubled.total_value - 2.0 * base.total_value).abs() < 1e-9);
        assert_eq!(doubled.timber_price_by_quality[QualityType::ButtLog.index()], 20.0);
    }
}

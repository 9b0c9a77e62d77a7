//! Precomputed bucking solutions over a (species, DBH, height) grid.

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bucking::{BranchAndBoundBucker, BuckingConfig, CrossCutSection};
use crate::error::ForestError;
use crate::models::{Species, Timber};
use crate::pricelist::{content_hash, create_pricelist_from_data, PriceData};
use crate::taper::{Taper, TaperKind};

/// Grid of trees to buck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeGrid {
    pub species: Vec<String>,
    /// Inclusive DBH range in cm
    pub dbh_range: (f64, f64),
    pub dbh_step: f64,
    /// Inclusive height range in m
    pub height_range: (f64, f64),
    pub height_step: f64,
    pub min_diam_dead_wood: f64,
}

impl Default for CubeGrid {
    fn default() -> Self {
        Self {
            species: vec!["pinus sylvestris".to_string(), "picea abies".to_string()],
            dbh_range: (10.0, 50.0),
            dbh_step: 2.0,
            height_range: (10.0, 30.0),
            height_step: 0.2,
            min_diam_dead_wood: 99.0,
        }
    }
}

impl CubeGrid {
    fn axis(name: &str, (lo, hi): (f64, f64), step: f64) -> Result<Vec<f64>, ForestError> {
        if !(step > 0.0) || !(lo > 0.0) || lo > hi {
            return Err(ForestError::ValidationError(format!(
                "{name}: invalid grid {lo}..={hi} step {step}"
            )));
        }
        let count = ((hi - lo) / step + 1e-9).floor() as usize + 1;
        // Round to 0.1 so coordinates stay on the decimetre / millimetre grid.
        Ok((0..count)
            .map(|k| ((lo + k as f64 * step) * 10.0).round() / 10.0)
            .collect())
    }

    pub fn dbh_values(&self) -> Result<Vec<f64>, ForestError> {
        Self::axis("dbh", self.dbh_range, self.dbh_step)
    }

    pub fn height_values(&self) -> Result<Vec<f64>, ForestError> {
        Self::axis("height", self.height_range, self.height_step)
    }

    /// Every (species, dbh, height) combination, species-major.
    pub fn tasks(&self) -> Result<Vec<(String, f64, f64)>, ForestError> {
        if self.species.is_empty() {
            return Err(ForestError::ValidationError(
                "cube grid needs at least one species".to_string(),
            ));
        }
        let dbhs = self.dbh_values()?;
        let heights = self.height_values()?;
        let mut tasks = Vec::with_capacity(self.species.len() * dbhs.len() * heights.len());
        for sp in &self.species {
            for &d in &dbhs {
                for &h in &heights {
                    tasks.push((Species::new(sp).to_string(), d, h));
                }
            }
        }
        Ok(tasks)
    }
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.is_finite() {
            s.serialize_some(v)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

/// One bucked tree. Failed trees carry `NaN` and an empty section list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeRecord {
    pub species: String,
    pub dbh: f64,
    pub height: f64,
    #[serde(with = "nan_as_null")]
    pub total_value: f64,
    /// JSON array of `CrossCutSection`s
    pub solution_sections: String,
}

impl CubeRecord {
    pub fn is_failed(&self) -> bool {
        self.total_value.is_nan()
    }

    pub fn sections(&self) -> Result<Vec<CrossCutSection>, ForestError> {
        Ok(serde_json::from_str(&self.solution_sections)?)
    }
}

/// Result of a cube lookup at the nearest grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeLookup {
    pub dbh: f64,
    pub height: f64,
    pub total_value: f64,
    pub sections: Vec<CrossCutSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionCube {
    /// blake3 hash of the price data the cube was built from
    pub pricelist_hash: String,
    pub taper_model: TaperKind,
    pub created_utc: DateTime<Utc>,
    pub grid: CubeGrid,
    pub records: Vec<CubeRecord>,
}

/// Closest value to `target`; the first one wins ties.
fn nearest(values: impl Iterator<Item = f64>, target: f64) -> Option<f64> {
    values.fold(None, |best, v| match best {
        Some(b) if (b - target).abs() <= (v - target).abs() => Some(b),
        _ => Some(v),
    })
}

/// Run `buck` over every task in parallel. A tree whose bucking errors or
/// panics becomes a `NaN` record with `"[]"` sections.
fn run_batch<F>(tasks: &[(String, f64, f64)], buck: F) -> Vec<CubeRecord>
where
    F: Fn(&str, f64, f64) -> Result<(f64, String), ForestError> + Sync,
{
    tasks
        .par_iter()
        .map(|(species, dbh, height)| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| buck(species, *dbh, *height)));
            let (total_value, solution_sections) = match outcome {
                Ok(Ok(ok)) => ok,
                Ok(Err(e)) => {
                    tracing::error!(%species, dbh, height, "bucking failed: {e}");
                    (f64::NAN, "[]".to_string())
                }
                Err(payload) => {
                    let msg = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::warn!(%species, dbh, height, "bucking panicked: {msg}");
                    (f64::NAN, "[]".to_string())
                }
            };
            CubeRecord {
                species: species.clone(),
                dbh: *dbh,
                height: *height,
                total_value,
                solution_sections,
            }
        })
        .collect()
}

fn buck_one(
    data: &PriceData,
    taper_kind: TaperKind,
    config: &BuckingConfig,
    min_diam_dead_wood: f64,
    species: &str,
    dbh: f64,
    height: f64,
) -> Result<(f64, String), ForestError> {
    let pricelist = create_pricelist_from_data(data, Some(&[species]))?;
    let timber = Timber::new(species, dbh, height)?;
    let taper = Taper::new(taper_kind, &timber)?;
    let bucker = BranchAndBoundBucker::new(&timber, &pricelist, &taper)?;
    let result = bucker.calculate_tree_value(min_diam_dead_wood, config)?;
    Ok((result.total_value, result.sections_json()?))
}

impl SolutionCube {
    /// Buck every tree in `grid` in parallel. Trees that fail or panic are
    /// logged and stored as `NaN` records; they never abort the batch.
    pub fn generate(
        data: &PriceData,
        taper_kind: TaperKind,
        grid: &CubeGrid,
        config: &BuckingConfig,
    ) -> Result<Self, ForestError> {
        let pricelist_hash = content_hash(data)?;
        let tasks = grid.tasks()?;
        let config = config.clone().with_sections(true);
        tracing::info!(
            trees = tasks.len(),
            taper = %taper_kind,
            hash = %pricelist_hash,
            "generating solution cube"
        );

        let records = run_batch(&tasks, |species, dbh, height| {
            buck_one(
                data,
                taper_kind,
                &config,
                grid.min_diam_dead_wood,
                species,
                dbh,
                height,
            )
        });

        let failed = records.iter().filter(|r| r.is_failed()).count();
        tracing::info!(records = records.len(), failed, "solution cube finished");

        Ok(Self {
            pricelist_hash,
            taper_model: taper_kind,
            created_utc: Utc::now(),
            grid: grid.clone(),
            records,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Load a cube; with `verify_against`, fail unless it was built from
    /// exactly that price data.
    pub fn load(
        path: impl AsRef<Path>,
        verify_against: Option<&PriceData>,
    ) -> Result<Self, ForestError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let cube: SolutionCube = serde_json::from_str(&content)?;
        if let Some(data) = verify_against {
            cube.verify(data)?;
        }
        Ok(cube)
    }

    pub fn verify(&self, data: &PriceData) -> Result<(), ForestError> {
        let actual = content_hash(data)?;
        if actual != self.pricelist_hash {
            return Err(ForestError::HashMismatch {
                expected: self.pricelist_hash.clone(),
                actual,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Species present in the cube, in first-seen order.
    pub fn species(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for r in &self.records {
            if !seen.contains(&r.species.as_str()) {
                seen.push(&r.species);
            }
        }
        seen
    }

    /// Nearest grid point for a tree: nearest DBH first, then the nearest
    /// height at that DBH. `None` when the species is not in the cube.
    pub fn lookup(
        &self,
        species: &str,
        dbh: f64,
        height: f64,
    ) -> Result<Option<CubeLookup>, ForestError> {
        let wanted = Species::new(species);
        let candidates: Vec<&CubeRecord> = self
            .records
            .iter()
            .filter(|r| Species::new(&r.species) == wanted)
            .collect();

        let Some(best_dbh) = nearest(candidates.iter().map(|r| r.dbh), dbh) else {
            tracing::warn!(%species, "species not found in solution cube");
            return Ok(None);
        };
        let at_dbh: Vec<&CubeRecord> = candidates
            .into_iter()
            .filter(|r| r.dbh == best_dbh)
            .collect();
        let Some(best_height) = nearest(at_dbh.iter().map(|r| r.height), height) else {
            return Ok(None);
        };
        let Some(record) = at_dbh.into_iter().find(|r| r.height == best_height) else {
            return Ok(None);
        };

        Ok(Some(CubeLookup {
            dbh: record.dbh,
            height: record.height,
            total_value: record.total_value,
            sections: record.sections()?,
        }))
    }

    /// Write one CSV row per record.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ForestError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for r in &self.records {
            wtr.serialize(r)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_csv(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricelist::mellanskog_2013;

    fn small_grid() -> CubeGrid {
        CubeGrid {
            species: vec!["pinus sylvestris".to_string()],
            dbh_range: (20.0, 24.0),
            dbh_step: 2.0,
            height_range: (18.0, 19.0),
            height_step: 0.5,
            min_diam_dead_wood: 99.0,
        }
    }

    #[test]
    fn test_grid_axes() {
        let g = small_grid();
        assert_eq!(g.dbh_values().unwrap(), vec![20.0, 22.0, 24.0]);
        assert_eq!(g.height_values().unwrap(), vec![18.0, 18.5, 19.0]);
        assert_eq!(g.tasks().unwrap().len(), 9);
    }

    #[test]
    fn test_panicking_tree_does_not_abort_batch() {
        let tasks = small_grid().tasks().unwrap();
        let records = run_batch(&tasks, |species, dbh, height| {
            if dbh == 22.0 && height == 18.5 {
                panic!("corrupt stem");
            }
            if dbh == 24.0 && height == 19.0 {
                return Err(ForestError::ValidationError("bad tree".to_string()));
            }
            Ok((dbh * height, format!("[\"{species}\"]")))
        });

        assert_eq!(records.len(), 9);
        let failed: Vec<_> = records
            .iter()
            .filter(|r| r.is_failed())
            .map(|r| (r.dbh, r.height))
            .collect();
        assert_eq!(failed, vec![(22.0, 18.5), (24.0, 19.0)]);
        for r in records.iter().filter(|r| r.is_failed()) {
            assert_eq!(r.solution_sections, "[]");
        }
        for r in records.iter().filter(|r| !r.is_failed()) {
            assert_eq!(r.total_value, r.dbh * r.height);
            assert_eq!(r.solution_sections, "[\"pinus sylvestris\"]");
        }
    }

    #[test]
    fn test_grid_step_noise() {
        let g = CubeGrid {
            height_range: (10.0, 11.0),
            height_step: 0.2,
            ..small_grid()
        };
        assert_eq!(
            g.height_values().unwrap(),
            vec![10.0, 10.2, 10.4, 10.6, 10.8, 11.0]
        );
    }

    #[test]
    fn test_invalid_grid() {
        let g = CubeGrid {
            dbh_step: 0.0,
            ..small_grid()
        };
        assert!(g.tasks().is_err());
        let g = CubeGrid {
            species: vec![],
            ..small_grid()
        };
        assert!(g.tasks().is_err());
    }

    #[test]
    fn test_generate_and_lookup() {
        let data = mellanskog_2013().unwrap();
        let cube = SolutionCube::generate(
            &data,
            TaperKind::EdgrenNylinder1949,
            &small_grid(),
            &BuckingConfig::default(),
        )
        .unwrap();
        assert_eq!(cube.len(), 9);
        assert!(cube.records.iter().all(|r| !r.is_failed()));
        assert!(cube.records.iter().all(|r| r.total_value > 0.0));

        let hit = cube.lookup("Pinus sylvestris", 22.7, 18.3).unwrap().unwrap();
        assert_eq!(hit.dbh, 22.0);
        assert_eq!(hit.height, 18.5);
        assert!(!hit.sections.is_empty());

        assert!(cube.lookup("picea abies", 22.0, 18.0).unwrap().is_none());
    }

    #[test]
    fn test_failed_tree_is_nan_record() {
        let data = mellanskog_2013().unwrap();
        let grid = CubeGrid {
            species: vec!["larix decidua".to_string()],
            dbh_range: (20.0, 20.0),
            height_range: (18.0, 18.0),
            ..small_grid()
        };
        let cube = SolutionCube::generate(
            &data,
            TaperKind::EdgrenNylinder1949,
            &grid,
            &BuckingConfig::default(),
        )
        .unwrap();
        assert_eq!(cube.len(), 1);
        assert!(cube.records[0].is_failed());
        assert_eq!(cube.records[0].solution_sections, "[]");
    }

    #[test]
    fn test_save_load_and_verify() {
        let data = mellanskog_2013().unwrap();
        let grid = CubeGrid {
            dbh_range: (20.0, 20.0),
            height_range: (18.0, 18.0),
            species: vec!["picea abies".to_string(), "quercus robur".to_string()],
            ..small_grid()
        };
        let cube =
            SolutionCube::generate(&data, TaperKind::EdgrenNylinder1949, &grid, &BuckingConfig::default())
                .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.json");
        cube.save(&path).unwrap();

        let loaded = SolutionCube::load(&path, Some(&data)).unwrap();
        assert_eq!(loaded.pricelist_hash, cube.pricelist_hash);
        assert_eq!(loaded.len(), 2);
        assert!(loaded.records[1].is_failed());
        assert_eq!(loaded.species(), vec!["picea abies", "quercus robur"]);

        let mut other = data.clone();
        other.common.as_mut().unwrap().stump_price += 1.0;
        let err = SolutionCube::load(&path, Some(&other)).unwrap_err();
        assert!(matches!(err, ForestError::HashMismatch { .. }));
    }

    #[test]
    fn test_csv_export() {
        let cube = SolutionCube {
            pricelist_hash: "abc".to_string(),
            taper_model: TaperKind::Schmidt2001,
            created_utc: Utc::now(),
            grid: small_grid(),
            records: vec![CubeRecord {
                species: "picea abies".to_string(),
                dbh: 20.0,
                height: 18.0,
                total_value: 123.5,
                solution_sections: "[]".to_string(),
            }],
        };
        let mut buf = Vec::new();
        cube.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("species,dbh,height,total_value,solution_sections"));
        assert!(text.contains("picea abies,20.0,18.0,123.5,[]"));
    }
}

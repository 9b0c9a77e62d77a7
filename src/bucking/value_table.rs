use crate::pricelist::{LengthRange, LogPart, TimberPricelist, VolumeType};

/// Log values per diameter class, length module and sawlog part, built once
/// per tree and price list and read-only afterwards.
///
/// Rows are whole-centimetre top diameters `0..=max_class`. For `m3to`
/// price lists an entry is the value of the whole log (price times the
/// top-diameter cylinder); for `m3fub` it is the price per m³.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable {
    rows: usize,
    modules: Vec<u32>,
    data: Vec<f64>,
}

const PARTS: usize = 3;

impl ValueTable {
    /// `modules` are the log lengths in decimetres considered by the solver.
    /// Lengths outside `timber_length` are stored as 0.
    pub fn build(prices: &TimberPricelist, timber_length: LengthRange, modules: &[u32]) -> Self {
        let rows = prices.max_diameter() as usize + 1;
        let mut table = Self {
            rows,
            modules: modules.to_vec(),
            data: vec![0.0; rows * modules.len() * PARTS],
        };

        for d in prices.min_diameter()..=prices.max_diameter() {
            let Some(class) = prices.diameter_class(d as f64) else {
                continue;
            };
            for (m, &length_dm) in modules.iter().enumerate() {
                if !timber_length.contains_dm(length_dm) {
                    continue;
                }
                let volume_factor = match prices.volume_type {
                    VolumeType::M3to => {
                        let r = d as f64 / 200.0;
                        std::f64::consts::PI * r * r * (length_dm as f64 / 10.0)
                    }
                    VolumeType::M3fub => 1.0,
                };
                for part in LogPart::ALL {
                    let base = prices.price_for_log_part(part, d as f64);
                    let price = prices
                        .length_corrections
                        .corrected_price(base, class, length_dm);
                    let idx = table.offset(d as usize, m, part);
                    table.data[idx] = price * volume_factor;
                }
            }
        }
        table
    }

    fn offset(&self, row: usize, module: usize, part: LogPart) -> usize {
        (row * self.modules.len() + module) * PARTS + part.index()
    }

    /// Value for a diameter row, module index and part; `None` out of bounds.
    pub fn get(&self, row: usize, module: usize, part: LogPart) -> Option<f64> {
        if row >= self.rows || module >= self.modules.len() {
            return None;
        }
        self.data.get(self.offset(row, module, part)).copied()
    }

    /// Modules are consecutive decimetre lengths, so the index is an offset
    /// from the shortest one.
    pub fn module_index(&self, length_dm: u32) -> Option<usize> {
        let first = *self.modules.first()?;
        let idx = length_dm.checked_sub(first)? as usize;
        (idx < self.modules.len()).then_some(idx)
    }

    pub fn modules(&self) -> &[u32] {
        &self.modules
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Index of the largest diameter row.
    pub fn max_row(&self) -> usize {
        self.rows.saturating_sub(1)
    }
}

use serde::{Deserialize, Serialize};

/// Diagnostic attached to a model output whose inputs fall outside the range
/// the regression was fitted on. The value is still computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutOfRangeWarning {
    /// Name of the model producing the warning, e.g. "Näslund 1947".
    pub model: String,
    /// Input parameter that is out of range.
    pub parameter: String,
    pub value: f64,
    pub valid_min: Option<f64>,
    pub valid_max: Option<f64>,
}

impl std::fmt::Display for OutOfRangeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} = {} outside", self.model, self.parameter, self.value)?;
        match (self.valid_min, self.valid_max) {
            (Some(lo), Some(hi)) => write!(f, " [{lo}, {hi}]"),
            (Some(lo), None) => write!(f, " [{lo}, ..)"),
            (None, Some(hi)) => write!(f, " (.., {hi}]"),
            (None, None) => write!(f, " valid range"),
        }
    }
}

/// A best-effort numeric value together with any range diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub value: f64,
    pub warnings: Vec<OutOfRangeWarning>,
}

impl Estimate {
    pub fn exact(value: f64) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: OutOfRangeWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn is_in_range(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Keep the value and move the diagnostics into `sink`.
    pub fn take(self, sink: &mut Vec<OutOfRangeWarning>) -> f64 {
        sink.extend(self.warnings);
        self.value
    }
}

/// Check `value >= min` and produce a warning when it is not.
pub(crate) fn check_min(model: &str, parameter: &str, value: f64, min: f64) -> Option<OutOfRangeWarning> {
    if value < min {
        Some(OutOfRangeWarning {
            model: model.to_string(),
            parameter: parameter.to_string(),
            value,
            valid_min: Some(min),
            valid_max: None,
        })
    } else {
        None
    }
}

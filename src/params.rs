use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Period-length clamp applied to every forecast.
pub const MIN_PERIOD_LENGTH: i64 = 3;
pub const MAX_PERIOD_LENGTH: i64 = 8;
/// Period length assumed by the predictor when a record carries none.
pub const PREDICTOR_PERIOD_FALLBACK: i64 = 5;
/// Period length assumed by the statistics summary when a record carries none.
pub const STATS_PERIOD_FALLBACK: i64 = 4;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model parameters: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coefficients {
    #[serde(rename = "PreviousCycle")]
    pub previous_cycle: f64,
    #[serde(rename = "CycleAvg")]
    pub cycle_avg: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bounds {
    pub min_cycle_length: i64,
    pub max_cycle_length: i64,
}

impl Bounds {
    pub fn clamp_cycle_length(&self, length: i64) -> i64 {
        length.clamp(self.min_cycle_length, self.max_cycle_length)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirements {
    pub min_cycles: usize,
}

/// Fit figures from the offline training run. Never recomputed here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub mae: f64,
    pub r2: f64,
}

/// Fixed linear model: `PreviousCycle * a + CycleAvg * b + intercept`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelParameters {
    pub model_type: String,
    pub version: String,
    pub features: Vec<String>,
    pub coefficients: Coefficients,
    pub intercept: f64,
    pub bounds: Bounds,
    pub requirements: Requirements,
    pub performance_metrics: PerformanceMetrics,
}

static SHIPPED: LazyLock<ModelParameters> = LazyLock::new(|| ModelParameters {
    model_type: "LinearRegression".into(),
    version: "1.0.0".into(),
    features: vec!["PreviousCycle".into(), "CycleAvg".into()],
    coefficients: Coefficients {
        previous_cycle: 0.2841,
        cycle_avg: 0.6873,
    },
    intercept: 0.8123,
    bounds: Bounds {
        min_cycle_length: 21,
        max_cycle_length: 45,
    },
    requirements: Requirements { min_cycles: 1 },
    performance_metrics: PerformanceMetrics { mae: 1.87, r2: 0.64 },
});

impl ModelParameters {
    /// The parameters the crate ships with, shared by the whole process.
    pub fn shipped() -> &'static ModelParameters {
        &SHIPPED
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let params: ModelParameters = serde_json::from_str(raw)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject parameter sets that would make clamping or the date roll-forward ill-defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Bounds {
            min_cycle_length,
            max_cycle_length,
        } = self.bounds;
        if min_cycle_length < 1 {
            return Err(ConfigError::Invalid(format!(
                "min_cycle_length must be at least 1, got {min_cycle_length}"
            )));
        }
        if min_cycle_length > max_cycle_length {
            return Err(ConfigError::Invalid(format!(
                "min_cycle_length {min_cycle_length} exceeds max_cycle_length {max_cycle_length}"
            )));
        }
        if self.requirements.min_cycles < 1 {
            return Err(ConfigError::Invalid("min_cycles must be at least 1".into()));
        }
        let finite = [
            self.coefficients.previous_cycle,
            self.coefficients.cycle_avg,
            self.intercept,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(ConfigError::Invalid("coefficients must be finite".into()));
        }
        let PerformanceMetrics { mae, r2 } = self.performance_metrics;
        if !(0.0..=1.0).contains(&r2) {
            return Err(ConfigError::Invalid(format!("r2 must lie in [0, 1], got {r2}")));
        }
        if mae.is_nan() || mae < 0.0 {
            return Err(ConfigError::Invalid(format!("mae must be non-negative, got {mae}")));
        }
        Ok(())
    }
}

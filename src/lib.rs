//! Cycle statistics and next-period forecasting.
//!
//! The engine is stateless: every call is a pure function of the records it
//! is given, the process-wide [`ModelParameters`], and the reference date.

pub mod calendar;
pub mod confidence;
pub mod crypto;
pub mod models;
pub mod params;
pub mod prediction;
pub mod regression;
pub mod service;
pub mod stats;
pub mod storage;

pub use models::{
    fill_cycle_lengths, CycleDayProjection, CycleRecord, FertilityWindow, ModelEcho, NextPeriod,
    PredictionResult, StatsSummary, StoredPrediction, UserData, UserId,
};
pub use params::{ConfigError, ModelParameters};
pub use prediction::{fertility_window, PredictionError, RegressionPredictor};
pub use service::{CycleSource, PredictionService, PredictionSink, ServiceError};
pub use stats::calculate_stats;
pub use storage::{EncryptedStore, StorageError};

/// Forecast the next period with the shipped model, relative to the local date.
pub fn predict(cycles: &[CycleRecord]) -> PredictionResult {
    RegressionPredictor::shipped().predict(cycles)
}

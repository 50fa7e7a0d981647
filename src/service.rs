use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{CycleRecord, PredictionResult, StatsSummary, StoredPrediction, UserId};
use crate::prediction::RegressionPredictor;
use crate::stats::calculate_stats;

/// Read side of the persistence layer. Ordering of the returned records is unspecified.
pub trait CycleSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load_cycles(&self, user: UserId) -> Result<Vec<CycleRecord>, Self::Error>;
}

/// Write side of the persistence layer. Failures are tolerated by the caller.
pub trait PredictionSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn store_prediction(&self, user: UserId, prediction: &StoredPrediction) -> Result<(), Self::Error>;
}

impl<T: CycleSource + ?Sized> CycleSource for &T {
    type Error = T::Error;

    fn load_cycles(&self, user: UserId) -> Result<Vec<CycleRecord>, Self::Error> {
        (**self).load_cycles(user)
    }
}

impl<T: PredictionSink + ?Sized> PredictionSink for &T {
    type Error = T::Error;

    fn store_prediction(&self, user: UserId, prediction: &StoredPrediction) -> Result<(), Self::Error> {
        (**self).store_prediction(user, prediction)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to load cycles for {user}: {source}")]
    Source {
        user: UserId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Fetches a user's cycles, forecasts, and records the forecast best-effort.
pub struct PredictionService<S, P> {
    source: S,
    sink: P,
    predictor: RegressionPredictor,
}

impl<S: CycleSource, P: PredictionSink> PredictionService<S, P> {
    pub fn new(source: S, sink: P, predictor: RegressionPredictor) -> Self {
        Self {
            source,
            sink,
            predictor,
        }
    }

    pub fn predictor(&self) -> &RegressionPredictor {
        &self.predictor
    }

    fn load(&self, user: UserId) -> Result<Vec<CycleRecord>, ServiceError> {
        self.source
            .load_cycles(user)
            .map_err(|e| ServiceError::Source {
                user,
                source: Box::new(e),
            })
    }

    pub fn predict_for(&self, user: UserId) -> Result<PredictionResult, ServiceError> {
        self.predict_for_at(user, chrono::Local::now().date_naive())
    }

    /// A failed store never hides a computed forecast.
    pub fn predict_for_at(&self, user: UserId, today: NaiveDate) -> Result<PredictionResult, ServiceError> {
        let cycles = self.load(user)?;
        let result = self.predictor.predict_at(&cycles, today);

        if let Some(stored) = StoredPrediction::from_result(&result) {
            match self.sink.store_prediction(user, &stored) {
                Ok(()) => debug!(%user, "prediction stored"),
                Err(err) => warn!(%user, error = %err, "failed to store prediction"),
            }
        }
        Ok(result)
    }

    pub fn stats_for(&self, user: UserId) -> Result<StatsSummary, ServiceError> {
        Ok(calculate_stats(&self.load(user)?))
    }
}

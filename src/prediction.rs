use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::confidence::confidence_breakdown;
use crate::models::{
    midnight_utc, CycleRecord, FertilityWindow, ModelEcho, NextPeriod, PredictionResult,
};
use crate::params::{
    ConfigError, ModelParameters, MAX_PERIOD_LENGTH, MIN_PERIOD_LENGTH, PREDICTOR_PERIOD_FALLBACK,
};
use crate::stats::{mean, round_half_up};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("Need at least {required} cycle(s) for predictions")]
    InsufficientCycles { required: usize },
    #[error("Need at least {required} valid cycle(s) for predictions")]
    InsufficientValidCycles { required: usize },
    #[error("Failed to generate prediction")]
    DateOutOfRange,
}

/// Applies the fixed linear model to a cycle history.
#[derive(Debug, Clone)]
pub struct RegressionPredictor {
    params: ModelParameters,
}

impl Default for RegressionPredictor {
    fn default() -> Self {
        Self::shipped()
    }
}

impl RegressionPredictor {
    pub fn new(params: ModelParameters) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn shipped() -> Self {
        Self {
            params: ModelParameters::shipped().clone(),
        }
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    /// Forecast relative to the local calendar date.
    pub fn predict(&self, cycles: &[CycleRecord]) -> PredictionResult {
        self.predict_at(cycles, chrono::Local::now().date_naive())
    }

    /// Forecast relative to `today`. Never fails; problems land in `error`.
    pub fn predict_at(&self, cycles: &[CycleRecord], today: NaiveDate) -> PredictionResult {
        match self.try_predict_at(cycles, today) {
            Ok(result) => result,
            Err(err) => {
                debug!(cycles = cycles.len(), error = %err, "no prediction");
                PredictionResult::failed(err.to_string())
            }
        }
    }

    pub fn try_predict_at(
        &self,
        cycles: &[CycleRecord],
        today: NaiveDate,
    ) -> Result<PredictionResult, PredictionError> {
        let required = self.params.requirements.min_cycles;
        if cycles.len() < required {
            return Err(PredictionError::InsufficientCycles { required });
        }

        let mut valid: Vec<(NaiveDate, i64, &CycleRecord)> = cycles
            .iter()
            .filter_map(|c| c.valid_cycle().map(|(start, len)| (start, len, c)))
            .collect();
        if valid.len() < required {
            return Err(PredictionError::InsufficientValidCycles { required });
        }
        valid.sort_by_key(|(start, _, _)| *start);

        let (last_start, previous_cycle, _) = *valid
            .last()
            .ok_or(PredictionError::InsufficientValidCycles { required })?;

        let cycle_lengths: Vec<f64> = valid.iter().map(|(_, len, _)| *len as f64).collect();
        let period_lengths: Vec<f64> = valid
            .iter()
            .map(|(_, _, c)| c.period_length_or(PREDICTOR_PERIOD_FALLBACK) as f64)
            .collect();

        let coefficients = &self.params.coefficients;
        let cycle_avg = mean(&cycle_lengths);
        let predicted_cycle_length = round_half_up(
            previous_cycle as f64 * coefficients.previous_cycle
                + cycle_avg * coefficients.cycle_avg
                + self.params.intercept,
        );
        let predicted_period_length = round_half_up(mean(&period_lengths));

        let cycle_length = self.params.bounds.clamp_cycle_length(predicted_cycle_length);
        let period_length = predicted_period_length.clamp(MIN_PERIOD_LENGTH, MAX_PERIOD_LENGTH);

        let start = next_start_after(last_start, cycle_length, today)?;
        let end = add_days(start, period_length - 1)?;

        let metrics = self.params.performance_metrics;
        let confidence = confidence_breakdown(valid.len(), &cycle_lengths, metrics.r2).blended;

        debug!(
            data_points = valid.len(),
            previous_cycle,
            cycle_avg,
            cycle_length,
            period_length,
            %start,
            confidence,
            "forecast computed"
        );

        Ok(PredictionResult {
            next_period: Some(NextPeriod {
                start: midnight_utc(start),
                end: midnight_utc(end),
                confidence,
            }),
            model: Some(ModelEcho {
                model_type: self.params.model_type.clone(),
                version: self.params.version.clone(),
                features: self.params.features.clone(),
                coefficients: coefficients.clone(),
                intercept: self.params.intercept,
                mae: metrics.mae,
                r2: metrics.r2,
                accuracy: confidence * 100.0,
                data_points: valid.len(),
                previous_cycle,
                cycle_avg,
            }),
            predicted_cycle_length: Some(cycle_length),
            predicted_period_length: Some(period_length),
            confidence,
            error: None,
        })
    }
}

/// First date `last_start + k * cycle_length` (k >= 1) strictly after `today`.
///
/// Jumps straight to the right multiple, so very old start dates cost nothing extra.
fn next_start_after(
    last_start: NaiveDate,
    cycle_length: i64,
    today: NaiveDate,
) -> Result<NaiveDate, PredictionError> {
    if cycle_length < 1 {
        return Err(PredictionError::DateOutOfRange);
    }
    let elapsed = (today - last_start).num_days();
    let steps = if elapsed < 0 { 1 } else { elapsed / cycle_length + 1 };
    let offset = steps
        .checked_mul(cycle_length)
        .ok_or(PredictionError::DateOutOfRange)?;
    add_days(last_start, offset)
}

fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate, PredictionError> {
    let days = u64::try_from(days).map_err(|_| PredictionError::DateOutOfRange)?;
    date.checked_add_days(Days::new(days))
        .ok_or(PredictionError::DateOutOfRange)
}

/// Estimate the fertility window from a successful forecast.
/// Ovulation ~14 days before next period. Fertile window = ovulation - 5 to ovulation day.
/// Peak fertility = ovulation - 2 to ovulation day.
pub fn fertility_window(prediction: &PredictionResult) -> Option<FertilityWindow> {
    let next_start = prediction.next_period.as_ref()?.start.date_naive();

    let ovulation_day = next_start.checked_sub_days(Days::new(14))?;
    Some(FertilityWindow {
        fertile_start: ovulation_day.checked_sub_days(Days::new(5))?,
        fertile_end: ovulation_day,
        ovulation_day,
        peak_start: ovulation_day.checked_sub_days(Days::new(2))?,
        peak_end: ovulation_day,
    })
}

//! Ordinary least squares over paired samples.
//!
//! Kept apart from the fixed-coefficient predictor; useful for re-fitting a
//! single feature against observed cycle lengths.

use serde::Serialize;

use crate::stats::mean;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination, clamped to `[0, 1]`.
    pub r2: f64,
}

impl LinearFit {
    /// Fit `y = slope * x + intercept`. `None` for empty or mismatched input.
    ///
    /// No variance in `x` gives a flat line through the mean of `y`; no
    /// variance in `y` gives `r2 = 0`.
    pub fn fit(x: &[f64], y: &[f64]) -> Option<Self> {
        if x.is_empty() || x.len() != y.len() {
            return None;
        }

        let x_mean = mean(x);
        let y_mean = mean(y);

        let (numerator, denominator) = x.iter().zip(y).fold((0.0, 0.0), |(num, den), (xi, yi)| {
            (num + (xi - x_mean) * (yi - y_mean), den + (xi - x_mean).powi(2))
        });

        let slope = if denominator == 0.0 { 0.0 } else { numerator / denominator };
        let intercept = y_mean - slope * x_mean;

        let (total, residual) = x.iter().zip(y).fold((0.0, 0.0), |(tot, res), (xi, yi)| {
            let predicted = slope * xi + intercept;
            (tot + (yi - y_mean).powi(2), res + (yi - predicted).powi(2))
        });
        let r2 = if total == 0.0 { 0.0 } else { 1.0 - residual / total };

        Some(Self {
            slope,
            intercept,
            r2: r2.clamp(0.0, 1.0),
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Mean of `|y - predict(x)|` over the paired samples; 0 when there are none.
    pub fn mean_absolute_error(&self, x: &[f64], y: &[f64]) -> f64 {
        let errors: Vec<f64> = x
            .iter()
            .zip(y)
            .map(|(xi, yi)| (yi - self.predict(*xi)).abs())
            .collect();
        mean(&errors)
    }
}

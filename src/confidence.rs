//! Heuristic confidence for a forecast. Not a probability.
//!
//! Three sub-scores in `[0, 1]` are blended with fixed weights and the result
//! is clamped to `[MIN_CONFIDENCE, MAX_CONFIDENCE]`:
//!
//! - data amount: valid cycle count over six, saturating
//! - model fit: the r2 from the offline training run
//! - consistency: one minus the coefficient of variation of the cycle lengths

use serde::Serialize;

use crate::stats::{mean, population_std_dev};

pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 0.95;

const SATURATING_CYCLE_COUNT: f64 = 6.0;
const DATA_AMOUNT_WEIGHT: f64 = 0.4;
const MODEL_FIT_WEIGHT: f64 = 0.4;
const CONSISTENCY_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    pub data_amount: f64,
    pub model_fit: f64,
    pub consistency: f64,
    pub blended: f64,
}

pub fn confidence_breakdown(valid_cycles: usize, cycle_lengths: &[f64], r2: f64) -> ConfidenceBreakdown {
    let data_amount = data_amount_score(valid_cycles);
    let consistency = consistency_score(cycle_lengths);
    let blended = data_amount * DATA_AMOUNT_WEIGHT
        + r2 * MODEL_FIT_WEIGHT
        + consistency * CONSISTENCY_WEIGHT;

    ConfidenceBreakdown {
        data_amount,
        model_fit: r2,
        consistency,
        blended: blended.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE),
    }
}

pub fn data_amount_score(valid_cycles: usize) -> f64 {
    (valid_cycles as f64 / SATURATING_CYCLE_COUNT).min(1.0)
}

/// `max(0, 1 - cv)`; a zero mean counts as the worst case (cv = 1).
pub fn consistency_score(cycle_lengths: &[f64]) -> f64 {
    let avg = mean(cycle_lengths);
    let cv = if avg == 0.0 {
        1.0
    } else {
        population_std_dev(cycle_lengths) / avg
    };
    (1.0 - cv).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn data_amount_saturates_at_six() {
        assert!(approx(data_amount_score(3), 0.5));
        assert_eq!(data_amount_score(6), 1.0);
        assert_eq!(data_amount_score(40), 1.0);
        assert_eq!(data_amount_score(0), 0.0);
    }

    #[test]
    fn identical_lengths_are_fully_consistent() {
        assert_eq!(consistency_score(&[28.0, 28.0, 28.0]), 1.0);
    }

    #[test]
    fn varied_lengths_reduce_consistency() {
        let varied = consistency_score(&[28.0, 30.0, 26.0]);
        assert!(varied < 1.0);
        assert!(approx(varied, 1.0 - (8.0f64 / 3.0).sqrt() / 28.0));
    }

    #[test]
    fn zero_mean_is_worst_case() {
        assert_eq!(consistency_score(&[0.0, 0.0]), 0.0);
        assert_eq!(consistency_score(&[]), 0.0);
    }

    #[test]
    fn blends_with_fixed_weights() {
        let b = confidence_breakdown(3, &[28.0, 28.0, 28.0], 0.64);
        assert!(approx(b.blended, 0.5 * 0.4 + 0.64 * 0.4 + 1.0 * 0.2));
        assert_eq!(b.model_fit, 0.64);
    }

    #[test]
    fn blend_is_clamped() {
        let high = confidence_breakdown(12, &[28.0; 12], 1.0);
        assert_eq!(high.blended, MAX_CONFIDENCE);
        let low = confidence_breakdown(0, &[], 0.0);
        assert_eq!(low.blended, MIN_CONFIDENCE);
    }
}

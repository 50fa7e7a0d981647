use crate::models::{midnight_utc, CycleRecord, StatsSummary};
use crate::params::STATS_PERIOD_FALLBACK;

/// Summarize the records that carry a positive cycle length.
/// Never fails; with nothing usable it returns [`StatsSummary::default`].
pub fn calculate_stats(cycles: &[CycleRecord]) -> StatsSummary {
    let valid: Vec<(&CycleRecord, i64)> = cycles
        .iter()
        .filter_map(|c| c.positive_cycle_length().map(|len| (c, len)))
        .collect();

    if valid.is_empty() {
        return StatsSummary::default();
    }

    let cycle_lengths: Vec<f64> = valid.iter().map(|(_, len)| *len as f64).collect();
    let period_lengths: Vec<f64> = valid
        .iter()
        .map(|(c, _)| c.period_length_or(STATS_PERIOD_FALLBACK) as f64)
        .collect();

    let lengths = valid.iter().map(|(_, len)| *len);
    let starts = valid.iter().filter_map(|(c, _)| c.start_date);

    StatsSummary {
        total_cycles: valid.len(),
        avg_cycle_length: round_to_tenth(mean(&cycle_lengths)),
        avg_period_length: round_to_tenth(mean(&period_lengths)),
        min_cycle_length: lengths.clone().min().unwrap_or_default(),
        max_cycle_length: lengths.max().unwrap_or_default(),
        first_cycle_date: starts.clone().min().map(midnight_utc),
        last_cycle_date: starts.max().map(midnight_utc),
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation over the whole population (divides by N).
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Nearest integer, halves rounded up (towards positive infinity).
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_cycle(start: &str, cycle_length: Option<i64>) -> CycleRecord {
        CycleRecord::new(date(start), cycle_length)
    }

    #[test]
    fn empty_input_gives_canonical_default() {
        assert_eq!(calculate_stats(&[]), StatsSummary::default());
    }

    #[test]
    fn only_invalid_records_give_default() {
        let cycles = vec![
            make_cycle("2026-01-01", None),
            make_cycle("2026-01-29", Some(0)),
            make_cycle("2026-02-26", Some(-4)),
        ];
        assert_eq!(calculate_stats(&cycles), StatsSummary::default());
    }

    #[test]
    fn summarizes_valid_cycles() {
        let cycles = vec![
            make_cycle("2026-01-01", Some(28)).with_period_length(5),
            make_cycle("2026-01-29", Some(30)).with_period_length(6),
            make_cycle("2026-02-28", Some(26)),
        ];
        let stats = calculate_stats(&cycles);
        assert_eq!(stats.total_cycles, 3);
        assert_eq!(stats.avg_cycle_length, 28.0);
        assert_eq!(stats.min_cycle_length, 26);
        assert_eq!(stats.max_cycle_length, 30);
        // 5, 6 and the fallback 4
        assert_eq!(stats.avg_period_length, 5.0);
        assert_eq!(stats.first_cycle_date, Some(midnight_utc(date("2026-01-01"))));
        assert_eq!(stats.last_cycle_date, Some(midnight_utc(date("2026-02-28"))));
    }

    #[test]
    fn dates_come_from_valid_records_regardless_of_order() {
        let cycles = vec![
            make_cycle("2026-03-01", Some(29)),
            make_cycle("2025-12-01", None),
            make_cycle("2026-01-15", Some(27)),
        ];
        let stats = calculate_stats(&cycles);
        assert_eq!(stats.total_cycles, 2);
        assert_eq!(stats.first_cycle_date, Some(midnight_utc(date("2026-01-15"))));
        assert_eq!(stats.last_cycle_date, Some(midnight_utc(date("2026-03-01"))));
    }

    #[test]
    fn undated_rows_count_but_do_not_move_dates() {
        let json = r#"[
            {"startDate": "2026-01-01", "cycleLength": 28},
            {"startDate": "garbage", "cycleLength": 30},
            {"startDate": "2026-01-29", "cycleLength": "n/a"},
            {"startDate": "2026-02-28", "cycleLength": 26}
        ]"#;
        let cycles: Vec<CycleRecord> = serde_json::from_str(json).unwrap();
        let stats = calculate_stats(&cycles);
        assert_eq!(stats.total_cycles, 3);
        assert_eq!(stats.avg_cycle_length, 28.0);
        assert_eq!(stats.max_cycle_length, 30);
        assert_eq!(stats.first_cycle_date, Some(midnight_utc(date("2026-01-01"))));
        assert_eq!(stats.last_cycle_date, Some(midnight_utc(date("2026-02-28"))));
    }

    #[test]
    fn averages_round_to_one_decimal() {
        let cycles = vec![
            make_cycle("2026-01-01", Some(28)),
            make_cycle("2026-01-29", Some(29)),
            make_cycle("2026-02-27", Some(29)),
        ];
        assert_eq!(calculate_stats(&cycles).avg_cycle_length, 28.7);
    }

    #[test]
    fn population_std_dev_divides_by_n() {
        let sd = population_std_dev(&[28.0, 30.0, 26.0]);
        assert!((sd - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(population_std_dev(&[]), 0.0);
        assert_eq!(population_std_dev(&[31.0]), 0.0);
    }

    #[test]
    fn rounds_halves_up() {
        assert_eq!(round_half_up(27.5), 28);
        assert_eq!(round_half_up(27.49), 27);
        assert_eq!(round_half_up(-2.5), -2);
    }
}

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::params::Coefficients;

/// Whose cycles are being read or written. Always passed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One logged cycle as handed over by the persistence layer.
///
/// Fields the persistence layer got wrong (an unparseable date, a fractional
/// or non-numeric length) deserialize to `None` so the record is skipped
/// rather than failing the whole history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default, with = "lenient::date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "lenient::date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::days")]
    pub cycle_length: Option<i64>,
    #[serde(default, deserialize_with = "lenient::days")]
    pub period_length: Option<i64>,
}

impl CycleRecord {
    pub fn new(start_date: NaiveDate, cycle_length: Option<i64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_date: Some(start_date),
            end_date: None,
            cycle_length,
            period_length: None,
        }
    }

    /// Record built from a bleeding span; the period length is `end - start + 1`.
    pub fn from_period(start_date: NaiveDate, end_date: NaiveDate, cycle_length: Option<i64>) -> Self {
        let period_length = (end_date - start_date).num_days() + 1;
        Self {
            id: Uuid::new_v4(),
            start_date: Some(start_date),
            end_date: Some(end_date),
            cycle_length,
            period_length: (period_length > 0).then_some(period_length),
        }
    }

    pub fn with_period_length(mut self, period_length: i64) -> Self {
        self.period_length = Some(period_length);
        self
    }

    /// Cycle length when it is a positive number of days.
    pub fn positive_cycle_length(&self) -> Option<i64> {
        self.cycle_length.filter(|len| *len > 0)
    }

    /// Start date and cycle length of a record usable for prediction:
    /// it needs both a start date and a positive cycle length.
    pub fn valid_cycle(&self) -> Option<(NaiveDate, i64)> {
        Some((self.start_date?, self.positive_cycle_length()?))
    }

    /// Explicit period length, else the span of the logged dates, else `fallback`.
    pub fn period_length_or(&self, fallback: i64) -> i64 {
        if let Some(len) = self.period_length.filter(|len| *len > 0) {
            return len;
        }
        self.start_date
            .zip(self.end_date)
            .map(|(start, end)| (end - start).num_days() + 1)
            .filter(|len| *len > 0)
            .unwrap_or(fallback)
    }
}

/// Sort records by start date and derive missing cycle lengths from the gap
/// to the following record. The most recent record keeps whatever it had.
/// Records without a start date sort first and are left alone.
pub fn fill_cycle_lengths(records: &mut [CycleRecord]) {
    records.sort_by_key(|r| r.start_date);
    for i in 1..records.len() {
        let next_start = records[i].start_date;
        let record = &mut records[i - 1];
        if record.positive_cycle_length().is_some() {
            continue;
        }
        if let Some((start, next)) = record.start_date.zip(next_start) {
            let gap = (next - start).num_days();
            if gap > 0 {
                record.cycle_length = Some(gap);
            }
        }
    }
}

/// Summary statistics for display, or as a fallback when no forecast exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_cycles: usize,
    pub avg_cycle_length: f64,
    pub avg_period_length: f64,
    pub min_cycle_length: i64,
    pub max_cycle_length: i64,
    pub first_cycle_date: Option<DateTime<Utc>>,
    pub last_cycle_date: Option<DateTime<Utc>>,
}

impl Default for StatsSummary {
    fn default() -> Self {
        Self {
            total_cycles: 0,
            avg_cycle_length: 28.0,
            avg_period_length: 4.0,
            min_cycle_length: 28,
            max_cycle_length: 28,
            first_cycle_date: None,
            last_cycle_date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NextPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub confidence: f64,
}

/// Echo of the model and the inputs derived from the history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelEcho {
    #[serde(rename = "type")]
    pub model_type: String,
    pub version: String,
    pub features: Vec<String>,
    pub coefficients: Coefficients,
    pub intercept: f64,
    pub mae: f64,
    #[serde(rename = "r2Score")]
    pub r2: f64,
    pub accuracy: f64,
    pub data_points: usize,
    pub previous_cycle: i64,
    pub cycle_avg: f64,
}

/// Outcome of a prediction call. On failure only `confidence` (0) and `error` are meaningful.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub next_period: Option<NextPeriod>,
    pub model: Option<ModelEcho>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_cycle_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_period_length: Option<i64>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            next_period: None,
            model: None,
            predicted_cycle_length: None,
            predicted_period_length: None,
            confidence: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.next_period.is_some()
    }
}

/// The part of a prediction that gets persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredPrediction {
    pub next_period: NextPeriod,
    pub model: ModelEcho,
}

impl StoredPrediction {
    pub fn from_result(result: &PredictionResult) -> Option<Self> {
        if result.error.is_some() {
            return None;
        }
        Some(Self {
            next_period: result.next_period.clone()?,
            model: result.model.clone()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FertilityWindow {
    pub fertile_start: NaiveDate,
    pub fertile_end: NaiveDate,
    pub ovulation_day: NaiveDate,
    pub peak_start: NaiveDate,
    pub peak_end: NaiveDate,
}

/// Where today falls in the current cycle, for calendar views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleDayProjection {
    pub cycle_start: NaiveDate,
    pub next_period_start: NaiveDate,
    pub current_day_of_cycle: i64,
    pub days_until_next_period: i64,
    pub period_days: Vec<NaiveDate>,
    pub ovulation_day: NaiveDate,
    pub fertile_days: Vec<NaiveDate>,
}

/// Everything kept on disk for one user.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub cycles: Vec<CycleRecord>,
    #[serde(default)]
    pub latest_prediction: Option<StoredPrediction>,
}

pub(crate) fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Field codecs that turn malformed values into `None` instead of an error.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Dates travel as `YYYY-MM-DD`; full RFC 3339 instants are accepted on input.
    pub mod date {
        use chrono::{DateTime, NaiveDate, Utc};
        use serde::Serializer;

        use super::*;

        const FORMAT: &str = "%Y-%m-%d";

        pub fn parse(raw: &str) -> Option<NaiveDate> {
            let raw = raw.trim();
            NaiveDate::parse_from_str(raw, FORMAT).ok().or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|instant| instant.with_timezone(&Utc).date_naive())
            })
        }

        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => serializer.serialize_some(&date.format(FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            Ok(match Value::deserialize(deserializer)? {
                Value::String(raw) => parse(&raw),
                _ => None,
            })
        }
    }

    /// Whole days. Integral floats are accepted; anything else is `None`.
    pub fn days<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            _ => None,
        })
    }
}

//! Store-backed forecasting, from API-shaped JSON through to the persisted prediction.

use chrono::NaiveDate;
use cykel_forecast::crypto::KdfCost;
use cykel_forecast::{
    calculate_stats, fertility_window, CycleRecord, EncryptedStore, PredictionService,
    RegressionPredictor, UserId,
};

const FAST_KDF: KdfCost = KdfCost {
    memory_kib: 1024,
    iterations: 1,
    parallelism: 1,
};

const CYCLES_JSON: &str = r#"[
    { "startDate": "2026-02-26T00:00:00.000Z", "endDate": "2026-03-02T00:00:00.000Z", "cycleLength": 26, "periodLength": 5 },
    { "startDate": "2026-01-01", "endDate": "2026-01-05", "cycleLength": 28 },
    { "startDate": "2026-01-29", "cycleLength": 30, "periodLength": 4 },
    { "startDate": "2026-03-24" }
]"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("cykel_forecast=debug")
        .with_test_writer()
        .try_init();
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn forecast_is_computed_and_persisted() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = EncryptedStore::at(dir.path(), "correct horse").with_kdf_cost(FAST_KDF);
    let user = UserId::new();

    let cycles: Vec<CycleRecord> = serde_json::from_str(CYCLES_JSON).unwrap();
    store.save_cycles(user, cycles).unwrap();

    let service = PredictionService::new(&store, &store, RegressionPredictor::shipped());
    let today = date("2026-04-01");
    let result = service.predict_for_at(user, today).unwrap();

    assert!(result.is_success());
    let model = result.model.as_ref().unwrap();
    assert_eq!(model.data_points, 3);
    assert_eq!(model.previous_cycle, 26);
    assert_eq!(model.cycle_avg, 28.0);
    // 26 * 0.2841 + 28 * 0.6873 + 0.8123 = 27.4433
    assert_eq!(result.predicted_cycle_length, Some(27));
    // explicit 5 and 4, plus 5 derived from the logged dates
    assert_eq!(result.predicted_period_length, Some(5));

    let next = result.next_period.as_ref().unwrap();
    assert_eq!(next.start.date_naive(), date("2026-04-21"));
    assert_eq!(next.end.date_naive(), date("2026-04-25"));

    let persisted = store.load(user).unwrap().latest_prediction.unwrap();
    assert_eq!(&persisted.next_period, next);
    assert_eq!(&persisted.model, model);

    let window = fertility_window(&result).unwrap();
    assert_eq!(window.ovulation_day, date("2026-04-07"));
}

#[test]
fn stats_ignore_records_without_cycle_length() {
    let cycles: Vec<CycleRecord> = serde_json::from_str(CYCLES_JSON).unwrap();
    let stats = calculate_stats(&cycles);

    assert_eq!(stats.total_cycles, 3);
    assert_eq!(stats.avg_cycle_length, 28.0);
    assert_eq!(stats.min_cycle_length, 26);
    assert_eq!(stats.max_cycle_length, 30);
    assert_eq!(stats.last_cycle_date.unwrap().date_naive(), date("2026-02-26"));

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["lastCycleDate"], "2026-02-26T00:00:00Z");
}

#[test]
fn unreadable_store_surfaces_as_service_error() {
    let dir = tempfile::tempdir().unwrap();
    let user = UserId::new();
    EncryptedStore::at(dir.path(), "right")
        .with_kdf_cost(FAST_KDF)
        .save_cycles(user, Vec::new())
        .unwrap();

    let wrong = EncryptedStore::at(dir.path(), "wrong").with_kdf_cost(FAST_KDF);
    let service = PredictionService::new(&wrong, &wrong, RegressionPredictor::shipped());
    assert!(service.predict_for_at(user, date("2026-04-01")).is_err());
}

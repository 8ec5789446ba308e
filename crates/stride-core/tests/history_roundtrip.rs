//! Run history persisted through SQLite on disk.

use chrono::{Duration, TimeZone, Utc};
use stride_core::{stats, Database, LocationSample, RunHistoryStore, RunRecord, StorageError};

fn record(id: &str, day: u32) -> RunRecord {
    let start = Utc.with_ymd_and_hms(2024, 5, day, 7, 30, 0).unwrap();
    RunRecord {
        id: id.to_string(),
        start_time: start,
        end_time: start + Duration::seconds(1_500),
        distance_meters: 5_012.5,
        duration_seconds: 1_500,
        average_speed_meters_per_second: 5_012.5 / 1_500.0,
        samples: vec![
            LocationSample::new(48.8566, 2.3522, Some(35.0), Some(3.1), 0).unwrap(),
            LocationSample::new(48.8576, 2.3532, None, None, 1_000).unwrap(),
        ],
        max_speed_meters_per_second: 3.1,
        estimated_calories: 326,
    }
}

#[test]
fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stride.db");
    let first = record("a", 1);
    let second = record("b", 2);

    {
        let store = RunHistoryStore::new(Box::new(Database::open_at(&path).unwrap()));
        store.append(&first).unwrap();
        store.append(&second).unwrap();
    }

    let store = RunHistoryStore::new(Box::new(Database::open_at(&path).unwrap()));
    assert_eq!(store.load().unwrap(), vec![first, second]);
}

#[test]
fn delete_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stride.db");
    {
        let store = RunHistoryStore::new(Box::new(Database::open_at(&path).unwrap()));
        store.append(&record("a", 1)).unwrap();
        store.append(&record("b", 2)).unwrap();
        store.delete("a").unwrap();
    }

    let store = RunHistoryStore::new(Box::new(Database::open_at(&path).unwrap()));
    let ids: Vec<String> = store.load().unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["b"]);
    assert!(matches!(store.delete("a"), Err(StorageError::RunNotFound(_))));
}

#[test]
fn records_written_before_extra_fields_still_load() {
    let db = Database::open_memory().unwrap();
    db.kv_set(
        "run_history",
        r#"[{
            "id": "legacy",
            "startTime": "2024-05-01T07:30:00Z",
            "endTime": "2024-05-01T07:55:00Z",
            "distanceMeters": 4000.0,
            "durationSeconds": 1500,
            "averageSpeedMetersPerSecond": 2.6666666666666665,
            "samples": [{"latitude": 48.8566, "longitude": 2.3522, "timestamp": 0}]
        }]"#,
    )
    .unwrap();

    let records = RunHistoryStore::new(Box::new(db)).load().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].estimated_calories, 0);
    assert_eq!(records[0].max_speed_meters_per_second, 0.0);
    assert_eq!(records[0].samples[0].altitude(), None);
}

#[test]
fn off_globe_stored_sample_is_rejected() {
    let db = Database::open_memory().unwrap();
    db.kv_set(
        "run_history",
        r#"[{
            "id": "corrupt",
            "startTime": "2024-05-01T07:30:00Z",
            "endTime": "2024-05-01T07:55:00Z",
            "distanceMeters": 0.0,
            "durationSeconds": 0,
            "averageSpeedMetersPerSecond": 0.0,
            "samples": [{"latitude": 500.0, "longitude": -999.0, "timestamp": 0}]
        }]"#,
    )
    .unwrap();

    let store = RunHistoryStore::new(Box::new(db));
    assert!(matches!(store.load(), Err(StorageError::Serialization(_))));
}

#[test]
fn stats_over_stored_history() {
    let db = Database::open_memory().unwrap();
    let store = RunHistoryStore::new(Box::new(db));
    store.append(&record("a", 1)).unwrap();
    store.append(&record("b", 20)).unwrap();

    let records = store.load().unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 21, 0, 0, 0).unwrap();
    let week = stats::last_days(&records, 7, now);
    assert_eq!(week.runs, 1);
    assert_eq!(week.duration_seconds, 1_500);
    assert_eq!(stats::summarize(&records, None).runs, 2);
}

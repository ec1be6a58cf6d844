mod common;

use chrono::Utc;
use co2track::authoritative::AuthoritativeCell;
use co2track::co2_tracker::{Co2Tracker, SummarySource, Thresholds};
use co2track::fallback_store::{FallbackStore, MemoryStore};
use co2track::position_sources::{PositionSource, ReplayPositionSource};
use co2track::runner::Runner;
use common::{aircraft, snapshot, write_replay};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[tokio::test]
async fn test_replay_accrues_movement_and_rejects_jump() {
    let replay = write_replay(&[
        snapshot(100.0, vec![aircraft("A1B2C3", 0.0, 0.0, Some("B738"))]),
        snapshot(105.0, vec![aircraft("A1B2C3", 0.1, 0.0, Some("B738"))]),
        // Same fix re-delivered
        snapshot(105.0, vec![aircraft("A1B2C3", 0.1, 0.0, Some("B738"))]),
        snapshot(110.0, vec![aircraft("A1B2C3", 50.0, 50.0, Some("B738"))]),
    ]);

    let mut source = ReplayPositionSource::from_file(replay.path()).await.unwrap();
    let mut tracker = Co2Tracker::new(Thresholds::default());

    while let Some(batch) = source.next_batch().await.unwrap() {
        tracker.process_cycle(&batch, Utc::now());
    }
    assert_eq!(source.batches_read(), 4);

    let track = tracker.track("a1b2c3").expect("track keyed by lowercase hex");
    assert!((track.distance_km - 11.12).abs() < 0.01);
    assert!((track.co2_kg - 111.2).abs() < 0.1);
    assert_eq!(track.last_position, Some((50.0, 50.0)));

    let session = tracker.session();
    assert_eq!(session.count, 1);
    assert!((session.distance_km - track.distance_km).abs() < 1e-9);
    assert!((session.co2_kg - track.co2_kg).abs() < 1e-9);
}

#[tokio::test]
async fn test_unknown_type_accrues_distance_only() {
    let replay = write_replay(&[
        snapshot(0.0, vec![aircraft("abc001", 10.0, 10.0, Some("ZZZZ"))]),
        snapshot(5.0, vec![aircraft("abc001", 10.0, 10.05, Some("ZZZZ"))]),
    ]);

    let mut source = ReplayPositionSource::from_file(replay.path()).await.unwrap();
    let mut tracker = Co2Tracker::new(Thresholds::default());
    while let Some(batch) = source.next_batch().await.unwrap() {
        tracker.process_cycle(&batch, Utc::now());
    }

    let selection = tracker.selection("abc001").unwrap();
    assert!(selection.distance_km > 5.0);
    assert_eq!(selection.co2_kg, 0.0);
    assert!(selection.factor.is_none());
}

#[tokio::test]
async fn test_runner_flushes_replayed_session_on_top_of_persisted_totals() {
    let replay = write_replay(&[
        snapshot(0.0, vec![
            aircraft("aaa001", 0.0, 0.0, Some("B738")),
            aircraft("aaa002", 1.0, 1.0, Some("A320")),
        ]),
        snapshot(5.0, vec![
            aircraft("aaa001", 0.0, 0.1, Some("B738")),
            aircraft("aaa002", 1.0, 1.0, Some("A320")),
        ]),
    ]);

    let store = Arc::new(MemoryStore::with_raw(
        r#"{"version":2,"co2Kg":500.0,"distKm":50.0,"count":3}"#,
    ));
    let persisted = store.load();
    let tracker = Arc::new(Mutex::new(Co2Tracker::new(Thresholds::default())));
    let authoritative = AuthoritativeCell::new();

    let source = ReplayPositionSource::from_file(replay.path()).await.unwrap();
    let report = Runner::new(
        source,
        Arc::clone(&tracker),
        authoritative.clone(),
        store.clone(),
        persisted,
    )
    .with_periods(Duration::from_millis(5), Duration::from_secs(60))
    .run_until(std::future::pending())
    .await;

    assert_eq!(report.cycles, 2);
    assert_eq!(report.session.count, 2);

    let saved = store.load();
    assert_eq!(saved.count, 5);
    assert!((saved.distance_km - (50.0 + report.session.distance_km)).abs() < 1e-9);
    assert!((saved.co2_kg - (500.0 + report.session.co2_kg)).abs() < 1e-9);

    // No authoritative source: reported totals are the local fallback
    let summary = tracker
        .lock()
        .await
        .summary(&persisted, &authoritative.snapshot().await);
    assert_eq!(summary.source, SummarySource::LocalFallback);
    assert_eq!(summary.all_time_count, 5);
    assert!((summary.all_time_distance_km - saved.distance_km).abs() < 1e-9);
    assert!((summary.all_time_co2_kg - saved.co2_kg).abs() < 1e-9);
}

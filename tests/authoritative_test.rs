mod common;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use co2track::authoritative::{AuthoritativeCell, AuthoritativeClient};
use co2track::co2_tracker::{PersistedAggregate, SessionAggregate, SummarySource, reconcile};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const DOCUMENT: &str = r#"{"co2Kg":123456.7,"distKm":45678.9,"count":4321,
    "since":"2025-01-01T00:00:00Z","updated":"2025-06-01T12:00:00Z"}"#;

#[derive(Clone, Copy, Debug)]
enum Mode {
    Ok,
    ServerError,
    Malformed,
    Slow,
}

#[derive(Clone)]
struct Upstream {
    mode: Arc<Mutex<Mode>>,
    cache_busters: Arc<Mutex<Vec<String>>>,
}

async fn co2data(
    State(upstream): State<Upstream>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if let Some(value) = params.get("_") {
        upstream.cache_busters.lock().await.push(value.clone());
    }
    let mode = *upstream.mode.lock().await;
    match mode {
        Mode::Ok => (StatusCode::OK, DOCUMENT.to_string()),
        Mode::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
        Mode::Malformed => (StatusCode::OK, "{\"co2Kg\": ".to_string()),
        Mode::Slow => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, DOCUMENT.to_string())
        }
    }
}

async fn start_upstream(mode: Mode) -> (Upstream, AuthoritativeClient) {
    let upstream = Upstream {
        mode: Arc::new(Mutex::new(mode)),
        cache_busters: Arc::new(Mutex::new(Vec::new())),
    };
    let router = Router::new()
        .route("/co2data.json", get(co2data))
        .with_state(upstream.clone());
    let addr = common::spawn_server(router).await;

    let client = AuthoritativeClient::new(
        reqwest::Client::new(),
        format!("http://{}/co2data.json", addr),
        Duration::from_millis(300),
    );
    (upstream, client)
}

fn session() -> SessionAggregate {
    SessionAggregate {
        distance_km: 12.5,
        co2_kg: 125.0,
        count: 2,
    }
}

fn persisted() -> PersistedAggregate {
    PersistedAggregate {
        distance_km: 1000.0,
        co2_kg: 9000.0,
        count: 40,
    }
}

#[tokio::test]
async fn test_fetch_parses_document_and_sends_cache_buster() {
    let (upstream, client) = start_upstream(Mode::Ok).await;

    let aggregate = client.fetch().await.unwrap();
    assert!((aggregate.co2_kg - 123456.7).abs() < 1e-6);
    assert!((aggregate.dist_km - 45678.9).abs() < 1e-6);
    assert_eq!(aggregate.count, 4321);
    assert_eq!(aggregate.since.as_deref(), Some("2025-01-01T00:00:00Z"));

    client.fetch().await.unwrap();
    let busters = upstream.cache_busters.lock().await;
    assert_eq!(busters.len(), 2);
    assert!(busters.iter().all(|b| b.parse::<i64>().is_ok()));
}

#[tokio::test]
async fn test_authoritative_totals_reported_verbatim() {
    let (_upstream, client) = start_upstream(Mode::Ok).await;
    let cell = AuthoritativeCell::new();
    cell.refresh(&client).await;

    let summary = reconcile(&session(), &persisted(), &cell.snapshot().await);
    assert_eq!(summary.source, SummarySource::Authoritative);
    assert!((summary.all_time_co2_kg - 123456.7).abs() < 1e-6);
    assert!((summary.all_time_distance_km - 45678.9).abs() < 1e-6);
    assert_eq!(summary.all_time_count, 4321);
    assert_eq!(summary.updated.as_deref(), Some("2025-06-01T12:00:00Z"));
}

#[tokio::test]
async fn test_each_failure_mode_falls_back_to_local_totals() {
    for failure in [Mode::ServerError, Mode::Malformed, Mode::Slow] {
        let (upstream, client) = start_upstream(Mode::Ok).await;
        let cell = AuthoritativeCell::new();
        cell.refresh(&client).await;
        assert!(cell.snapshot().await.available, "{:?}", failure);

        *upstream.mode.lock().await = failure;
        cell.refresh(&client).await;

        let snapshot = cell.snapshot().await;
        assert!(!snapshot.available, "{:?}", failure);
        assert_eq!(snapshot.consecutive_failures, 1);
        // Last value is kept but no longer reported
        assert_eq!(snapshot.value.as_ref().map(|v| v.count), Some(4321));

        let summary = reconcile(&session(), &persisted(), &snapshot);
        assert_eq!(summary.source, SummarySource::LocalFallback, "{:?}", failure);
        assert_eq!(summary.all_time_distance_km, 1012.5);
        assert_eq!(summary.all_time_co2_kg, 9125.0);
        assert_eq!(summary.all_time_count, 42);
        assert!(summary.updated.is_none());
    }
}

#[tokio::test]
async fn test_recovers_after_outage() {
    let (upstream, client) = start_upstream(Mode::ServerError).await;
    let cell = AuthoritativeCell::new();

    cell.refresh(&client).await;
    cell.refresh(&client).await;
    assert_eq!(cell.snapshot().await.consecutive_failures, 2);

    *upstream.mode.lock().await = Mode::Ok;
    cell.refresh(&client).await;

    let snapshot = cell.snapshot().await;
    assert!(snapshot.available);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert!(snapshot.last_success_at.is_some());
}

#[tokio::test]
async fn test_background_refresh_populates_cell() {
    let (_upstream, client) = start_upstream(Mode::Ok).await;
    let cell = AuthoritativeCell::new();
    cell.start_refresh(client, 60);

    for _ in 0..50 {
        if cell.snapshot().await.available {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(cell.snapshot().await.available);
}

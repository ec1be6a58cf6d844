//! Read-only HTTP view of the running tracker
//!
//! - `GET /summary` - all-time totals, session totals and display strings
//! - `GET /aircraft/{hex}` - one tracked aircraft, 404 when not tracked

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;

use crate::authoritative::AuthoritativeCell;
use crate::co2_tracker::{
    Co2Tracker, PersistedAggregate, ReportedSummary, SelectionView, SessionAggregate,
};
use crate::format::{format_co2, format_distance, format_factor, format_source};

/// Everything the handlers read
#[derive(Clone)]
pub struct StatusState {
    pub tracker: Arc<Mutex<Co2Tracker>>,
    pub authoritative: AuthoritativeCell,
    /// Totals loaded from the fallback store at startup
    pub persisted: PersistedAggregate,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub all_time: ReportedSummary,
    pub session: SessionAggregate,
    pub tracked_aircraft: usize,
    pub display: SummaryDisplay,
}

#[derive(Debug, Serialize)]
pub struct SummaryDisplay {
    pub co2: String,
    pub distance: String,
    pub count: String,
    pub source: String,
    pub session_co2: String,
    pub session_distance: String,
}

#[derive(Debug, Serialize)]
pub struct AircraftResponse {
    #[serde(flatten)]
    pub selection: SelectionView,
    pub display: AircraftDisplay,
}

#[derive(Debug, Serialize)]
pub struct AircraftDisplay {
    /// `Unknown type` when no factor resolves or nothing has accrued yet
    pub co2: String,
    pub distance: String,
    /// `—` under the same condition as `co2`
    pub factor: String,
}

const UNKNOWN_TYPE_CO2: &str = "Unknown type";
const UNKNOWN_FACTOR: &str = "—";

pub async fn get_summary(State(state): State<StatusState>) -> impl IntoResponse {
    let (session, tracked_aircraft) = {
        let tracker = state.tracker.lock().await;
        (tracker.session(), tracker.tracked_aircraft_count())
    };
    let authoritative = state.authoritative.snapshot().await;
    let all_time = crate::co2_tracker::reconcile(&session, &state.persisted, &authoritative);

    let display = SummaryDisplay {
        co2: format_co2(all_time.all_time_co2_kg),
        distance: format_distance(all_time.all_time_distance_km),
        count: all_time.all_time_count.to_string(),
        source: format_source(&all_time, Utc::now()),
        session_co2: format_co2(session.co2_kg),
        session_distance: format_distance(session.distance_km),
    };

    Json(SummaryResponse {
        all_time,
        session,
        tracked_aircraft,
        display,
    })
}

pub async fn get_aircraft(
    State(state): State<StatusState>,
    Path(hex): Path<String>,
) -> impl IntoResponse {
    let hex = hex.trim().to_lowercase();
    let selection = state.tracker.lock().await.selection(&hex);

    match selection {
        Some(selection) => {
            let (co2, factor) = match &selection.factor {
                Some(factor) if selection.co2_kg > 0.0 => {
                    (format_co2(selection.co2_kg), format_factor(factor))
                }
                _ => (UNKNOWN_TYPE_CO2.to_string(), UNKNOWN_FACTOR.to_string()),
            };
            let display = AircraftDisplay {
                co2,
                distance: format_distance(selection.distance_km),
                factor,
            };
            Json(AircraftResponse { selection, display }).into_response()
        }
        None => (StatusCode::NOT_FOUND, "not tracked").into_response(),
    }
}

pub fn router(state: StatusState) -> Router {
    Router::new()
        .route("/summary", get(get_summary))
        .route("/aircraft/{hex}", get(get_aircraft))
        .with_state(state)
}

/// Serve on an already-bound listener until it fails
pub async fn serve(listener: TcpListener, state: StatusState) -> Result<()> {
    axum::serve(listener, router(state))
        .await
        .context("Status server failed")
}

/// Bind `addr` and serve
pub async fn start_status_server(addr: SocketAddr, state: StatusState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind status server on {}", addr))?;
    info!("Status server listening on http://{}", addr);
    serve(listener, state).await
}

//! Shared helpers for integration tests
//!
//! - [`spawn_server`] serves an axum router on an ephemeral localhost port
//! - [`snapshot`] / [`write_replay`] build readsb `aircraft.json` replay files

#![allow(dead_code)]

use axum::Router;
use serde_json::{Value, json};
use std::io::Write;
use std::net::SocketAddr;
use tempfile::NamedTempFile;

/// Serve `router` on 127.0.0.1 with an OS-assigned port; returns the address
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    addr
}

/// One aircraft entry with a fresh position
pub fn aircraft(hex: &str, lat: f64, lon: f64, type_code: Option<&str>) -> Value {
    let mut entry = json!({
        "hex": hex,
        "lat": lat,
        "lon": lon,
        "seen_pos": 0.0,
        "seen": 0.0,
    });
    if let Some(type_code) = type_code {
        entry["t"] = json!(type_code);
    }
    entry
}

/// An `aircraft.json` snapshot taken at receiver time `now`
pub fn snapshot(now: f64, aircraft: Vec<Value>) -> Value {
    json!({ "now": now, "messages": 0, "aircraft": aircraft })
}

/// Write snapshots one per line
pub fn write_replay(snapshots: &[Value]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create replay file");
    for snapshot in snapshots {
        writeln!(file, "{}", snapshot).expect("Failed to write replay line");
    }
    file
}

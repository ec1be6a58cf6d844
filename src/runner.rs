//! The processing loop
//!
//! One cycle per `cycle_period`: poll the feed, run the tracker, reap. The
//! persisted totals are flushed every `flush_period` and once more on
//! shutdown. Authoritative refresh runs in its own task (see
//! [`AuthoritativeCell::start_refresh`]) and is only read here.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info, warn};

use crate::authoritative::AuthoritativeCell;
use crate::co2_tracker::{Co2Tracker, PersistedAggregate, SessionAggregate};
use crate::fallback_store::FallbackStore;
use crate::format::{format_co2, format_distance, format_source};
use crate::position::PositionBatch;
use crate::position_sources::PositionSource;

/// Log the running totals at info level every this many cycles
const SUMMARY_LOG_EVERY_CYCLES: u64 = 12;

/// Counters for one run of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunReport {
    pub cycles: u64,
    pub poll_errors: u64,
    pub flushes: u64,
    pub session: SessionAggregate,
}

pub struct Runner<S> {
    source: S,
    tracker: Arc<Mutex<Co2Tracker>>,
    authoritative: AuthoritativeCell,
    store: Arc<dyn FallbackStore>,
    /// Loaded once at startup and never modified
    persisted: PersistedAggregate,
    cycle_period: Duration,
    flush_period: Duration,
    report: RunReport,
}

impl<S: PositionSource> Runner<S> {
    pub fn new(
        source: S,
        tracker: Arc<Mutex<Co2Tracker>>,
        authoritative: AuthoritativeCell,
        store: Arc<dyn FallbackStore>,
        persisted: PersistedAggregate,
    ) -> Self {
        Self {
            source,
            tracker,
            authoritative,
            store,
            persisted,
            cycle_period: Duration::from_secs(5),
            flush_period: Duration::from_secs(30),
            report: RunReport::default(),
        }
    }

    pub fn with_periods(mut self, cycle_period: Duration, flush_period: Duration) -> Self {
        self.cycle_period = cycle_period;
        self.flush_period = flush_period;
        self
    }

    /// Run until `shutdown` completes or the source is exhausted, then flush
    pub async fn run_until<F>(mut self, shutdown: F) -> RunReport
    where
        F: Future<Output = ()>,
    {
        let mut cycle = tokio::time::interval(self.cycle_period);
        cycle.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut flush = tokio::time::interval(self.flush_period);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; nothing to flush yet
        flush.tick().await;

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping processing loop");
                    break;
                }
                _ = cycle.tick() => {
                    if !self.run_cycle().await {
                        info!("Position source exhausted after {} cycles", self.report.cycles);
                        break;
                    }
                }
                _ = flush.tick() => {
                    self.flush().instrument(tracing::debug_span!("flush")).await;
                }
            }
        }

        self.flush()
            .instrument(tracing::info_span!("final_flush"))
            .await;
        self.report.session = self.tracker.lock().await.session();
        self.report
    }

    /// One cycle; returns false once the source has nothing more to give
    async fn run_cycle(&mut self) -> bool {
        let batch = match self.source.next_batch().await {
            Ok(Some(batch)) => batch,
            Ok(None) => return false,
            Err(e) => {
                warn!("Position feed poll failed: {:#}", e);
                self.report.poll_errors += 1;
                metrics::counter!("co2track.feed.poll_error_total").increment(1);
                PositionBatch::new()
            }
        };

        let started = std::time::Instant::now();
        let session = {
            let mut tracker = self.tracker.lock().await;
            tracker.process_cycle(&batch, Utc::now());
            tracker.session()
        };
        metrics::histogram!("co2track.cycle.duration_seconds")
            .record(started.elapsed().as_secs_f64());

        self.report.cycles += 1;
        if self.report.cycles % SUMMARY_LOG_EVERY_CYCLES == 0 {
            self.log_summary(&session).await;
        }
        true
    }

    async fn log_summary(&self, session: &SessionAggregate) {
        let authoritative = self.authoritative.snapshot().await;
        let summary = crate::co2_tracker::reconcile(session, &self.persisted, &authoritative);
        info!(
            "All-time {} CO2 over {} from {} aircraft ({}); this session {} over {} from {}",
            format_co2(summary.all_time_co2_kg),
            format_distance(summary.all_time_distance_km),
            summary.all_time_count,
            format_source(&summary, Utc::now()),
            format_co2(session.co2_kg),
            format_distance(session.distance_km),
            session.count
        );
    }

    /// Write `persisted + session` to the store off the async threads
    async fn flush(&mut self) {
        let totals = self.persisted + self.tracker.lock().await.session();
        let store = Arc::clone(&self.store);

        match tokio::task::spawn_blocking(move || store.save(&totals)).await {
            Ok(()) => {
                self.report.flushes += 1;
                debug!(
                    "Flushed {:.1} kg, {:.1} km, {} aircraft",
                    totals.co2_kg, totals.distance_km, totals.count
                );
            }
            Err(e) => warn!("Flush task failed: {}", e),
        }
    }
}

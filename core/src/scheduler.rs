//! Periodic sync of the ledger against the report-count oracle.
//!
//! Each tick: fetch the authoritative count, then reconcile through the
//! session's gate and forward the result as a SyncEvent.
//!
//! RULES:
//!   - One cycle at a time. The loop awaits each cycle before taking
//!     the next tick, and ticks missed meanwhile are skipped, not queued.
//!   - A failed fetch never reaches the ledger; the cycle is skipped.
//!   - After `stop`, nothing is applied. The shutdown flag is rechecked
//!     while holding the gate, so a fetch that lands late is dropped.
//!   - Only `stop` ends the loop. Dropping the event receiver does not.

use crate::{
    config::SchedulerConfig,
    error::BadgeError,
    oracle::ReportCountOracle,
    session::{ReconcileGate, SessionUpdate},
    types::ReportCount,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Outcome of one sync cycle, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Reconciled(SessionUpdate),
    /// Oracle failed or timed out; ledger untouched.
    FetchFailed { reason: String },
    /// The count arrived but could not be persisted.
    ReconcileFailed { reason: String },
    /// The scheduler was stopped before the result could be applied.
    Discarded { count: Option<ReportCount> },
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct SyncScheduler {
    gate: ReconcileGate,
    oracle: Arc<dyn ReportCountOracle>,
    config: SchedulerConfig,
    running: Option<Running>,
}

impl SyncScheduler {
    pub fn new(
        gate: ReconcileGate,
        oracle: Arc<dyn ReportCountOracle>,
        config: SchedulerConfig,
    ) -> Self {
        Self { gate, oracle, config, running: None }
    }

    pub fn gate(&self) -> &ReconcileGate {
        &self.gate
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.task.is_finished())
    }

    /// Spawn the polling task. The first cycle runs immediately.
    /// Restarting replaces (and cancels) any previous task.
    pub fn start(&mut self) -> mpsc::UnboundedReceiver<SyncEvent> {
        self.stop();

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let gate = self.gate.clone();
        let oracle = self.oracle.clone();
        let period = self.config.period();
        let fetch_timeout = self.config.fetch_timeout();

        log::debug!("{}: sync scheduler started, period {period:?}", gate.identity());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = wait_for_shutdown(&mut shutdown_rx) => break,
                    _ = ticker.tick() => {}
                }

                let event =
                    run_cycle(&gate, oracle.as_ref(), fetch_timeout, &mut shutdown_rx).await;
                let stopped = matches!(event, SyncEvent::Discarded { .. });
                // Events are informational; a dropped receiver does not stop polling.
                let _ = events_tx.send(event);
                if stopped {
                    break;
                }
            }
            log::debug!("{}: sync scheduler exited", gate.identity());
        });

        self.running = Some(Running { shutdown_tx, task });
        events_rx
    }

    /// Cancel the polling task. Safe at any point, including mid-fetch.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown_tx.send(true);
            running.task.abort();
            log::debug!("{}: sync scheduler stopped", self.gate.identity());
        }
    }

    /// Manual refresh: one fetch + reconcile through the same gate.
    /// Discarded if the scheduler is stopped while the fetch is pending.
    pub async fn refresh(&self) -> SyncEvent {
        // Keep a sender alive for the idle case so the receiver never reads as closed.
        let (_idle_tx, idle_rx) = watch::channel(false);
        let mut shutdown_rx = match &self.running {
            Some(r) => r.shutdown_tx.subscribe(),
            None => idle_rx,
        };
        run_cycle(
            &self.gate,
            self.oracle.as_ref(),
            self.config.fetch_timeout(),
            &mut shutdown_rx,
        )
        .await
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_cycle(
    gate: &ReconcileGate,
    oracle: &dyn ReportCountOracle,
    fetch_timeout: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> SyncEvent {
    let fetch = tokio::time::timeout(fetch_timeout, oracle.fetch_count(gate.identity()));
    let fetched = tokio::select! {
        _ = wait_for_shutdown(shutdown_rx) => return SyncEvent::Discarded { count: None },
        res = fetch => res,
    };

    let count = match fetched {
        Ok(Ok(count)) => count,
        Ok(Err(e)) => return fetch_failed(gate, e),
        Err(_) => {
            let e = BadgeError::OracleUnavailable {
                reason: format!("no answer within {fetch_timeout:?}"),
            };
            return fetch_failed(gate, e);
        }
    };

    let mut session = gate.lock().await;
    if *shutdown_rx.borrow() {
        log::debug!("{}: discarding count {count} after stop", gate.identity());
        return SyncEvent::Discarded { count: Some(count) };
    }
    match session.apply_count(count) {
        Ok(update) => SyncEvent::Reconciled(update),
        Err(e) => {
            log::warn!("{}: reconcile at count {count} failed: {e}", gate.identity());
            SyncEvent::ReconcileFailed { reason: e.to_string() }
        }
    }
}

fn fetch_failed(gate: &ReconcileGate, e: BadgeError) -> SyncEvent {
    log::warn!("{}: skipping sync cycle: {e}", gate.identity());
    SyncEvent::FetchFailed { reason: e.to_string() }
}

/// Resolves once shutdown is signalled or the sender is gone.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

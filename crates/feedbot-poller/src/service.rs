//! Poll service: runs a [`PollCycle`] on a fixed interval.
//!
//! The first cycle runs immediately on start. A cycle can also be
//! requested at any time through [`PollService::trigger`] (the `update`
//! command). State is persisted after every cycle; a persistence failure
//! is logged and the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::cycle::{CycleReport, PollCycle};

/// Periodic poller.
pub struct PollService {
    cycle: PollCycle,
    interval: Duration,
    /// Manual run request.
    trigger: Arc<Notify>,
    /// Shutdown signal.
    shutdown: Arc<Notify>,
}

impl PollService {
    pub fn new(cycle: PollCycle, interval: Duration) -> Self {
        Self {
            cycle,
            interval,
            trigger: Arc::new(Notify::new()),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Handle that requests an immediate cycle when notified.
    pub fn trigger_handle(&self) -> Arc<Notify> {
        self.trigger.clone()
    }

    /// Request an immediate cycle.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Run the timer loop until [`stop`](Self::stop) is called.
    ///
    /// A stop requested mid-cycle takes effect once that cycle and its
    /// persistence have finished.
    pub async fn start(&self) -> anyhow::Result<()> {
        info!(interval_secs = self.interval.as_secs(), "poll service started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.notified() => {
                    info!("poll service shutting down");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    debug!("poll timer fired");
                }
                _ = self.trigger.notified() => {
                    info!("manual poll requested");
                }
            }

            self.run_once().await;
        }
    }

    /// Stop the loop.
    pub fn stop(&self) {
        info!("stopping poll service");
        // notify_one keeps a permit if the loop is mid-cycle.
        self.shutdown.notify_one();
    }

    /// Run one cycle and persist the result.
    pub async fn run_once(&self) -> CycleReport {
        let report = self.cycle.run().await;
        if let Err(e) = self.cycle.state().persist().await {
            error!(error = %e, "failed to persist state after poll cycle");
        }
        report
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

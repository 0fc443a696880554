// SPDX-License-Identifier: MIT

//! Refresh scheduling: timer → tick queue → single worker.
//!
//! The worker owns the recomputation loop; anything that wants a refresh
//! (the interval timer, an admin endpoint, a test) just sends a tick
//! through the handle. Tests drive the worker deterministically by
//! sending ticks themselves instead of waiting on wall-clock timers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::services::leaderboard::LeaderboardService;

/// Handle for requesting a leaderboard refresh.
#[derive(Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Queue a refresh tick. Coalesces: while a tick is already pending,
    /// further requests are dropped (the pending run will see their data).
    pub fn request_refresh(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Single worker draining refresh ticks.
pub struct RefreshScheduler {
    service: Arc<LeaderboardService>,
    leaderboard_type: String,
    rx: mpsc::Receiver<()>,
}

impl RefreshScheduler {
    /// Create a scheduler for one leaderboard plus the handle that feeds it.
    pub fn new(
        service: Arc<LeaderboardService>,
        leaderboard_type: &str,
    ) -> (RefreshHandle, RefreshScheduler) {
        // Capacity 1 gives tick coalescing.
        let (tx, rx) = mpsc::channel(1);
        (
            RefreshHandle { tx },
            RefreshScheduler {
                service,
                leaderboard_type: leaderboard_type.to_string(),
                rx,
            },
        )
    }

    /// Drain ticks until every handle is dropped.
    ///
    /// A failed recomputation is logged and swallowed here: the stale
    /// cache stays valid and the next tick retries.
    pub async fn run(mut self) {
        while self.rx.recv().await.is_some() {
            if let Err(e) = self.service.recompute(&self.leaderboard_type).await {
                tracing::error!(
                    leaderboard_type = %self.leaderboard_type,
                    error = %e,
                    "Scheduled leaderboard refresh failed"
                );
            }
        }
        tracing::debug!("Refresh scheduler stopped");
    }

    /// Feed a handle from a fixed-interval timer. The first tick fires
    /// immediately, warming the cache at startup.
    pub fn spawn_interval(handle: RefreshHandle, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                handle.request_refresh();
            }
        })
    }
}

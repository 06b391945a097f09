//! Periodic dispatch of poll cycles.
//!
//! Each watched kind gets its own ticker task. Every tick hands the cycle to a
//! fresh task so a slow fetch never holds up the ticker; the runner's own
//! guard decides whether an overlapping tick is skipped or queued. Kinds never
//! wait on each other.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use watch::Announce;

use crate::CycleRunner;

/// Owns the ticker tasks and the cycles they dispatch.
#[derive(Debug, Default)]
pub struct Scheduler {
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts ticking `runner` every `period`. The first tick fires immediately.
    pub fn watch<T: Announce>(&self, runner: Arc<CycleRunner<T>>, period: Duration) {
        let shutdown = self.shutdown.clone();
        let cycles = self.tasks.clone();
        self.tasks.spawn(async move {
            let kind = T::KIND;
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(%kind, ?period, "watch job started");
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let runner = Arc::clone(&runner);
                        cycles.spawn(async move {
                            runner.run_cycle().await;
                        });
                    }
                }
            }
            debug!(%kind, "watch job stopped");
        });
    }

    /// Returns a token that stops every job when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops ticking and waits up to `grace` for in-flight cycles to finish.
    ///
    /// Cycles still running after `grace` are abandoned; they hold no state
    /// that outlives them beyond a snapshot swap, which is atomic.
    pub async fn shutdown_with_grace(self, grace: Duration) {
        self.shutdown.cancel();
        self.tasks.close();
        if tokio::time::timeout(grace, self.tasks.wait()).await.is_err() {
            warn!(
                remaining = self.tasks.len(),
                ?grace,
                "in-flight cycles did not finish before shutdown"
            );
        }
    }
}

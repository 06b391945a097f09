//! One poll cycle: fetch → swap → diff → notify, for one resource kind.
//!
//! A [`CycleRunner`] is the sole writer of its kind's [`SnapshotStore`]. It
//! holds a job-local guard for the whole sequence, so two invocations of the
//! same job never interleave: an overlapping invocation is either skipped or
//! queued behind its predecessor, depending on [`OverlapPolicy`]. At most one
//! invocation waits in the queue; further ticks are skipped until it starts.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, info_span, warn, Instrument};
use watch::{diff, Announce, FetchError, ResourceFetcher, Snapshot, SnapshotStore};

use crate::Notifier;

/// What to do with a tick that arrives while the previous cycle of the same
/// job is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Drop the tick.
    #[default]
    Skip,
    /// Wait for the running cycle to finish, then run. Only one tick waits;
    /// any tick arriving while another is already waiting is dropped.
    Queue,
}

/// Tunables for a [`CycleRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOptions {
    pub fetch_timeout: Duration,
    pub overlap: OverlapPolicy,
    /// Prime the store from the first successful fetch without announcing.
    pub suppress_initial: bool,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            overlap: OverlapPolicy::Skip,
            suppress_initial: false,
        }
    }
}

/// Counts from a completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub records: usize,
    pub events: usize,
    pub delivered: usize,
    pub dropped: usize,
    /// `true` if this cycle primed the store and announcements were suppressed.
    pub suppressed: bool,
}

/// How one invocation of [`CycleRunner::run_cycle`] ended.
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle of the same job was running; nothing was fetched.
    Skipped,
    /// The fetch failed; the store still holds the previous snapshot.
    FetchFailed(FetchError),
}

/// Runs poll cycles for one resource kind.
pub struct CycleRunner<T> {
    store: Arc<SnapshotStore<T>>,
    fetcher: Arc<dyn ResourceFetcher<T>>,
    notifier: Arc<Notifier>,
    options: CycleOptions,
    guard: Mutex<()>,
    queue_slot: Semaphore,
}

impl<T: Announce> CycleRunner<T> {
    pub fn new(
        store: Arc<SnapshotStore<T>>,
        fetcher: Arc<dyn ResourceFetcher<T>>,
        notifier: Arc<Notifier>,
        options: CycleOptions,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            options,
            guard: Mutex::new(()),
            queue_slot: Semaphore::new(1),
        }
    }

    /// The store this runner writes to.
    pub fn store(&self) -> &Arc<SnapshotStore<T>> {
        &self.store
    }

    /// Runs one cycle. Never panics on fetch or delivery failure.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let span = info_span!("cycle", kind = T::KIND.as_str());
        self.run_guarded().instrument(span).await
    }

    async fn run_guarded(&self) -> CycleOutcome {
        let _running = match self.options.overlap {
            OverlapPolicy::Skip => match self.guard.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!("previous cycle still running; tick skipped");
                    return CycleOutcome::Skipped;
                }
            },
            OverlapPolicy::Queue => match self.guard.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    let Ok(_waiting) = self.queue_slot.try_acquire() else {
                        debug!("a tick is already queued; tick skipped");
                        return CycleOutcome::Skipped;
                    };
                    self.guard.lock().await
                }
            },
        };

        let records = match tokio::time::timeout(self.options.fetch_timeout, self.fetcher.list())
            .await
        {
            Ok(Ok(records)) => records,
            Ok(Err(err)) => return self.fetch_failed(err),
            Err(_) => {
                return self.fetch_failed(FetchError::Timeout {
                    kind: T::KIND,
                    after: self.options.fetch_timeout,
                })
            }
        };

        let next = Snapshot::capture(records);
        let previous = self.store.swap(next.clone());
        let events = diff(&previous, &next);

        let mut report = CycleReport {
            records: next.len(),
            events: events.len(),
            ..CycleReport::default()
        };

        if self.options.suppress_initial && !previous.is_primed() {
            info!(records = report.records, "initial snapshot primed; announcements suppressed");
            report.suppressed = true;
            return CycleOutcome::Completed(report);
        }

        for event in &events {
            match self.notifier.deliver(&T::announce(event)).await {
                Ok(()) => report.delivered += 1,
                Err(_) => report.dropped += 1,
            }
        }

        if report.events > 0 {
            info!(
                records = report.records,
                events = report.events,
                delivered = report.delivered,
                dropped = report.dropped,
                since = ?previous.captured_at(),
                "cycle completed"
            );
        } else {
            debug!(records = report.records, since = ?previous.captured_at(), "cycle completed; no changes");
        }
        CycleOutcome::Completed(report)
    }

    fn fetch_failed(&self, err: FetchError) -> CycleOutcome {
        warn!(
            error = %err,
            fetched_kind = %err.kind(),
            last_success = ?self.store.read().captured_at(),
            "fetch failed; keeping previous snapshot"
        );
        CycleOutcome::FetchFailed(err)
    }
}

impl<T> std::fmt::Debug for CycleRunner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleRunner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio::sync::Semaphore;
    use watch::{BuildRecord, Color, EnvironmentRecord, ResourceKind};

    use super::*;
    use crate::test_support::{build, channel, env, RecordingSink, ScriptedFetcher};
    use crate::DeliveryMode;

    fn runner<T: Announce>(
        fetcher: Arc<ScriptedFetcher<T>>,
        sink: Arc<RecordingSink>,
        options: CycleOptions,
    ) -> CycleRunner<T> {
        let notifier = Notifier::new(sink, channel("C-announce"), DeliveryMode::AtMostOnce);
        CycleRunner::new(Arc::new(SnapshotStore::new()), fetcher, Arc::new(notifier), options)
    }

    fn completed(outcome: CycleOutcome) -> CycleReport {
        match outcome {
            CycleOutcome::Completed(report) => report,
            other => panic!("expected a completed cycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn announces_one_message_per_transition() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![build("b1", "IN_PROGRESS")]),
            Ok(vec![build("b1", "SUCCEEDED"), build("b2", "IN_PROGRESS")]),
            Ok(vec![build("b1", "SUCCEEDED"), build("b2", "IN_PROGRESS")]),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let runner = runner(fetcher, Arc::clone(&sink), CycleOptions::default());

        assert_eq!(completed(runner.run_cycle().await).events, 1);
        assert_eq!(completed(runner.run_cycle().await).events, 2);
        assert_eq!(completed(runner.run_cycle().await).events, 0);

        let posts = sink.posts();
        assert_eq!(posts.len(), 3);
        assert!(posts.iter().all(|(dest, _)| dest.as_str() == "C-announce"));
        assert_eq!(posts[1].1.color(), Some(Color::Green));
        assert_eq!(
            posts[1].1.text,
            "Build status changed for project `web`: IN_PROGRESS → SUCCEEDED"
        );
        assert!(posts[2].1.text.starts_with("New build started"));
    }

    #[tokio::test]
    async fn fetch_failure_keeps_the_previous_snapshot() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![build("b1", "IN_PROGRESS")]),
            Err(FetchError::Provider {
                kind: ResourceKind::Build,
                message: "ThrottlingException".to_owned(),
            }),
            Ok(vec![build("b1", "FAILED")]),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let runner = runner(fetcher, Arc::clone(&sink), CycleOptions::default());

        completed(runner.run_cycle().await);
        let before = runner.store().read();

        assert!(matches!(runner.run_cycle().await, CycleOutcome::FetchFailed(_)));
        assert!(runner.store().read().ptr_eq(&before));

        // The transition is still detected against the stale snapshot.
        assert_eq!(completed(runner.run_cycle().await).events, 1);
        assert_eq!(sink.posts().len(), 2);
    }

    #[tokio::test]
    async fn slow_fetch_times_out_as_a_fetch_failure() {
        let gate = Arc::new(Semaphore::new(0));
        let fetcher = Arc::new(
            ScriptedFetcher::<BuildRecord>::new(vec![]).gated(Arc::clone(&gate)),
        );
        let options = CycleOptions {
            fetch_timeout: Duration::from_millis(20),
            ..CycleOptions::default()
        };
        let runner = runner(fetcher, Arc::new(RecordingSink::default()), options);

        match runner.run_cycle().await {
            CycleOutcome::FetchFailed(FetchError::Timeout { kind, .. }) => {
                assert_eq!(kind, ResourceKind::Build);
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert!(!runner.store().read().is_primed());
    }

    #[tokio::test]
    async fn delivery_failure_drops_the_event_without_replaying_it() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![env("e1", "Ready", "Green")]),
            Ok(vec![env("e1", "Updating", "Green")]),
            Ok(vec![env("e1", "Updating", "Green")]),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let runner = runner(fetcher, Arc::clone(&sink), CycleOptions::default());

        completed(runner.run_cycle().await);
        sink.failing.store(true, Ordering::SeqCst);
        let report = completed(runner.run_cycle().await);
        assert_eq!((report.events, report.dropped), (1, 1));

        sink.failing.store(false, Ordering::SeqCst);
        assert_eq!(completed(runner.run_cycle().await).events, 0);
        assert_eq!(sink.posts().len(), 1);
    }

    #[tokio::test]
    async fn environment_entering_update_is_announced_in_info_blue() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![env("e1", "Ready", "Green")]),
            Ok(vec![env("e1", "Updating", "Green")]),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let options = CycleOptions {
            suppress_initial: true,
            ..CycleOptions::default()
        };
        let runner: CycleRunner<EnvironmentRecord> = runner(fetcher, Arc::clone(&sink), options);

        runner.run_cycle().await;
        runner.run_cycle().await;

        let posts = sink.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1.color(), Some(Color::InfoBlue));
    }

    #[tokio::test]
    async fn initial_announcements_can_be_suppressed() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![build("b1", "SUCCEEDED"), build("b2", "FAILED")]),
            Ok(vec![build("b1", "SUCCEEDED"), build("b2", "FAILED"), build("b3", "IN_PROGRESS")]),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let options = CycleOptions {
            suppress_initial: true,
            ..CycleOptions::default()
        };
        let runner = runner(fetcher, Arc::clone(&sink), options);

        let first = completed(runner.run_cycle().await);
        assert!(first.suppressed);
        assert_eq!(first.events, 2);
        assert!(sink.posts().is_empty());

        let second = completed(runner.run_cycle().await);
        assert!(!second.suppressed);
        assert_eq!(sink.posts().len(), 1);
    }

    #[tokio::test]
    async fn initial_fetch_is_announced_by_default() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![
            build("b1", "SUCCEEDED"),
            build("b2", "FAILED"),
        ])]));
        let sink = Arc::new(RecordingSink::default());
        let runner = runner(fetcher, Arc::clone(&sink), CycleOptions::default());

        completed(runner.run_cycle().await);
        assert_eq!(sink.posts().len(), 2);
    }

    #[tokio::test]
    async fn overlapping_tick_is_skipped_while_a_fetch_is_in_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let fetcher = Arc::new(
            ScriptedFetcher::new(vec![
                Ok(vec![build("b1", "IN_PROGRESS")]),
                Ok(vec![build("b1", "SUCCEEDED")]),
            ])
            .gated(Arc::clone(&gate)),
        );
        let sink = Arc::new(RecordingSink::default());
        let runner = Arc::new(runner(Arc::clone(&fetcher), Arc::clone(&sink), CycleOptions::default()));

        let first = tokio::spawn({
            let runner = Arc::clone(&runner);
            async move { runner.run_cycle().await }
        });
        while fetcher.calls() == 0 {
            tokio::task::yield_now().await;
        }

        // The first fetch is held open; the second tick must not fetch.
        assert!(matches!(runner.run_cycle().await, CycleOutcome::Skipped));
        assert_eq!(fetcher.calls(), 1);

        gate.add_permits(1);
        assert_eq!(completed(first.await.unwrap()).events, 1);

        gate.add_permits(1);
        assert_eq!(completed(runner.run_cycle().await).events, 1);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(sink.posts().len(), 2);
    }

    #[tokio::test]
    async fn queued_tick_waits_for_its_predecessor() {
        let gate = Arc::new(Semaphore::new(0));
        let fetcher = Arc::new(
            ScriptedFetcher::new(vec![
                Ok(vec![build("b1", "IN_PROGRESS")]),
                Ok(vec![build("b1", "SUCCEEDED")]),
            ])
            .gated(Arc::clone(&gate)),
        );
        let sink = Arc::new(RecordingSink::default());
        let options = CycleOptions {
            overlap: OverlapPolicy::Queue,
            ..CycleOptions::default()
        };
        let runner = Arc::new(runner(Arc::clone(&fetcher), Arc::clone(&sink), options));

        let first = tokio::spawn({
            let runner = Arc::clone(&runner);
            async move { runner.run_cycle().await }
        });
        while fetcher.calls() == 0 {
            tokio::task::yield_now().await;
        }
        let second = tokio::spawn({
            let runner = Arc::clone(&runner);
            async move { runner.run_cycle().await }
        });

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(fetcher.calls(), 1, "queued tick must not fetch while its predecessor runs");

        gate.add_permits(2);
        completed(first.await.unwrap());
        completed(second.await.unwrap());

        assert_eq!(fetcher.calls(), 2);
        let texts = sink.texts();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].starts_with("New build started"));
        assert!(texts[1].ends_with("IN_PROGRESS → SUCCEEDED"));
    }

    #[tokio::test]
    async fn only_one_tick_waits_behind_a_running_cycle() {
        let gate = Arc::new(Semaphore::new(0));
        let fetcher = Arc::new(
            ScriptedFetcher::new(vec![
                Ok(vec![build("b1", "IN_PROGRESS")]),
                Ok(vec![build("b1", "SUCCEEDED")]),
            ])
            .gated(Arc::clone(&gate)),
        );
        let options = CycleOptions {
            overlap: OverlapPolicy::Queue,
            ..CycleOptions::default()
        };
        let runner = Arc::new(runner(
            Arc::clone(&fetcher),
            Arc::new(RecordingSink::default()),
            options,
        ));

        let first = tokio::spawn({
            let runner = Arc::clone(&runner);
            async move { runner.run_cycle().await }
        });
        while fetcher.calls() == 0 {
            tokio::task::yield_now().await;
        }
        let queued = tokio::spawn({
            let runner = Arc::clone(&runner);
            async move { runner.run_cycle().await }
        });
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        // The slot is taken, so every further tick returns at once.
        for _ in 0..3 {
            assert!(matches!(runner.run_cycle().await, CycleOutcome::Skipped));
        }

        gate.add_permits(2);
        completed(first.await.unwrap());
        completed(queued.await.unwrap());
        assert_eq!(fetcher.calls(), 2);

        // Once the queue drains, the next tick is admitted again.
        gate.add_permits(1);
        completed(runner.run_cycle().await);
        assert_eq!(fetcher.calls(), 3);
    }
}

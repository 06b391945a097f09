//! Delivers announcements to the fixed broadcast channel.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use watch::{Announcement, ChannelId, DeliveryError, NotificationSink, RetryPolicy};

/// Delivery guarantee for announcements.
///
/// Neither mode queues across cycles: a transition the diff engine reported
/// once is never reported again, so an undelivered announcement is lost after
/// its last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// One attempt; failures are logged and the announcement dropped.
    #[default]
    AtMostOnce,
    /// Up to `attempts` tries with `backoff` between them, within the cycle.
    AtLeastOnce { attempts: u32, backoff: Duration },
}

/// Posts announcements to one destination through a [`NotificationSink`].
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    destination: ChannelId,
    mode: DeliveryMode,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, destination: ChannelId, mode: DeliveryMode) -> Self {
        Self {
            sink,
            destination,
            mode,
        }
    }

    /// Delivers one announcement according to the configured mode.
    ///
    /// Returns the last error if the announcement was dropped.
    pub async fn deliver(&self, announcement: &Announcement) -> Result<(), DeliveryError> {
        let (attempts, backoff) = match self.mode {
            DeliveryMode::AtMostOnce => (1, Duration::ZERO),
            DeliveryMode::AtLeastOnce { attempts, backoff } => (attempts.max(1), backoff),
        };

        let mut attempt = 1;
        loop {
            match self.sink.post(&self.destination, announcement).await {
                Ok(()) => {
                    debug!(destination = %self.destination, attempt, "announcement delivered");
                    return Ok(());
                }
                Err(err) => {
                    let delay = match err.retry_policy() {
                        RetryPolicy::Retryable { after } if attempt < attempts => {
                            after.map_or(backoff, |after| after.max(backoff))
                        }
                        _ => {
                            warn!(
                                destination = %self.destination,
                                attempt,
                                error = %err,
                                "announcement dropped"
                            );
                            return Err(err);
                        }
                    };
                    debug!(attempt, ?delay, error = %err, "announcement delivery failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("destination", &self.destination)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

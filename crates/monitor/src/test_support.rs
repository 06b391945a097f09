//! Fakes for the port traits, shared by this crate's tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use watch::{
    Announcement, ApplicationName, BuildId, BuildRecord, BuildStatus, ChannelId, DeliveryError,
    EnvironmentHealth, EnvironmentName, EnvironmentRecord, EnvironmentStatus, FetchError,
    NotificationSink, ProjectName, Record, ResourceFetcher, VersionLabel,
};

pub(crate) fn build(id: &str, status: &str) -> BuildRecord {
    BuildRecord {
        id: BuildId::new(id).unwrap(),
        project_name: ProjectName::new("web").unwrap(),
        status: BuildStatus::from(status),
        start_time: None,
    }
}

pub(crate) fn env(name: &str, status: &str, health: &str) -> EnvironmentRecord {
    EnvironmentRecord {
        name: EnvironmentName::new(name).unwrap(),
        application_name: ApplicationName::new("shop").unwrap(),
        health: EnvironmentHealth::from(health),
        status: EnvironmentStatus::new(status),
        version_label: VersionLabel::new("v1"),
        updated_at: None,
    }
}

pub(crate) fn channel(id: &str) -> ChannelId {
    ChannelId::new(id).unwrap()
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Replays scripted responses, then keeps returning `fallback`.
///
/// When gated, every call waits for one permit on `gate` before answering,
/// which lets a test hold a fetch "in flight" for as long as it likes.
pub(crate) struct ScriptedFetcher<T> {
    responses: Mutex<VecDeque<Result<Vec<T>, FetchError>>>,
    fallback: Vec<T>,
    gate: Option<Arc<Semaphore>>,
    pub(crate) calls: AtomicUsize,
}

impl<T: Record> ScriptedFetcher<T> {
    pub(crate) fn new(responses: Vec<Result<Vec<T>, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: Vec::new(),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_fallback(mut self, fallback: Vec<T>) -> Self {
        self.fallback = fallback;
        self
    }

    pub(crate) fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Record> ResourceFetcher<T> for ScriptedFetcher<T> {
    async fn list(&self) -> Result<Vec<T>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Records every post; fails all of them while `failing` is set.
#[derive(Default)]
pub(crate) struct RecordingSink {
    posts: Mutex<Vec<(ChannelId, Announcement)>>,
    pub(crate) failing: AtomicBool,
}

impl RecordingSink {
    pub(crate) fn posts(&self) -> Vec<(ChannelId, Announcement)> {
        self.posts.lock().unwrap().clone()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.posts().into_iter().map(|(_, a)| a.text).collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn post(
        &self,
        destination: &ChannelId,
        announcement: &Announcement,
    ) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport {
                message: "sink offline".to_owned(),
            });
        }
        self.posts
            .lock()
            .unwrap()
            .push((destination.clone(), announcement.clone()));
        Ok(())
    }
}

//! Port traits implemented by infrastructure crates.
//!
//! The domain defines *what* it needs from the outside world; adapters in
//! `cloud` and `slack` define *how* to supply it. Every trait is object-safe so
//! the composition root can wire `Arc<dyn …>` values.

use async_trait::async_trait;

use crate::{
    Announcement, ApplicationName, ApplicationRecord, BuildId, BuildRecord, ChannelId, ChatUserId,
    ControlError, DeliveryError, EnvironmentName, FetchError, LookupError, ProjectName, Record,
    UserEmail, VersionLabel,
};

/// Lists the complete current set of records of one kind.
#[async_trait]
pub trait ResourceFetcher<T: Record>: Send + Sync {
    async fn list(&self) -> Result<Vec<T>, FetchError>;
}

/// Build-side calls made by the command surface.
#[async_trait]
pub trait BuildControl: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<ProjectName>, ControlError>;

    /// Starts a build and returns the record of the new invocation.
    async fn start_build(&self, project: &ProjectName) -> Result<BuildRecord, ControlError>;

    async fn delete_build(&self, id: &BuildId) -> Result<(), ControlError>;
}

/// Environment-side calls made by the command surface.
#[async_trait]
pub trait EnvironmentControl: Send + Sync {
    async fn list_applications(&self) -> Result<Vec<ApplicationRecord>, ControlError>;

    /// Creates a fresh application version and deploys it to `environment`.
    ///
    /// Returns the label of the version being deployed.
    async fn rebuild_environment(
        &self,
        application: &ApplicationName,
        environment: &EnvironmentName,
    ) -> Result<VersionLabel, ControlError>;
}

/// Delivers a rendered message to a chat destination.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn post(
        &self,
        destination: &ChannelId,
        announcement: &Announcement,
    ) -> Result<(), DeliveryError>;
}

/// Resolves chat users to the email addresses that key the permission table.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn email_for(&self, user: &ChatUserId) -> Result<UserEmail, LookupError>;
}

/// A chat message addressed to the bot, after the mention has been stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub user: ChatUserId,
    pub channel: ChannelId,
    pub text: String,
}

/// Executes chat commands; implemented by the orchestration layer and called
/// by whichever transport receives chat messages.
#[async_trait]
pub trait CommandService: Send + Sync {
    async fn handle(&self, request: CommandRequest) -> Announcement;
}

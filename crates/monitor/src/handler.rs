//! The chat command surface.
//!
//! Read commands render the current snapshots; they never trigger a fetch.
//! Mutating commands call the provider directly and are gated by the
//! permission table. Errors are turned into replies, never retried.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use watch::{
    Announce, Announcement, Attachment, BuildControl, BuildRecord, ChatUserId, Color, Command,
    CommandRequest, CommandService, EnvironmentControl, EnvironmentRecord, PermissionTable,
    Snapshot, SnapshotStore, User, UserDirectory, HELP_TEXT,
};

use crate::Notifier;

/// Number of builds rendered by `list builds`.
pub const RECENT_BUILDS: usize = 5;

/// Executes parsed chat commands against the stores and the provider.
pub struct CommandHandler {
    builds: Arc<SnapshotStore<BuildRecord>>,
    environments: Arc<SnapshotStore<EnvironmentRecord>>,
    build_control: Arc<dyn BuildControl>,
    environment_control: Arc<dyn EnvironmentControl>,
    directory: Arc<dyn UserDirectory>,
    permissions: Arc<PermissionTable>,
    notifier: Arc<Notifier>,
}

impl CommandHandler {
    pub fn new(
        builds: Arc<SnapshotStore<BuildRecord>>,
        environments: Arc<SnapshotStore<EnvironmentRecord>>,
        build_control: Arc<dyn BuildControl>,
        environment_control: Arc<dyn EnvironmentControl>,
        directory: Arc<dyn UserDirectory>,
        permissions: Arc<PermissionTable>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            builds,
            environments,
            build_control,
            environment_control,
            directory,
            permissions,
            notifier,
        }
    }

    async fn resolve_user(&self, user: &ChatUserId) -> Result<User, Announcement> {
        match self.directory.email_for(user).await {
            Ok(email) => Ok(self.permissions.find(&email)),
            Err(err) => {
                warn!(%user, error = %err, "could not resolve chat user");
                Err(Announcement::text(format!(
                    "Sorry, I couldn't look up your profile: {err}"
                )))
            }
        }
    }

    async fn execute(&self, command: Command, request: &CommandRequest) -> Announcement {
        match command {
            Command::Hello => Announcement::text("Hello! If you need help, type `help`."),
            Command::Help => Announcement::text(HELP_TEXT),
            Command::Me => match self.resolve_user(&request.user).await {
                Ok(user) => render_me(&user),
                Err(reply) => reply,
            },
            Command::ListProjects => self.list_projects().await,
            Command::ListBuilds => render_snapshot(
                &self.builds.read(),
                RECENT_BUILDS,
                "Build status is still loading, try again in a moment.",
                "No builds found.",
            ),
            Command::ListEnvs => render_snapshot(
                &self.environments.read(),
                usize::MAX,
                "Environment status is still loading, try again in a moment.",
                "No environments found.",
            ),
            Command::ListApps => self.list_apps().await,
            Command::RunBuild(None) => Announcement::text("You must specify a project"),
            Command::RunBuild(Some(project)) => {
                match self.build_control.start_build(&project).await {
                    Ok(build) => {
                        info!(user = %request.user, %project, build = %build.id, "build started");
                        let audit = Announcement::text(format!(
                            "Project build has started for project {project}\nStarted by <@{}>",
                            request.user
                        ));
                        // The reply to the requester does not depend on this post.
                        let _ = self.notifier.deliver(&audit).await;
                        Announcement::text(format!("Project build started `{}`", build.id))
                    }
                    Err(err) => {
                        warn!(user = %request.user, %project, error = %err, "start build failed");
                        Announcement::text(format!("Failed to build project `{project}`: {err}"))
                    }
                }
            }
            Command::DeleteBuild(None) => Announcement::text("You must specify a build"),
            Command::DeleteBuild(Some(id)) => match self.build_control.delete_build(&id).await {
                Ok(()) => {
                    info!(user = %request.user, build = %id, "build deleted");
                    Announcement::text(format!("Build `{id}` deleted"))
                }
                Err(err) => {
                    warn!(user = %request.user, build = %id, error = %err, "delete build failed");
                    Announcement::text(format!("Failed to delete build `{id}`: {err}"))
                }
            },
            Command::RebuildEnv(None) => Announcement::text(
                "You must specify an application and an environment name",
            ),
            Command::RebuildEnv(Some((application, environment))) => {
                match self
                    .environment_control
                    .rebuild_environment(&application, &environment)
                    .await
                {
                    Ok(version) => {
                        info!(user = %request.user, %application, %environment, %version, "rebuild started");
                        Announcement::text(format!(
                            "Now rebuilding environment `{environment}` with version `{version}`... \
                             this can take a few minutes to complete."
                        ))
                    }
                    Err(err) => {
                        warn!(user = %request.user, %environment, error = %err, "rebuild failed");
                        Announcement::text(format!("Failed to initialize a rebuild: {err}"))
                    }
                }
            }
            Command::Unknown => {
                Announcement::text("Sorry, I didn't get that. Type `help` to see what I can do.")
            }
        }
    }

    async fn list_projects(&self) -> Announcement {
        match self.build_control.list_projects().await {
            Ok(projects) if projects.is_empty() => Announcement::text("No projects found."),
            Ok(projects) => {
                let text: String = projects.iter().map(|p| format!(" - {p}\n")).collect();
                Announcement::attachments(vec![Attachment::new(Color::Green, text)
                    .with_title("Projects")
                    .with_footer("Data from AWS CodeBuild")])
            }
            Err(err) => Announcement::text(format!("Failed to list projects: {err}")),
        }
    }

    async fn list_apps(&self) -> Announcement {
        match self.environment_control.list_applications().await {
            Ok(apps) if apps.is_empty() => Announcement::text("No applications found."),
            Ok(apps) => Announcement::attachments(apps.iter().map(|a| a.attachment()).collect()),
            Err(err) => Announcement::text(format!("Failed to list applications: {err}")),
        }
    }
}

#[async_trait]
impl CommandService for CommandHandler {
    async fn handle(&self, request: CommandRequest) -> Announcement {
        let command = Command::parse(&request.text);

        if let Some(capability) = command.required_capability() {
            let user = match self.resolve_user(&request.user).await {
                Ok(user) => user,
                Err(reply) => return reply,
            };
            if !user.can(capability) {
                info!(user = %request.user, email = %user.email, %capability, "command denied");
                return Announcement::text(format!(
                    "Sorry, you don't have the `{capability}` permission."
                ));
            }
        }

        self.execute(command, &request).await
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler").finish_non_exhaustive()
    }
}

fn render_me(user: &User) -> Announcement {
    let mut text = format!("Hi, {}\n", user.email);
    if user.permissions.is_empty() {
        text.push_str("Sorry, seems like you don't have any permissions yet...");
    } else {
        text.push_str("Here are your permissions:\n");
        for permission in &user.permissions {
            text.push_str(&format!("`{permission}`\n"));
        }
    }
    Announcement::text(text)
}

fn render_snapshot<T: Announce>(
    snapshot: &Snapshot<T>,
    limit: usize,
    loading: &str,
    empty: &str,
) -> Announcement {
    if !snapshot.is_primed() {
        return Announcement::text(loading);
    }
    if snapshot.is_empty() {
        return Announcement::text(empty);
    }
    Announcement::attachments(snapshot.latest(limit).iter().map(T::attachment).collect())
}

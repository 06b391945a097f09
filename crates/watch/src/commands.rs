//! Chat commands and the permission table that gates the mutating ones.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ApplicationName, BuildId, EnvironmentName, ProjectName, UserEmail};

// ---------------------------------------------------------------------------
// Capabilities and users
// ---------------------------------------------------------------------------

/// A permission that gates one mutating command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    StartBuild,
    DeleteBuild,
    RebuildEnv,
}

impl Capability {
    /// Returns the capability string used in the permission table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartBuild => "start-build",
            Self::DeleteBuild => "delete-build",
            Self::RebuildEnv => "rebuild-env",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the permission table.
///
/// Permissions are free-form strings so the table can carry capabilities this
/// version does not know about; [`User::can`] only matches exact strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: UserEmail,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl User {
    /// A user with no permissions.
    pub fn unprivileged(email: UserEmail) -> Self {
        Self {
            email,
            permissions: Vec::new(),
        }
    }

    /// Returns `true` if the user holds `capability`.
    pub fn can(&self, capability: Capability) -> bool {
        self.permissions.iter().any(|p| p == capability.as_str())
    }
}

/// Permission table keyed by email.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    users: HashMap<UserEmail, User>,
}

impl PermissionTable {
    /// Builds the table; a later entry for the same email replaces an earlier one.
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.email.clone(), u)).collect(),
        }
    }

    /// Returns the user for `email`, or an unprivileged user if unknown.
    pub fn find(&self, email: &UserEmail) -> User {
        self.users
            .get(email)
            .cloned()
            .unwrap_or_else(|| User::unprivileged(email.clone()))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Hello,
    Help,
    Me,
    ListProjects,
    ListBuilds,
    /// `run build <project>`; `None` when the project was omitted.
    RunBuild(Option<ProjectName>),
    /// `delete build <id>`; `None` when the id was omitted.
    DeleteBuild(Option<BuildId>),
    ListApps,
    ListEnvs,
    /// `rebuild env <application> <environment>`; `None` when either is omitted.
    RebuildEnv(Option<(ApplicationName, EnvironmentName)>),
    Unknown,
}

impl Command {
    /// Parses the text of a message addressed to the bot.
    ///
    /// Keywords match case-insensitively; arguments keep their case.
    pub fn parse(text: &str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let keywords: Vec<&str> = lowered.iter().map(String::as_str).collect();

        match keywords.as_slice() {
            [first, ..]
                if matches!(
                    first.trim_end_matches(|c: char| c.is_ascii_punctuation()),
                    "hi" | "hello"
                ) =>
            {
                Self::Hello
            }
            ["help"] => Self::Help,
            ["me"] => Self::Me,
            ["list", "projects", ..] => Self::ListProjects,
            ["list", "builds", ..] => Self::ListBuilds,
            ["list", "apps", ..] => Self::ListApps,
            ["list", "envs", ..] => Self::ListEnvs,
            ["run", "build", ..] => Self::RunBuild(words.get(2).and_then(|w| ProjectName::new(*w))),
            ["delete", "build", ..] => Self::DeleteBuild(words.get(2).and_then(|w| BuildId::new(*w))),
            ["rebuild", "env", ..] => Self::RebuildEnv(
                words
                    .get(2)
                    .and_then(|w| ApplicationName::new(*w))
                    .zip(words.get(3).and_then(|w| EnvironmentName::new(*w))),
            ),
            _ => Self::Unknown,
        }
    }

    /// Returns the capability required to run this command, if any.
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Self::RunBuild(_) => Some(Capability::StartBuild),
            Self::DeleteBuild(_) => Some(Capability::DeleteBuild),
            Self::RebuildEnv(_) => Some(Capability::RebuildEnv),
            _ => None,
        }
    }
}

/// Text of the `help` reply.
pub const HELP_TEXT: &str = "*Here are all the commands you can use:*
`help` - Display this message
`me` - Show your email and permissions
`list projects` - List build projects
`list builds` - Show the five most recent builds
`run build <project>` - Start a build (needs `start-build`)
`delete build <build-id>` - Delete a build (needs `delete-build`)
`list apps` - List applications
`list envs` - Show all environments
`rebuild env <application> <environment>` - Redeploy an environment (needs `rebuild-env`)";

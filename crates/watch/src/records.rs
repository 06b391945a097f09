//! Resource records and their status axes.
//!
//! A record is one row of a fetched resource collection. Every record kind
//! implements [`Record`], which tells the diff engine how to key it and which
//! single field decides whether it changed between two polls.

use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::{
    ApplicationName, BuildId, EnvironmentName, ProjectName, ResourceKind, Timestamp, VersionLabel,
};

// ---------------------------------------------------------------------------
// Record trait
// ---------------------------------------------------------------------------

/// A keyed resource record that can be snapshotted and diffed.
pub trait Record: Clone + Send + Sync + 'static {
    /// Identity type; unique within one snapshot.
    type Key: Clone + Eq + Hash + Send + Sync + std::fmt::Display;

    /// The resource kind this record belongs to.
    const KIND: ResourceKind;

    /// Returns the identity of this record.
    fn key(&self) -> &Self::Key;

    /// Returns the status-relevant field compared by the diff engine.
    ///
    /// Comparison is raw string equality: case-sensitive, no normalization.
    fn status_field(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Build status
// ---------------------------------------------------------------------------

/// Reported status of a build invocation.
///
/// Values the provider may add in future land in [`BuildStatus::Other`] with
/// their raw text preserved, so a change from one unknown value to another is
/// still detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    InProgress,
    Succeeded,
    Failed,
    Fault,
    TimedOut,
    /// Any value not listed above, verbatim.
    Other(String),
}

impl BuildStatus {
    /// Returns the raw wire value.
    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Fault => "FAULT",
            Self::TimedOut => "TIMED_OUT",
            Self::Other(raw) => raw,
        }
    }

    /// Returns `true` if the build will not change status again.
    ///
    /// `IN_PROGRESS` and unrecognized values are non-terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Fault | Self::TimedOut)
    }
}

impl From<&str> for BuildStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "IN_PROGRESS" => Self::InProgress,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "FAULT" => Self::Fault,
            "TIMED_OUT" => Self::TimedOut,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for BuildStatus {
    fn from(raw: String) -> Self {
        match Self::from(raw.as_str()) {
            Self::Other(_) => Self::Other(raw),
            known => known,
        }
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        match status {
            BuildStatus::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Environment health and status
// ---------------------------------------------------------------------------

/// Coarse health color reported for an environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvironmentHealth {
    Green,
    Yellow,
    Red,
    Grey,
    /// Any value not listed above, verbatim.
    Other(String),
}

impl EnvironmentHealth {
    /// Returns the raw wire value.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Green => "Green",
            Self::Yellow => "Yellow",
            Self::Red => "Red",
            Self::Grey => "Grey",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for EnvironmentHealth {
    fn from(raw: &str) -> Self {
        match raw {
            "Green" => Self::Green,
            "Yellow" => Self::Yellow,
            "Red" => Self::Red,
            "Grey" => Self::Grey,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for EnvironmentHealth {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<EnvironmentHealth> for String {
    fn from(health: EnvironmentHealth) -> Self {
        health.as_str().to_owned()
    }
}

impl std::fmt::Display for EnvironmentHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form lifecycle status of an environment (e.g. `"Ready"`, `"Updating"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentStatus(String);

impl EnvironmentStatus {
    /// Wraps a raw status string. Empty strings are allowed; the provider may
    /// omit the field.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw wire value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` while the environment is being changed by a deployment.
    pub fn is_transitional(&self) -> bool {
        matches!(self.0.as_str(), "Updating" | "Launching")
    }
}

impl std::fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One build invocation as last reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub id: BuildId,
    pub project_name: ProjectName,
    pub status: BuildStatus,
    /// `None` when the provider omitted the start time.
    pub start_time: Option<Timestamp>,
}

impl Record for BuildRecord {
    type Key = BuildId;
    const KIND: ResourceKind = ResourceKind::Build;

    fn key(&self) -> &BuildId {
        &self.id
    }

    fn status_field(&self) -> &str {
        self.status.as_str()
    }
}

/// One deployment environment as last reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    pub name: EnvironmentName,
    pub application_name: ApplicationName,
    pub health: EnvironmentHealth,
    pub status: EnvironmentStatus,
    pub version_label: Option<VersionLabel>,
    pub updated_at: Option<Timestamp>,
}

impl Record for EnvironmentRecord {
    type Key = EnvironmentName;
    const KIND: ResourceKind = ResourceKind::Environment;

    fn key(&self) -> &EnvironmentName {
        &self.name
    }

    // Environments are compared on lifecycle status, not on health.
    fn status_field(&self) -> &str {
        self.status.as_str()
    }
}

/// An application as listed by the environment provider.
///
/// Not watched; only rendered by the `list apps` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub name: ApplicationName,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

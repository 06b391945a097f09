//! Change-detection domain for Beacon.
//!
//! This crate contains every domain concept used to watch build and
//! environment resources: newtype identifiers, records, immutable snapshots,
//! the diff engine, status classification, announcement rendering, chat
//! commands, and the port traits infrastructure crates implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`BuildId`, `EnvironmentName`, etc.) |
//! | [`types`] | `ResourceKind`, `Timestamp` |
//! | [`records`] | `BuildRecord`, `EnvironmentRecord`, status axes, the `Record` trait |
//! | [`snapshot`] | `Snapshot` and the per-kind `SnapshotStore` |
//! | [`diff`] | `ChangeEvent` and the diff engine |
//! | [`classify`] | Status → color/label tables |
//! | [`announce`] | Rendering records and events into chat messages |
//! | [`commands`] | Chat command parsing and the permission table |
//! | [`ports`] | Traits implemented by infrastructure crates |
//! | [`errors`] | Per-port error types and retry policy |

pub mod announce;
pub mod classify;
pub mod commands;
pub mod diff;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod records;
pub mod snapshot;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use announce::{Announce, Announcement, Attachment};
pub use classify::{classify_build, classify_environment, Classification, Color};
pub use commands::{Capability, Command, PermissionTable, User, HELP_TEXT};
pub use diff::{diff, ChangeEvent};
pub use errors::{ControlError, DeliveryError, FetchError, LookupError, RetryPolicy};
pub use identifiers::{
    ApplicationName, BuildId, ChannelId, ChatUserId, EnvironmentName, ProjectName, UserEmail,
    VersionLabel,
};
pub use ports::{
    BuildControl, CommandRequest, CommandService, EnvironmentControl, NotificationSink,
    ResourceFetcher, UserDirectory,
};
pub use records::{
    ApplicationRecord, BuildRecord, BuildStatus, EnvironmentHealth, EnvironmentRecord,
    EnvironmentStatus, Record,
};
pub use snapshot::{Snapshot, SnapshotStore};
pub use types::{ResourceKind, Timestamp};

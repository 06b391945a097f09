//! Beacon chat event source.
//!
//! Receives Slack Events API callbacks over HTTP, verifies their signatures,
//! turns messages addressed to the bot into [`watch::CommandRequest`]s and
//! posts the [`watch::CommandService`] reply back to the originating channel.
//!
//! Slack expects an acknowledgement within three seconds, so every accepted
//! event is answered with `200 OK` first and processed on a tracked task.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details, payload shapes and request signing
//! all live here. The domain sees only `CommandRequest` and `Announcement`.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`signature`] | `v0` HMAC-SHA256 request verification |
//! | [`events`] | Events API envelope and message event shapes |
//! | [`server`] | axum router, handlers, graceful serving |

pub mod events;
pub mod server;
pub mod signature;

pub use server::{router, serve, ListenerState};
pub use signature::{SignatureError, SigningSecret, MAX_CLOCK_SKEW_SECS};

//! Beacon Slack infrastructure adapter.
//!
//! Implements the chat-facing ports defined in the [`watch`] crate
//! ([`NotificationSink`](watch::NotificationSink) and
//! [`UserDirectory`](watch::UserDirectory)) against the Slack Web API.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Slack wire
//! formats, authentication and rate-limit headers are handled here; the
//! domain only ever sees [`Announcement`](watch::Announcement)s and typed
//! errors.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`client`] | `SlackClient`, `SlackConfig`, `SlackError` |
//! | [`wire`] | Request and response shapes of the Web API methods used |

pub mod client;
pub mod wire;

pub use client::{SlackClient, SlackConfig, SlackError, DEFAULT_API_BASE_URL};

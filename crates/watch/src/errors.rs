//! Error and retry-policy types for the Beacon domain.
//!
//! Each port has its own error type so that callers can tell a failed fetch
//! from a failed delivery without inspecting messages. None of these errors is
//! fatal to the process: the poll loop logs them and carries on.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ResourceKind;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means the caller's
        /// own schedule applies (for fetches: the next tick).
        after: Option<Duration>,
    },
    /// The operation must not be retried automatically.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Fetch errors
// ---------------------------------------------------------------------------

/// Failure to list the current records of one resource kind.
///
/// Every variant is retried on the next tick; the variants exist for
/// diagnostics only.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a provider response (DNS, TLS, connection reset).
    #[error("{kind} fetch failed in transport: {message}")]
    Transport { kind: ResourceKind, message: String },

    /// The provider answered with an error (auth, throttling, validation).
    #[error("{kind} fetch rejected by provider: {message}")]
    Provider { kind: ResourceKind, message: String },

    /// The fetch did not finish within the configured timeout.
    #[error("{kind} fetch timed out after {after:?}")]
    Timeout { kind: ResourceKind, after: Duration },
}

impl FetchError {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Transport { kind, .. } | Self::Provider { kind, .. } | Self::Timeout { kind, .. } => {
                *kind
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery errors
// ---------------------------------------------------------------------------

/// Failure to post a message to the chat provider.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The message never reached the provider.
    #[error("message delivery failed in transport: {message}")]
    Transport { message: String },

    /// The provider refused the message (e.g. `channel_not_found`).
    #[error("message rejected by chat provider: {reason}")]
    Rejected { reason: String },

    /// The provider asked the client to slow down.
    #[error("chat provider rate limited the request")]
    RateLimited { retry_after: Option<Duration> },
}

impl DeliveryError {
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::RateLimited { retry_after } => RetryPolicy::Retryable { after: *retry_after },
            Self::Rejected { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Control errors
// ---------------------------------------------------------------------------

/// Failure of a mutating or listing call made on behalf of a chat user.
///
/// Surfaced to the requesting user; never retried.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("{operation} failed: {message}")]
    Provider {
        operation: &'static str,
        message: String,
    },

    /// The provider accepted the call but returned nothing usable.
    #[error("{operation} returned an incomplete response: {detail}")]
    IncompleteResponse {
        operation: &'static str,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Lookup errors
// ---------------------------------------------------------------------------

/// Failure to resolve a chat user to an email address.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("user lookup failed: {message}")]
    Failed { message: String },

    #[error("user {user} has no email address on file")]
    NoEmail { user: String },
}

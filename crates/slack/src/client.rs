//! HTTP client for the Slack Web API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};
use watch::{
    Announcement, ChannelId, ChatUserId, DeliveryError, LookupError, NotificationSink,
    UserDirectory, UserEmail,
};

use crate::wire::{ApiResponse, PostMessage, UsersInfoResponse};

/// Base URL of the public Slack Web API.
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

/// Connection settings for [`SlackClient`].
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: String,
    pub api_base_url: String,
    pub timeout: Duration,
}

impl SlackConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Failure to construct a [`SlackClient`].
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Slack Web API client authenticated with a bot token.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(config: SlackConfig) -> Result<Self, SlackError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

// ---------------------------------------------------------------------------
// NotificationSink
// ---------------------------------------------------------------------------

#[async_trait]
impl NotificationSink for SlackClient {
    async fn post(
        &self,
        destination: &ChannelId,
        announcement: &Announcement,
    ) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(self.url("chat.postMessage"))
            .bearer_auth(&self.bot_token)
            .json(&PostMessage::new(destination, announcement))
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after(&response);
            warn!(%destination, ?retry_after, "slack rate limited chat.postMessage");
            return Err(DeliveryError::RateLimited { retry_after });
        }
        if status.is_server_error() {
            return Err(DeliveryError::Transport {
                message: format!("chat.postMessage returned {status}"),
            });
        }

        let body: ApiResponse = response.json().await.map_err(|e| DeliveryError::Transport {
            message: format!("unreadable chat.postMessage response: {e}"),
        })?;
        if body.ok {
            debug!(%destination, "slack message posted");
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                reason: body.error.unwrap_or_else(|| format!("HTTP {status}")),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// UserDirectory
// ---------------------------------------------------------------------------

#[async_trait]
impl UserDirectory for SlackClient {
    async fn email_for(&self, user: &ChatUserId) -> Result<UserEmail, LookupError> {
        let body: UsersInfoResponse = self
            .http
            .get(self.url("users.info"))
            .bearer_auth(&self.bot_token)
            .query(&[("user", user.as_str())])
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| LookupError::Failed {
                message: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| LookupError::Failed {
                message: format!("unreadable users.info response: {e}"),
            })?;

        if !body.ok {
            return Err(LookupError::Failed {
                message: body.error.unwrap_or_else(|| "users.info failed".to_owned()),
            });
        }
        body.user
            .and_then(|u| u.profile.email)
            .and_then(UserEmail::new)
            .ok_or_else(|| LookupError::NoEmail {
                user: user.to_string(),
            })
    }
}

//! Slack Events API payloads.

use serde::Deserialize;
use watch::{ChannelId, ChatUserId, CommandRequest};

/// Outer envelope of every Events API request.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Sent once when the request URL is configured.
    UrlVerification { challenge: String },
    EventCallback { event: MessageEvent },
    #[serde(other)]
    Unsupported,
}

/// The inner event; only the fields used for message routing are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl MessageEvent {
    /// Returns the command addressed to the bot, if this event carries one.
    ///
    /// Mentions in any channel and plain messages in direct-message channels
    /// qualify. Bot messages and edited/deleted/joined subtypes never do.
    pub fn command_request(&self) -> Option<CommandRequest> {
        if self.bot_id.is_some() || self.subtype.is_some() {
            return None;
        }
        let addressed = match self.kind.as_str() {
            "app_mention" => true,
            "message" => self.channel_type.as_deref() == Some("im"),
            _ => false,
        };
        if !addressed {
            return None;
        }
        Some(CommandRequest {
            user: self.user.as_deref().and_then(ChatUserId::new)?,
            channel: self.channel.as_deref().and_then(ChannelId::new)?,
            text: strip_mention(self.text.as_deref().unwrap_or_default()).to_owned(),
        })
    }
}

/// Removes a leading `<@U123>` mention and surrounding whitespace.
pub fn strip_mention(text: &str) -> &str {
    let text = text.trim();
    match text.strip_prefix("<@").and_then(|rest| rest.split_once('>')) {
        Some((_, remainder)) => remainder.trim(),
        None => text,
    }
}

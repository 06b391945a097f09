//! Request and response bodies of the Slack Web API methods Beacon calls.

use serde::{Deserialize, Serialize};
use watch::{Announcement, Attachment, ChannelId};

/// Body of `chat.postMessage`.
#[derive(Debug, Serialize)]
pub struct PostMessage<'a> {
    pub channel: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<WireAttachment<'a>>,
}

impl<'a> PostMessage<'a> {
    pub fn new(channel: &'a ChannelId, announcement: &'a Announcement) -> Self {
        Self {
            channel: channel.as_str(),
            text: &announcement.text,
            attachments: announcement.attachments.iter().map(WireAttachment::from).collect(),
        }
    }
}

/// A legacy secondary attachment, which is what carries the color bar.
#[derive(Debug, Serialize)]
pub struct WireAttachment<'a> {
    pub color: &'static str,
    pub fallback: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<&'a str>,
}

impl<'a> From<&'a Attachment> for WireAttachment<'a> {
    fn from(a: &'a Attachment) -> Self {
        Self {
            color: a.color.hex(),
            fallback: &a.fallback,
            title: a.title.as_deref(),
            text: &a.text,
            footer: a.footer.as_deref(),
        }
    }
}

/// The envelope every Web API method answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `users.info`.
#[derive(Debug, Deserialize)]
pub struct UsersInfoResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub profile: UserProfile,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
}

//! Rendering of records and change events into chat announcements.
//!
//! An [`Announcement`] is transport-neutral: a headline plus an ordered list of
//! [`Attachment`]s. The chat adapter maps it onto its own message format.

use serde::Serialize;

use crate::classify::{classify_build, classify_environment, Classification, Color};
use crate::{ApplicationRecord, BuildRecord, ChangeEvent, EnvironmentRecord, Record, Timestamp};

// ---------------------------------------------------------------------------
// Message shapes
// ---------------------------------------------------------------------------

/// One colored block of a chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub color: Color,
    pub title: Option<String>,
    pub text: String,
    pub footer: Option<String>,
    /// Plain-text summary for clients that cannot render attachments.
    pub fallback: String,
}

impl Attachment {
    /// Creates an attachment with only a color and body text.
    pub fn new(color: Color, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            color,
            title: None,
            fallback: text.clone(),
            text,
            footer: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }
}

/// A complete outbound chat message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Announcement {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl Announcement {
    /// Creates a text-only message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    /// Creates a message consisting only of attachments.
    pub fn attachments(attachments: Vec<Attachment>) -> Self {
        Self {
            text: String::new(),
            attachments,
        }
    }

    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Returns the color of the first attachment, if any.
    pub fn color(&self) -> Option<Color> {
        self.attachments.first().map(|a| a.color)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Records that know how to render themselves and their change events.
pub trait Announce: Record {
    /// Renders the record as it appears in listings and announcements.
    fn attachment(&self) -> Attachment;

    /// Renders the headline for a change event.
    fn headline(event: &ChangeEvent<Self>) -> String;

    /// Renders a complete announcement for a change event.
    fn announce(event: &ChangeEvent<Self>) -> Announcement {
        Announcement::text(Self::headline(event)).with_attachment(event.current().attachment())
    }
}

fn glyph(classification: &Classification) -> &'static str {
    match classification.color {
        Color::Green => " ✓",
        Color::Red => " ×",
        _ => "",
    }
}

fn time_or_dash(ts: Option<Timestamp>) -> String {
    ts.map_or_else(|| "-".to_owned(), |t| t.to_string())
}

impl Announce for BuildRecord {
    fn attachment(&self) -> Attachment {
        let c = classify_build(&self.status);
        Attachment::new(
            c.color,
            format!("{} | {}{}", self.project_name, c.label, glyph(&c)),
        )
        .with_fallback(self.project_name.as_str())
        .with_footer(format!(
            "Started: {} | ID: {}",
            time_or_dash(self.start_time),
            self.id
        ))
    }

    fn headline(event: &ChangeEvent<Self>) -> String {
        match event {
            ChangeEvent::Created(build) => {
                format!("New build started for project `{}`", build.project_name)
            }
            ChangeEvent::Updated { previous, current } => format!(
                "Build status changed for project `{}`: {} → {}",
                current.project_name, previous.status, current.status
            ),
        }
    }
}

impl Announce for EnvironmentRecord {
    fn attachment(&self) -> Attachment {
        let c = classify_environment(&self.health, &self.status);
        Attachment::new(
            c.color,
            format!("App - {}\nStatus - {}{}", self.application_name, c.label, glyph(&c)),
        )
        .with_title(self.name.as_str())
        .with_fallback(self.name.as_str())
        .with_footer(format!(
            "Updated: {} | Version: {}",
            time_or_dash(self.updated_at),
            self.version_label
                .as_ref()
                .map_or("-", |label| label.as_str())
        ))
    }

    fn headline(event: &ChangeEvent<Self>) -> String {
        match event {
            ChangeEvent::Created(env) => format!("New environment detected `{}`", env.name),
            ChangeEvent::Updated { previous, current } => format!(
                "Environment `{}` status changed: {} → {}",
                current.name, previous.status, current.status
            ),
        }
    }
}

impl ApplicationRecord {
    /// Renders the application for the `list apps` command.
    pub fn attachment(&self) -> Attachment {
        Attachment::new(Color::Green, self.name.as_str()).with_footer(format!(
            "Created: {} | Updated: {}",
            time_or_dash(self.created_at),
            time_or_dash(self.updated_at)
        ))
    }
}

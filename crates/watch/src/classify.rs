//! Status classification: maps a status value to a severity color and label.
//!
//! These are pure functions over closed enumerations. The same tables drive
//! change announcements and the read-only chat commands, so a build looks the
//! same whether it was announced or listed.

use serde::{Deserialize, Serialize};

use crate::{BuildStatus, EnvironmentHealth, EnvironmentStatus};

/// Severity color of a rendered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Color {
    Green,
    Amber,
    Red,
    Grey,
    /// Used while an environment is being changed, whatever its health.
    InfoBlue,
}

impl Color {
    /// Returns the hex color used for chat attachments.
    pub fn hex(self) -> &'static str {
        match self {
            Self::Green => "#7CD197",
            Self::Amber => "#F9A825",
            Self::Red => "#C62828",
            Self::Grey => "#9E9E9E",
            Self::InfoBlue => "#1565C0",
        }
    }
}

/// Result of classifying one status value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub color: Color,
    pub label: String,
}

impl Classification {
    fn new(color: Color, label: impl Into<String>) -> Self {
        Self {
            color,
            label: label.into(),
        }
    }
}

/// Classifies a build status.
///
/// `IN_PROGRESS` and every unrecognized value render as amber "In Progress".
pub fn classify_build(status: &BuildStatus) -> Classification {
    match status {
        BuildStatus::Succeeded => Classification::new(Color::Green, "Succeeded"),
        BuildStatus::Failed => Classification::new(Color::Red, "Failed"),
        BuildStatus::Fault => Classification::new(Color::Red, "Fault"),
        BuildStatus::TimedOut => Classification::new(Color::Red, "Timed Out"),
        BuildStatus::InProgress | BuildStatus::Other(_) => {
            Classification::new(Color::Amber, "In Progress")
        }
    }
}

/// Classifies an environment from its health and lifecycle status.
///
/// A transitional status (`Updating`, `Launching`) overrides the health color
/// with [`Color::InfoBlue`] and appends the status to the label.
pub fn classify_environment(
    health: &EnvironmentHealth,
    status: &EnvironmentStatus,
) -> Classification {
    let base = match health {
        EnvironmentHealth::Green => Classification::new(Color::Green, "Functional"),
        EnvironmentHealth::Yellow => Classification::new(Color::Amber, "Warning"),
        EnvironmentHealth::Red => Classification::new(Color::Red, "Fault"),
        EnvironmentHealth::Grey | EnvironmentHealth::Other(_) => {
            Classification::new(Color::Grey, "Unknown")
        }
    };

    if status.is_transitional() {
        Classification::new(Color::InfoBlue, format!("{} ({}…)", base.label, status))
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_table() {
        let cases = [
            ("SUCCEEDED", Color::Green, "Succeeded"),
            ("FAILED", Color::Red, "Failed"),
            ("FAULT", Color::Red, "Fault"),
            ("TIMED_OUT", Color::Red, "Timed Out"),
            ("IN_PROGRESS", Color::Amber, "In Progress"),
            ("STOPPED", Color::Amber, "In Progress"),
            ("", Color::Amber, "In Progress"),
        ];
        for (raw, color, label) in cases {
            let c = classify_build(&BuildStatus::from(raw));
            assert_eq!((c.color, c.label.as_str()), (color, label), "status {raw:?}");
        }
    }

    #[test]
    fn environment_table_for_settled_statuses() {
        let ready = EnvironmentStatus::new("Ready");
        let cases = [
            ("Green", Color::Green, "Functional"),
            ("Yellow", Color::Amber, "Warning"),
            ("Red", Color::Red, "Fault"),
            ("Grey", Color::Grey, "Unknown"),
            ("Purple", Color::Grey, "Unknown"),
        ];
        for (raw, color, label) in cases {
            let c = classify_environment(&EnvironmentHealth::from(raw), &ready);
            assert_eq!((c.color, c.label.as_str()), (color, label), "health {raw:?}");
        }
    }

    #[test]
    fn transitional_status_forces_info_blue() {
        for health in ["Green", "Red", "Grey"] {
            let c = classify_environment(
                &EnvironmentHealth::from(health),
                &EnvironmentStatus::new("Updating"),
            );
            assert_eq!(c.color, Color::InfoBlue);
            assert!(c.label.ends_with("(Updating…)"), "{}", c.label);
        }

        let launching =
            classify_environment(&EnvironmentHealth::Green, &EnvironmentStatus::new("Launching"));
        assert_eq!(launching.label, "Functional (Launching…)");
    }

    #[test]
    fn classification_is_deterministic() {
        let status = BuildStatus::from("FAULT");
        assert_eq!(classify_build(&status), classify_build(&status));

        let health = EnvironmentHealth::Yellow;
        let status = EnvironmentStatus::new("Launching");
        assert_eq!(
            classify_environment(&health, &status),
            classify_environment(&health, &status)
        );
    }
}

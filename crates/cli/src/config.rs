//! `beacon.toml` loading and validation.
//!
//! The process never starts with an invalid configuration: every check runs
//! in [`Config::load`] before any task is spawned.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cloud::{SourceBundle, APPLICATION_PLACEHOLDER, DEFAULT_BUILD_WINDOW};
use monitor::{CycleOptions, DeliveryMode, OverlapPolicy};
use serde::Deserialize;
use thiserror::Error;
use watch::{PermissionTable, User};

/// Environment variable that overrides `slack.bot_token`.
pub const BOT_TOKEN_ENV: &str = "BEACON_SLACK_BOT_TOKEN";
/// Environment variable that overrides `slack.signing_secret`.
pub const SIGNING_SECRET_ENV: &str = "BEACON_SLACK_SIGNING_SECRET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse permission table {path}: {source}")]
    Users {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub slack: SlackSection,
    pub aws: AwsSection,
    #[serde(default)]
    pub watch: WatchSection,
    #[serde(default)]
    pub listener: ListenerSection,
    #[serde(default)]
    pub telemetry: TelemetrySection,
    #[serde(default)]
    pub permissions: PermissionsSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlackSection {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub signing_secret: String,
    pub announce_channel: String,
    #[serde(default)]
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsSection {
    pub region: String,
    #[serde(default = "default_build_window")]
    pub build_window: usize,
    pub rebuild: RebuildSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RebuildSection {
    pub bundle_bucket: String,
    pub bundle_key: String,
}

impl RebuildSection {
    pub fn source_bundle(&self) -> SourceBundle {
        SourceBundle {
            bucket: self.bundle_bucket.clone(),
            key_template: self.bundle_key.clone(),
        }
    }
}

/// How announcements are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryKind {
    #[default]
    AtMostOnce,
    AtLeastOnce,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchSection {
    pub interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub suppress_initial_announcements: bool,
    pub overlap: OverlapPolicy,
    pub delivery: DeliveryKind,
    pub delivery_attempts: u32,
    pub delivery_backoff_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            fetch_timeout_secs: 30,
            suppress_initial_announcements: false,
            overlap: OverlapPolicy::Skip,
            delivery: DeliveryKind::AtMostOnce,
            delivery_attempts: 3,
            delivery_backoff_ms: 500,
        }
    }
}

impl WatchSection {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cycle_options(&self) -> CycleOptions {
        CycleOptions {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            overlap: self.overlap,
            suppress_initial: self.suppress_initial_announcements,
        }
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        match self.delivery {
            DeliveryKind::AtMostOnce => DeliveryMode::AtMostOnce,
            DeliveryKind::AtLeastOnce => DeliveryMode::AtLeastOnce {
                attempts: self.delivery_attempts,
                backoff: Duration::from_millis(self.delivery_backoff_ms),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerSection {
    pub bind: SocketAddr,
}

impl Default for ListenerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySection {
    pub format: LogFormat,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PermissionsSection {
    /// Relative paths resolve against the directory of the config file.
    pub users_file: PathBuf,
}

impl Default for PermissionsSection {
    fn default() -> Self {
        Self {
            users_file: PathBuf::from("users.json"),
        }
    }
}

fn default_build_window() -> usize {
    DEFAULT_BUILD_WINDOW
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Reads, overrides from the process environment, and validates `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let mut config = Self::parse(&raw, path)?;
        config.apply_env(|name| std::env::var(name).ok());
        if config.permissions.users_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.permissions.users_file = dir.join(&config.permissions.users_file);
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Replaces secrets with values found through `lookup`, when set and non-empty.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(BOT_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.slack.bot_token = token;
        }
        if let Some(secret) = lookup(SIGNING_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.slack.signing_secret = secret;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("slack.bot_token", &self.slack.bot_token),
            ("slack.signing_secret", &self.slack.signing_secret),
            ("slack.announce_channel", &self.slack.announce_channel),
            ("aws.region", &self.aws.region),
            ("aws.rebuild.bundle_bucket", &self.aws.rebuild.bundle_bucket),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }
        if !self.aws.rebuild.bundle_key.contains(APPLICATION_PLACEHOLDER) {
            return Err(invalid(
                "aws.rebuild.bundle_key",
                format!("must contain {APPLICATION_PLACEHOLDER}"),
            ));
        }
        if self.aws.build_window == 0 {
            return Err(invalid("aws.build_window", "must be at least 1"));
        }
        if self.watch.interval_secs == 0 {
            return Err(invalid("watch.interval_secs", "must be at least 1"));
        }
        if self.watch.fetch_timeout_secs == 0 {
            return Err(invalid("watch.fetch_timeout_secs", "must be at least 1"));
        }
        if self.watch.delivery == DeliveryKind::AtLeastOnce && self.watch.delivery_attempts == 0 {
            return Err(invalid(
                "watch.delivery_attempts",
                "must be at least 1 for at-least-once delivery",
            ));
        }
        Ok(())
    }

    /// Loads the permission table named by `permissions.users_file`.
    ///
    /// A missing file yields an empty table; nobody may mutate anything.
    pub fn load_permissions(&self) -> Result<PermissionTable, ConfigError> {
        let path = &self.permissions.users_file;
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PermissionTable::default())
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.clone(),
                    source,
                })
            }
        };
        let users: Vec<User> = serde_json::from_str(&raw).map_err(|source| ConfigError::Users {
            path: path.clone(),
            source,
        })?;
        Ok(PermissionTable::new(users))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;
    use watch::{Capability, UserEmail};

    use super::*;

    const MINIMAL: &str = r#"
[slack]
bot_token = "xoxb-file"
signing_secret = "secret"
announce_channel = "C0123"

[aws]
region = "us-east-1"

[aws.rebuild]
bundle_bucket = "dockerrun"
bundle_key = "{application}/Dockerrun.aws.json"
"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn parse(raw: &str) -> Config {
        Config::parse(raw, Path::new("beacon.toml")).unwrap()
    }

    #[test]
    fn minimal_file_gets_defaults() {
        let config = parse(MINIMAL);

        config.validate().unwrap();
        assert_eq!(config.watch.interval(), Duration::from_secs(10));
        assert_eq!(config.watch.cycle_options(), CycleOptions::default());
        assert_eq!(config.watch.delivery_mode(), DeliveryMode::AtMostOnce);
        assert_eq!(config.listener.bind.port(), 3000);
        assert_eq!(config.telemetry.format, LogFormat::Json);
        assert_eq!(config.aws.build_window, DEFAULT_BUILD_WINDOW);
    }

    #[test]
    fn watch_section_maps_onto_runtime_options() {
        let config = parse(&format!(
            "{MINIMAL}
[watch]
interval_secs = 5
overlap = \"queue\"
suppress_initial_announcements = true
delivery = \"at-least-once\"
delivery_attempts = 4
delivery_backoff_ms = 250
"
        ));

        let options = config.watch.cycle_options();
        assert_eq!(options.overlap, OverlapPolicy::Queue);
        assert!(options.suppress_initial);
        assert_eq!(
            config.watch.delivery_mode(),
            DeliveryMode::AtLeastOnce {
                attempts: 4,
                backoff: Duration::from_millis(250)
            }
        );
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            ("[watch]\ninterval_secs = 0", "watch.interval_secs"),
            ("[watch]\nfetch_timeout_secs = 0", "watch.fetch_timeout_secs"),
            (
                "[watch]\ndelivery = \"at-least-once\"\ndelivery_attempts = 0",
                "watch.delivery_attempts",
            ),
        ];
        for (extra, expected) in cases {
            let err = parse(&format!("{MINIMAL}\n{extra}\n")).validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { field, .. } if field == expected),
                "{extra}"
            );
        }

        let mut config = parse(MINIMAL);
        config.aws.rebuild.bundle_key = "Dockerrun.aws.json".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "aws.rebuild.bundle_key", .. })
        ));

        let mut config = parse(MINIMAL);
        config.slack.announce_channel = " ".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "slack.announce_channel", .. })
        ));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let err = Config::parse(
            &format!("{MINIMAL}\n[watch]\nintervall_secs = 3\n"),
            Path::new("beacon.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn environment_overrides_secrets() {
        let mut config = parse(MINIMAL);
        config.apply_env(|name| match name {
            BOT_TOKEN_ENV => Some("xoxb-env".to_owned()),
            SIGNING_SECRET_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.slack.bot_token, "xoxb-env");
        assert_eq!(config.slack.signing_secret, "secret");
    }

    #[test]
    fn loads_permissions_next_to_the_config_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "beacon.toml", MINIMAL);
        write(
            &dir,
            "users.json",
            r#"[{"email":"ops@example.com","permissions":["rebuild-env"]}]"#,
        );

        let config = Config::load(&path).unwrap();
        let table = config.load_permissions().unwrap();

        let ops = table.find(&UserEmail::new("ops@example.com").unwrap());
        assert!(ops.can(Capability::RebuildEnv));
        assert!(!ops.can(Capability::StartBuild));
    }

    #[test]
    fn missing_permission_file_means_nobody_is_privileged() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "beacon.toml", MINIMAL);

        let table = Config::load(&path).unwrap().load_permissions().unwrap();

        assert!(table.is_empty());
    }

    #[test]
    fn malformed_permission_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "beacon.toml", MINIMAL);
        write(&dir, "users.json", "{ not json");

        let err = Config::load(&path).unwrap().load_permissions().unwrap_err();

        assert!(matches!(err, ConfigError::Users { .. }));
    }
}

//! AWS Elastic Beanstalk adapter.
//!
//! A rebuild registers a new application version from a fixed S3 source
//! bundle under a fresh UUID label and then points the environment at it.
//! The environment's later `Updating` → `Ready` transition is picked up by
//! the environment watch like any other change.

use async_trait::async_trait;
use aws_sdk_elasticbeanstalk::types::{ApplicationDescription, EnvironmentDescription, S3Location};
use aws_sdk_elasticbeanstalk::Client;
use tracing::{debug, info, warn};
use uuid::Uuid;
use watch::{
    ApplicationName, ApplicationRecord, ControlError, EnvironmentControl, EnvironmentHealth,
    EnvironmentName, EnvironmentRecord, EnvironmentStatus, FetchError, ResourceFetcher,
    ResourceKind, VersionLabel,
};

use crate::errors::{control_error, fetch_error};
use crate::timestamp;

/// Placeholder in [`SourceBundle::key_template`] replaced by the application name.
pub const APPLICATION_PLACEHOLDER: &str = "{application}";

/// Location of the deployable bundle used for rebuilds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBundle {
    pub bucket: String,
    /// Object key; every `{application}` is replaced by the application name.
    pub key_template: String,
}

impl SourceBundle {
    pub fn key_for(&self, application: &ApplicationName) -> String {
        self.key_template
            .replace(APPLICATION_PLACEHOLDER, application.as_str())
    }

    fn location(&self, application: &ApplicationName) -> S3Location {
        S3Location::builder()
            .s3_bucket(&self.bucket)
            .s3_key(self.key_for(application))
            .build()
    }
}

/// Beanstalk-backed environment fetcher and environment control.
#[derive(Debug, Clone)]
pub struct BeanstalkAdapter {
    client: Client,
    bundle: SourceBundle,
}

impl BeanstalkAdapter {
    pub fn new(client: Client, bundle: SourceBundle) -> Self {
        Self { client, bundle }
    }

    pub fn from_conf(config: &aws_config::SdkConfig, bundle: SourceBundle) -> Self {
        Self::new(Client::new(config), bundle)
    }
}

/// Converts one SDK environment; entries without a name or application are skipped.
pub fn environment_record(env: &EnvironmentDescription) -> Option<EnvironmentRecord> {
    let name = env.environment_name().and_then(EnvironmentName::new);
    let application_name = env.application_name().and_then(ApplicationName::new);
    let (Some(name), Some(application_name)) = (name, application_name) else {
        warn!(name = ?env.environment_name(), "skipping Beanstalk environment without name or application");
        return None;
    };
    Some(EnvironmentRecord {
        name,
        application_name,
        health: env
            .health()
            .map_or(EnvironmentHealth::Grey, |h| EnvironmentHealth::from(h.as_str())),
        status: EnvironmentStatus::new(env.status().map_or("", |s| s.as_str())),
        version_label: env.version_label().and_then(VersionLabel::new),
        updated_at: env.date_updated().and_then(timestamp),
    })
}

/// Converts one SDK application description.
pub fn application_record(app: &ApplicationDescription) -> Option<ApplicationRecord> {
    Some(ApplicationRecord {
        name: app.application_name().and_then(ApplicationName::new)?,
        created_at: app.date_created().and_then(timestamp),
        updated_at: app.date_updated().and_then(timestamp),
    })
}

#[async_trait]
impl ResourceFetcher<EnvironmentRecord> for BeanstalkAdapter {
    async fn list(&self) -> Result<Vec<EnvironmentRecord>, FetchError> {
        let mut records = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .describe_environments()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| fetch_error(ResourceKind::Environment, e))?;
            records.extend(page.environments().iter().filter_map(environment_record));
            next_token = page.next_token().map(str::to_owned);
            if next_token.is_none() {
                break;
            }
        }
        debug!(count = records.len(), "listed Beanstalk environments");
        Ok(records)
    }
}

#[async_trait]
impl EnvironmentControl for BeanstalkAdapter {
    async fn list_applications(&self) -> Result<Vec<ApplicationRecord>, ControlError> {
        let output = self
            .client
            .describe_applications()
            .send()
            .await
            .map_err(|e| control_error("DescribeApplications", e))?;
        Ok(output.applications().iter().filter_map(application_record).collect())
    }

    async fn rebuild_environment(
        &self,
        application: &ApplicationName,
        environment: &EnvironmentName,
    ) -> Result<VersionLabel, ControlError> {
        let raw_label = Uuid::new_v4().to_string();
        let label = VersionLabel::new(raw_label.as_str()).ok_or_else(|| {
            ControlError::IncompleteResponse {
                operation: "CreateApplicationVersion",
                detail: "empty version label".to_owned(),
            }
        })?;

        self.client
            .create_application_version()
            .application_name(application.as_str())
            .version_label(raw_label.as_str())
            .source_bundle(self.bundle.location(application))
            .auto_create_application(true)
            .process(true)
            .send()
            .await
            .map_err(|e| control_error("CreateApplicationVersion", e))?;

        self.client
            .update_environment()
            .environment_name(environment.as_str())
            .version_label(raw_label.as_str())
            .send()
            .await
            .map_err(|e| control_error("UpdateEnvironment", e))?;

        info!(%application, %environment, version = %label, "environment rebuild requested");
        Ok(label)
    }
}

//! AWS CodeBuild adapter.

use async_trait::async_trait;
use aws_sdk_codebuild::operation::start_build::StartBuildOutput;
use aws_sdk_codebuild::types::{Build, SortOrderType};
use aws_sdk_codebuild::Client;
use tracing::{debug, warn};
use watch::{
    BuildControl, BuildId, BuildRecord, BuildStatus, ControlError, FetchError, ProjectName,
    ResourceFetcher, ResourceKind,
};

use crate::errors::{control_error, fetch_error};
use crate::timestamp;

/// Number of most recent builds watched when not configured otherwise.
pub const DEFAULT_BUILD_WINDOW: usize = 100;

/// `BatchGetBuilds` accepts at most this many ids per call.
const BATCH_LIMIT: usize = 100;

/// CodeBuild-backed build fetcher and build control.
#[derive(Debug, Clone)]
pub struct CodeBuildAdapter {
    client: Client,
    window: usize,
}

impl CodeBuildAdapter {
    pub fn new(client: Client, window: usize) -> Self {
        Self {
            client,
            window: window.max(1),
        }
    }

    pub fn from_conf(config: &aws_config::SdkConfig, window: usize) -> Self {
        Self::new(Client::new(config), window)
    }

    /// Ids of the most recent `window` builds, newest first.
    async fn recent_build_ids(&self) -> Result<Vec<String>, FetchError> {
        let mut ids = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .list_builds()
                .sort_order(SortOrderType::Descending)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| fetch_error(ResourceKind::Build, e))?;
            ids.extend(page.ids().iter().cloned());
            next_token = page.next_token().map(str::to_owned);
            if ids.len() >= self.window || next_token.is_none() {
                break;
            }
        }
        ids.truncate(self.window);
        Ok(ids)
    }
}

/// Converts one SDK build; entries without an id or project are skipped.
pub fn build_record(build: &Build) -> Option<BuildRecord> {
    let id = build.id().and_then(BuildId::new);
    let project_name = build.project_name().and_then(ProjectName::new);
    let (Some(id), Some(project_name)) = (id, project_name) else {
        warn!(id = ?build.id(), "skipping CodeBuild build without id or project");
        return None;
    };
    Some(BuildRecord {
        id,
        project_name,
        status: build
            .build_status()
            .map_or(BuildStatus::Other(String::new()), |s| BuildStatus::from(s.as_str())),
        start_time: build.start_time().and_then(timestamp),
    })
}

/// The build a `StartBuild` call reports having queued.
fn started_build(output: &StartBuildOutput) -> Result<BuildRecord, ControlError> {
    output
        .build_value()
        .and_then(build_record)
        .ok_or_else(|| ControlError::IncompleteResponse {
            operation: "StartBuild",
            detail: "no build in response".to_owned(),
        })
}

#[async_trait]
impl ResourceFetcher<BuildRecord> for CodeBuildAdapter {
    async fn list(&self) -> Result<Vec<BuildRecord>, FetchError> {
        let ids = self.recent_build_ids().await?;
        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(BATCH_LIMIT) {
            let batch = self
                .client
                .batch_get_builds()
                .set_ids(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| fetch_error(ResourceKind::Build, e))?;
            // BatchGetBuilds does not promise to preserve request order.
            let mut builds: Vec<BuildRecord> = batch.builds().iter().filter_map(build_record).collect();
            builds.sort_by_key(|b| chunk.iter().position(|id| id == b.id.as_str()));
            records.extend(builds);
        }
        records.reverse();
        debug!(count = records.len(), "listed CodeBuild builds");
        Ok(records)
    }
}

#[async_trait]
impl BuildControl for CodeBuildAdapter {
    async fn list_projects(&self) -> Result<Vec<ProjectName>, ControlError> {
        let mut projects = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .list_projects()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| control_error("ListProjects", e))?;
            projects.extend(page.projects().iter().filter_map(|p| ProjectName::new(p.as_str())));
            next_token = page.next_token().map(str::to_owned);
            if next_token.is_none() {
                return Ok(projects);
            }
        }
    }

    async fn start_build(&self, project: &ProjectName) -> Result<BuildRecord, ControlError> {
        let output = self
            .client
            .start_build()
            .project_name(project.as_str())
            .send()
            .await
            .map_err(|e| control_error("StartBuild", e))?;
        started_build(&output)
    }

    async fn delete_build(&self, id: &BuildId) -> Result<(), ControlError> {
        let output = self
            .client
            .batch_delete_builds()
            .ids(id.as_str())
            .send()
            .await
            .map_err(|e| control_error("BatchDeleteBuilds", e))?;
        match output.builds_not_deleted().first() {
            None => Ok(()),
            Some(failed) => Err(ControlError::Provider {
                operation: "BatchDeleteBuilds",
                message: failed.status_code().unwrap_or("build not deleted").to_owned(),
            }),
        }
    }
}

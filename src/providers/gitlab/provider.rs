use chrono::NaiveDate;
use log::{debug, info};

use crate::config::{FetchConfig, InstanceConfig, ProjectRef};
use crate::error::Result;
use crate::pipelines::{Pipeline, Project};
use crate::providers::gitlab::client::GitLabClient;

/// Running-pipeline source for one GitLab instance.
pub struct GitLabProvider {
    pub client: GitLabClient,
    /// Instance base URL, used to label failures
    pub instance: String,
}

impl GitLabProvider {
    /// Creates a provider for a configured instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance URL cannot be turned into an API URL.
    pub fn new(instance: &InstanceConfig, fetch: &FetchConfig) -> Result<Self> {
        let client = GitLabClient::new(&instance.url, instance.private_token.clone(), fetch)?;

        Ok(Self {
            client,
            instance: instance.url.clone(),
        })
    }

    /// Fetches the running pipelines of one project together with their jobs.
    ///
    /// Pipelines are returned in backend order. A pipeline whose job list
    /// comes back empty is left out: it has nothing to show yet.
    ///
    /// # Errors
    ///
    /// Returns the first transport, decode or unknown-status error; the
    /// project's pipelines are then discarded as a whole.
    pub async fn fetch_project(
        &self,
        name: &str,
        id: &ProjectRef,
        updated_after: NaiveDate,
    ) -> Result<Vec<Pipeline>> {
        let records = self.client.fetch_running_pipelines(id, updated_after).await?;

        info!(
            "{}: {} running pipelines for {name} since {updated_after}",
            self.instance,
            records.len()
        );

        let mut pipelines = Vec::with_capacity(records.len());

        for record in records {
            let jobs = self.client.fetch_pipeline_jobs(id, record.id).await?;

            if jobs.is_empty() {
                debug!("Skipping pipeline {} of {name}: no jobs", record.id);
                continue;
            }

            let project = Project {
                name: name.to_string(),
                id: id.clone(),
            };
            let mut pipeline = Pipeline::new(project, &record);
            pipeline.add_jobs(jobs)?;
            pipelines.push(pipeline);
        }

        Ok(pipelines)
    }
}

use chrono::NaiveDate;

use super::core::GitLabClient;
use crate::config::ProjectRef;
use crate::error::Result;
use crate::providers::gitlab::types::{JobRecord, PipelineRecord};

impl GitLabClient {
    /// Running pipelines of a project updated on or after `updated_after`.
    ///
    /// Only the first page is requested.
    pub async fn fetch_running_pipelines(
        &self,
        project: &ProjectRef,
        updated_after: NaiveDate,
    ) -> Result<Vec<PipelineRecord>> {
        let url = self.project_url(
            project,
            &["pipelines"],
            &[
                ("scope", "running".to_string()),
                ("per_page", self.per_page.to_string()),
                ("updated_after", updated_after.format("%Y-%m-%d").to_string()),
            ],
        )?;

        self.get_json(url).await
    }

    /// Jobs of a pipeline, newest job first.
    pub async fn fetch_pipeline_jobs(
        &self,
        project: &ProjectRef,
        pipeline_id: u64,
    ) -> Result<Vec<JobRecord>> {
        let pipeline_id = pipeline_id.to_string();
        let url = self.project_url(
            project,
            &["pipelines", pipeline_id.as_str(), "jobs"],
            &[
                ("per_page", self.per_page.to_string()),
                ("sort", "desc".to_string()),
                ("order_by", "id".to_string()),
            ],
        )?;

        self.get_json(url).await
    }
}

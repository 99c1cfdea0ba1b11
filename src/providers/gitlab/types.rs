use serde::Deserialize;

/// A pipeline as returned by `GET /projects/:id/pipelines`.
///
/// Only the fields the status bar needs are decoded; a missing field is a
/// decode error rather than a silent default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineRecord {
    /// Numeric pipeline ID
    pub id: u64,
    /// Commit SHA the pipeline runs for
    pub sha: String,
    /// Git reference that triggered the pipeline (e.g., "main")
    #[serde(rename = "ref")]
    pub ref_: String,
}

/// A job as returned by `GET /projects/:id/pipelines/:pipeline_id/jobs`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobRecord {
    /// Stage this job belongs to
    pub stage: String,
    /// Job name as defined in .gitlab-ci.yml
    pub name: String,
    /// Raw status string, validated when the job is built
    pub status: String,
    /// Elapsed seconds, null while the job has not finished
    #[serde(deserialize_with = "Option::deserialize")]
    pub duration: Option<f64>,
    /// Commit the job runs for, null on some synthetic jobs
    #[serde(deserialize_with = "Option::deserialize")]
    pub commit: Option<CommitRecord>,
    /// Link to the job page
    pub web_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitRecord {
    // Nullable but not optional: the key itself must be present
    #[serde(deserialize_with = "Option::deserialize")]
    pub title: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub author_email: Option<String>,
}

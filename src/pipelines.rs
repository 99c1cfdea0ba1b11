use serde::Serialize;

use crate::config::ProjectRef;
use crate::error::Result;
use crate::providers::gitlab::types::{JobRecord, PipelineRecord};
use crate::status::JobStatus;

/// Shown instead of running jobs when a pipeline has none, and as the whole
/// menu bar when nothing is running.
pub const IDLE_ICON: &str = "💤";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub id: ProjectRef,
}

/// A single job of a running pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    /// `stage` or `stage: name` when the two differ
    pub name: String,
    pub status: JobStatus,
    /// Whole seconds; 0 when unknown or still running
    pub duration: u64,
    pub commit_title: Option<String>,
    pub commit_author: Option<String>,
    pub url: String,
}

impl Job {
    /// Builds a job from its API record.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStatus` if the record carries a status outside the
    /// known set.
    pub fn from_record(record: JobRecord) -> Result<Self> {
        let status: JobStatus = record.status.parse()?;

        let name = if record.name == record.stage {
            record.stage
        } else {
            format!("{}: {}", record.stage, record.name)
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let duration = match record.duration {
            Some(seconds) if !status.is_running() => seconds as u64,
            _ => 0,
        };

        let (commit_title, commit_author) = record
            .commit
            .map(|commit| (commit.title, commit.author_email))
            .unwrap_or_default();

        Ok(Self {
            name,
            status,
            duration,
            commit_title,
            commit_author,
            url: record.web_url,
        })
    }

    /// Job name with the duration appended once it is known.
    pub fn display_name(&self) -> String {
        if self.duration > 0 {
            format!("{} {}s", self.name, self.duration)
        } else {
            self.name.clone()
        }
    }
}

/// A running pipeline with its jobs.
///
/// `jobs` is ordered by status string, descending. `running_jobs` keeps the
/// order in which jobs were ingested.
#[derive(Debug, Clone, Serialize)]
pub struct Pipeline {
    pub project: Project,
    pub id: u64,
    pub sha: String,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub jobs: Vec<Job>,
    pub running_jobs: Vec<Job>,
    pub commit_title: Option<String>,
    pub commit_author: Option<String>,
}

impl Pipeline {
    pub fn new(project: Project, record: &PipelineRecord) -> Self {
        Self {
            project,
            id: record.id,
            sha: record.sha.clone(),
            ref_: record.ref_.clone(),
            jobs: Vec::new(),
            running_jobs: Vec::new(),
            commit_title: None,
            commit_author: None,
        }
    }

    /// Ingests job records in API order and re-sorts the job list.
    ///
    /// Commit title and author are taken from the first job that has them
    /// and never overwritten afterwards.
    ///
    /// # Errors
    ///
    /// Fails on the first record with an unknown status.
    pub fn add_jobs(&mut self, records: Vec<JobRecord>) -> Result<()> {
        for record in records {
            let job = Job::from_record(record)?;

            if self.commit_title.is_none() {
                self.commit_title.clone_from(&job.commit_title);
            }
            if self.commit_author.is_none() {
                self.commit_author.clone_from(&job.commit_author);
            }

            if job.status.is_running() {
                self.running_jobs.push(job.clone());
            }

            self.jobs.push(job);
        }

        // Plain string order, not a priority table; sort_by is stable
        self.jobs
            .sort_by(|a, b| b.status.as_str().cmp(a.status.as_str()));

        Ok(())
    }

    /// `<project> - <ref> (<running jobs>)`, with the idle icon when nothing runs.
    pub fn display_name(&self) -> String {
        let jobs = if self.running_jobs.is_empty() {
            IDLE_ICON.to_string()
        } else {
            self.running_jobs
                .iter()
                .map(Job::display_name)
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!("{} - {} ({jobs})", self.project.name, self.ref_)
    }

    pub fn is_authored_by(&self, identity: &str) -> bool {
        self.commit_author.as_deref() == Some(identity)
    }
}

/// Pipelines split by commit author.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub mine: Vec<&'a Pipeline>,
    pub other: Vec<&'a Pipeline>,
}

/// Splits pipelines into the viewer's own and everybody else's, keeping order.
///
/// Without a self identity every pipeline lands in `other`.
pub fn partition<'a>(pipelines: &'a [Pipeline], self_identity: Option<&str>) -> Partition<'a> {
    let (mine, other): (Vec<_>, Vec<_>) = pipelines
        .iter()
        .partition(|p| self_identity.is_some_and(|identity| p.is_authored_by(identity)));

    Partition { mine, other }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CiBarError;

/// Status of a GitLab CI job as reported by the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Pending,
    Running,
    Failed,
    Success,
    Skipped,
    Manual,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Created,
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Failed,
        JobStatus::Success,
        JobStatus::Skipped,
        JobStatus::Manual,
    ];

    /// Backend spelling of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Failed => "failed",
            JobStatus::Success => "success",
            JobStatus::Skipped => "skipped",
            JobStatus::Manual => "manual",
        }
    }

    /// Glyph shown next to a job in the dropdown menu.
    pub fn icon(self) -> &'static str {
        match self {
            JobStatus::Created | JobStatus::Pending | JobStatus::Manual => "💤",
            JobStatus::Running | JobStatus::Skipped => "🚀",
            JobStatus::Failed => "❗",
            JobStatus::Success => "✔️",
        }
    }

    pub fn is_running(self) -> bool {
        self == JobStatus::Running
    }
}

impl FromStr for JobStatus {
    type Err = CiBarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CiBarError::UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_table() {
        let icons: Vec<_> = JobStatus::ALL
            .iter()
            .map(|s| (s.as_str(), s.icon()))
            .collect();

        assert_eq!(
            icons,
            vec![
                ("created", "💤"),
                ("pending", "💤"),
                ("running", "🚀"),
                ("failed", "❗"),
                ("success", "✔️"),
                ("skipped", "🚀"),
                ("manual", "💤"),
            ]
        );
    }

    #[test]
    fn test_parse_known_status() {
        assert_eq!("running".parse::<JobStatus>().unwrap(), JobStatus::Running);
        assert_eq!("manual".parse::<JobStatus>().unwrap(), JobStatus::Manual);
    }

    #[test]
    fn test_parse_unknown_status_fails() {
        let err = "canceled".parse::<JobStatus>().unwrap_err();
        assert!(matches!(err, CiBarError::UnknownStatus(ref s) if s == "canceled"));

        // Case matters: the backend only sends lowercase
        assert!("Running".parse::<JobStatus>().is_err());
        assert!("".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_deserialize_rejects_unknown_status() {
        assert!(serde_json::from_str::<JobStatus>("\"waiting_for_resource\"").is_err());
        assert_eq!(
            serde_json::from_str::<JobStatus>("\"success\"").unwrap(),
            JobStatus::Success
        );
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::job::JobSummary;
use super::profile::Profile;
use super::resume::Resume;

/// Application pipeline status. Earlier page revisions wrote free-text
/// values ("Submitted", "Under Review", "Interview Scheduled"); those parse
/// onto the canonical variants so old rows stay readable. Strings that match
/// nothing are carried through verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationStatus {
    Applied,
    Reviewing,
    Interviewing,
    Hired,
    Rejected,
    Other(String),
}

impl ApplicationStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Applied => "applied",
            Self::Reviewing => "reviewing",
            Self::Interviewing => "interviewing",
            Self::Hired => "hired",
            Self::Rejected => "rejected",
            Self::Other(s) => s,
        }
    }

    /// Whether this is one of the canonical pipeline states a recruiter can
    /// set from the applicant view.
    #[must_use]
    pub const fn is_canonical(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for ApplicationStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "applied" | "submitted" => Self::Applied,
            "reviewing" | "under review" => Self::Reviewing,
            "interviewing" | "interview scheduled" => Self::Interviewing,
            "hired" => Self::Hired,
            "rejected" => Self::Rejected,
            _ => Self::Other(s),
        }
    }
}

impl From<ApplicationStatus> for String {
    fn from(status: ApplicationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row in the `applications` table linking a candidate to a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,

    pub job_id: Uuid,

    pub candidate_id: Uuid,

    pub status: ApplicationStatus,

    pub applied_at: DateTime<Utc>,

    #[serde(default)]
    pub cover_letter: Option<String>,

    #[serde(default)]
    pub resume_id: Option<Uuid>,
}

/// Candidate-side projection: the application with its job embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationWithJob {
    pub id: Uuid,

    pub status: ApplicationStatus,

    pub applied_at: DateTime<Utc>,

    #[serde(default)]
    pub cover_letter: Option<String>,

    pub job: JobSummary,
}

/// Recruiter-side projection: the application with candidate and resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantRow {
    pub id: Uuid,

    pub status: ApplicationStatus,

    pub applied_at: DateTime<Utc>,

    #[serde(default)]
    pub cover_letter: Option<String>,

    pub candidate: Profile,

    #[serde(default)]
    pub resume: Option<Resume>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_status_parsing() {
        assert_eq!(
            ApplicationStatus::from("applied".to_string()),
            ApplicationStatus::Applied
        );
        assert_eq!(
            ApplicationStatus::from("hired".to_string()),
            ApplicationStatus::Hired
        );
    }

    #[test]
    fn test_legacy_status_aliases() {
        assert_eq!(
            ApplicationStatus::from("Submitted".to_string()),
            ApplicationStatus::Applied
        );
        assert_eq!(
            ApplicationStatus::from("Under Review".to_string()),
            ApplicationStatus::Reviewing
        );
        assert_eq!(
            ApplicationStatus::from("Interview Scheduled".to_string()),
            ApplicationStatus::Interviewing
        );
    }

    #[test]
    fn test_unknown_status_preserved() {
        let status = ApplicationStatus::from("shortlisted".to_string());
        assert_eq!(status, ApplicationStatus::Other("shortlisted".to_string()));
        assert!(!status.is_canonical());
        assert_eq!(String::from(status), "shortlisted");
    }

    #[test]
    fn test_status_serde_round_trip() {
        let json = serde_json::to_string(&ApplicationStatus::Reviewing).unwrap();
        assert_eq!(json, "\"reviewing\"");
        let back: ApplicationStatus = serde_json::from_str("\"Interview Scheduled\"").unwrap();
        assert_eq!(back, ApplicationStatus::Interviewing);
    }
}

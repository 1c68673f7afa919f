use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A job listing as stored in the `jobs` table. Publicly readable while
/// `is_active` is true; mutated only by its owning recruiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,

    pub title: String,

    pub company: String,

    pub location: String,

    #[serde(default)]
    pub salary: Option<String>,

    #[serde(default)]
    pub currency: Option<String>,

    /// Employment type ("Full-time", "Contract", ...).
    #[serde(rename = "type", default)]
    pub job_type: Option<String>,

    pub description: String,

    #[serde(default)]
    pub skills_required: Option<Vec<String>>,

    #[serde(default)]
    pub experience_level: Option<String>,

    pub is_active: bool,

    pub posted_at: DateTime<Utc>,

    pub recruiter_id: Uuid,
}

/// Trimmed projection embedded into application rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
}

/// A recruiter's own listing plus its applicant count, for the manage view.
#[derive(Debug, Clone, Serialize)]
pub struct ManagedJob {
    #[serde(flatten)]
    pub job: Job,

    pub applicant_count: u64,
}

/// Input for posting a job. Skills arrive as a comma-separated string and
/// are split/trimmed before insert, matching the posting form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub title: String,

    pub company: String,

    pub location: String,

    #[serde(default)]
    pub salary: Option<String>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(rename = "type", default)]
    pub job_type: Option<String>,

    pub description: String,

    #[serde(default)]
    pub skills_required: Option<String>,

    #[serde(default)]
    pub experience_level: Option<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl NewJob {
    /// Title, company, location and description are required.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("title", &self.title),
            ("company", &self.company),
            ("location", &self.location),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn skills_list(&self) -> Option<Vec<String>> {
        let raw = self.skills_required.as_deref()?;
        let skills: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if skills.is_empty() { None } else { Some(skills) }
    }
}

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::clients::DataClient;
use crate::errors::ServiceError;
use crate::models::{Job, ManagedJob, NewJob};

/// Job listing operations for both the public board and the recruiter
/// console.
#[derive(Debug, Clone)]
pub struct JobService {
    data: DataClient,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Uuid,
}

impl JobService {
    #[must_use]
    pub fn new(data: DataClient) -> Self {
        Self { data }
    }

    /// Active listings, newest first. `limit` serves the home-page teaser.
    pub async fn list_active(&self, limit: Option<u32>) -> Result<Vec<Job>, ServiceError> {
        let mut query = self
            .data
            .from("jobs")
            .eq("is_active", true)
            .order_desc("posted_at");

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        Ok(query.fetch().await?)
    }

    /// Single listing by id, regardless of active flag; a direct link to a
    /// paused job still resolves for its owner.
    pub async fn get(&self, id: Uuid) -> Result<Option<Job>, ServiceError> {
        Ok(self.data.from("jobs").eq("id", id).maybe_single().await?)
    }

    pub async fn post(
        &self,
        token: &str,
        recruiter_id: Uuid,
        new: &NewJob,
    ) -> Result<Job, ServiceError> {
        new.validate().map_err(ServiceError::Validation)?;

        let row = json!({
            "title": new.title.trim(),
            "company": new.company.trim(),
            "location": new.location.trim(),
            "salary": new.salary,
            "currency": new.currency,
            "type": new.job_type,
            "description": new.description.trim(),
            "skills_required": new.skills_list(),
            "experience_level": new.experience_level,
            "is_active": new.is_active,
            "posted_at": Utc::now(),
            "recruiter_id": recruiter_id,
        });

        let job: Job = self.data.from("jobs").auth(token).insert(&row).await?;
        info!(job_id = %job.id, %recruiter_id, "Job posted");
        Ok(job)
    }

    /// The recruiter's own listings with per-job applicant counts.
    pub async fn manage_list(
        &self,
        token: &str,
        recruiter_id: Uuid,
    ) -> Result<Vec<ManagedJob>, ServiceError> {
        let jobs: Vec<Job> = self
            .data
            .from("jobs")
            .eq("recruiter_id", recruiter_id)
            .order_desc("posted_at")
            .auth(token)
            .fetch()
            .await?;

        let mut managed = Vec::with_capacity(jobs.len());
        for job in jobs {
            let applicant_count = self
                .data
                .from("applications")
                .eq("job_id", job.id)
                .auth(token)
                .count()
                .await?;
            managed.push(ManagedJob {
                job,
                applicant_count,
            });
        }

        Ok(managed)
    }

    /// Flips a listing's visibility. The recruiter filter makes a foreign
    /// job look like a missing one.
    pub async fn set_active(
        &self,
        token: &str,
        recruiter_id: Uuid,
        job_id: Uuid,
        active: bool,
    ) -> Result<Job, ServiceError> {
        let updated: Vec<Job> = self
            .data
            .from("jobs")
            .eq("id", job_id)
            .eq("recruiter_id", recruiter_id)
            .auth(token)
            .update(&json!({ "is_active": active }))
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("Job not found"))
    }

    pub async fn delete(
        &self,
        token: &str,
        recruiter_id: Uuid,
        job_id: Uuid,
    ) -> Result<(), ServiceError> {
        let removed = self
            .data
            .from("jobs")
            .eq("id", job_id)
            .eq("recruiter_id", recruiter_id)
            .auth(token)
            .delete()
            .await?;

        if removed == 0 {
            return Err(ServiceError::not_found("Job not found"));
        }

        info!(%job_id, %recruiter_id, "Job deleted");
        Ok(())
    }

    /// Headline numbers for the recruiter dashboard: listing count and
    /// applicants across all of the recruiter's jobs.
    pub async fn dashboard_counts(
        &self,
        token: &str,
        recruiter_id: Uuid,
    ) -> Result<(u64, u64), ServiceError> {
        let ids: Vec<IdRow> = self
            .data
            .from("jobs")
            .select("id")
            .eq("recruiter_id", recruiter_id)
            .auth(token)
            .fetch()
            .await?;

        if ids.is_empty() {
            return Ok((0, 0));
        }

        let id_list: Vec<String> = ids.iter().map(|row| row.id.to_string()).collect();
        let applicants = self
            .data
            .from("applications")
            .in_list("job_id", &id_list)
            .auth(token)
            .count()
            .await?;

        Ok((ids.len() as u64, applicants))
    }
}

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::clients::DataClient;
use crate::errors::ServiceError;
use crate::models::{
    ApplicantRow, Application, ApplicationStatus, ApplicationWithJob, Job,
};

/// Column projection for the candidate's applications view, embedding the
/// job each application targets.
const CANDIDATE_VIEW: &str =
    "id,status,applied_at,cover_letter,job:jobs(id,title,company,location)";

/// Column projection for the recruiter's applicant view, embedding the
/// candidate profile and their resume.
const RECRUITER_VIEW: &str = "id,status,applied_at,cover_letter,\
     candidate:profiles(id,full_name,role,avatar_url),\
     resume:resumes(id,candidate_id,file_name,storage_path,file_type,uploaded_at)";

#[derive(Debug, Clone)]
pub struct ApplicationService {
    data: DataClient,
}

impl ApplicationService {
    #[must_use]
    pub fn new(data: DataClient) -> Self {
        Self { data }
    }

    /// Submits an application. One application per candidate per job; a
    /// repeat lands on `Conflict`, and a missing or paused job on
    /// `NotFound`.
    pub async fn apply(
        &self,
        token: &str,
        candidate_id: Uuid,
        job_id: Uuid,
        cover_letter: Option<String>,
        resume_id: Option<Uuid>,
    ) -> Result<Application, ServiceError> {
        let job: Option<Job> = self
            .data
            .from("jobs")
            .eq("id", job_id)
            .eq("is_active", true)
            .maybe_single()
            .await?;
        if job.is_none() {
            return Err(ServiceError::not_found("Job not found or no longer open"));
        }

        let existing = self
            .data
            .from("applications")
            .eq("job_id", job_id)
            .eq("candidate_id", candidate_id)
            .auth(token)
            .count()
            .await?;
        if existing > 0 {
            return Err(ServiceError::conflict(
                "You have already applied to this job",
            ));
        }

        let row = json!({
            "job_id": job_id,
            "candidate_id": candidate_id,
            "status": ApplicationStatus::Applied,
            "applied_at": Utc::now(),
            "cover_letter": cover_letter,
            "resume_id": resume_id,
        });

        let application: Application = self
            .data
            .from("applications")
            .auth(token)
            .insert(&row)
            .await?;

        info!(application_id = %application.id, %job_id, %candidate_id, "Application submitted");
        Ok(application)
    }

    /// The candidate's applications, newest first, each with its job.
    pub async fn for_candidate(
        &self,
        token: &str,
        candidate_id: Uuid,
    ) -> Result<Vec<ApplicationWithJob>, ServiceError> {
        Ok(self
            .data
            .from("applications")
            .select(CANDIDATE_VIEW)
            .eq("candidate_id", candidate_id)
            .order_desc("applied_at")
            .auth(token)
            .fetch()
            .await?)
    }

    /// Applicants for one of the recruiter's jobs, optionally narrowed to a
    /// pipeline status. A job owned by someone else reads as missing.
    pub async fn for_job(
        &self,
        token: &str,
        recruiter_id: Uuid,
        job_id: Uuid,
        status: Option<&ApplicationStatus>,
    ) -> Result<Vec<ApplicantRow>, ServiceError> {
        self.assert_job_owner(token, recruiter_id, job_id).await?;

        let mut query = self
            .data
            .from("applications")
            .select(RECRUITER_VIEW)
            .eq("job_id", job_id)
            .order_desc("applied_at")
            .auth(token);

        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }

        Ok(query.fetch().await?)
    }

    /// Moves an application through the pipeline. Only the recruiter owning
    /// the underlying job may do this.
    pub async fn update_status(
        &self,
        token: &str,
        recruiter_id: Uuid,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Application, ServiceError> {
        let application: Option<Application> = self
            .data
            .from("applications")
            .eq("id", application_id)
            .auth(token)
            .maybe_single()
            .await?;
        let Some(application) = application else {
            return Err(ServiceError::not_found("Application not found"));
        };

        self.assert_job_owner(token, recruiter_id, application.job_id)
            .await
            .map_err(|_| ServiceError::forbidden("Not your job's application"))?;

        let updated: Vec<Application> = self
            .data
            .from("applications")
            .eq("id", application_id)
            .auth(token)
            .update(&json!({ "status": status }))
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("Application not found"))
    }

    async fn assert_job_owner(
        &self,
        token: &str,
        recruiter_id: Uuid,
        job_id: Uuid,
    ) -> Result<(), ServiceError> {
        let owned: Option<Job> = self
            .data
            .from("jobs")
            .eq("id", job_id)
            .eq("recruiter_id", recruiter_id)
            .auth(token)
            .maybe_single()
            .await?;

        if owned.is_none() {
            return Err(ServiceError::not_found("Job not found"));
        }
        Ok(())
    }
}

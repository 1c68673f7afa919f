use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clients::AuthUser;
use crate::models::{ApplicationWithJob, Job, Profile};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// "confirmation_sent" or "already_registered".
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Current session as seen by the frontend: who is signed in and what role
/// they carry. `profile` may be absent for a fresh account.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: AuthUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: String,
}

/// Candidate landing summary: a teaser of the board, the candidate's most
/// recent applications, and whether a CV is on file.
#[derive(Debug, Serialize)]
pub struct CandidateHomeResponse {
    pub recent_jobs: Vec<Job>,
    pub recent_applications: Vec<ApplicationWithJob>,
    pub has_resume: bool,
}

#[derive(Debug, Serialize)]
pub struct RecruiterDashboardResponse {
    pub job_count: u64,
    pub applicant_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ApplicantsQuery {
    /// Pipeline status filter; omitted means all applicants.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentResumeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationsResponse {
    pub applications: Vec<ApplicationWithJob>,
}

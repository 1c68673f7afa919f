use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tower_sessions::Session;
use uuid::Uuid;

use super::{
    ApiError, ApiResponse, AppState, ApplicantsQuery, NotificationEvent,
    RecruiterDashboardResponse, SetActiveRequest, UpdateStatusRequest, auth, events,
};
use crate::models::{ApplicantRow, Application, ApplicationStatus, Job, ManagedJob, NewJob};

/// GET /recruiter/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<RecruiterDashboardResponse>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let (job_count, applicant_count) = state
        .shared
        .jobs
        .dashboard_counts(&identity.token, identity.user.id)
        .await?;

    Ok(Json(ApiResponse::success(RecruiterDashboardResponse {
        job_count,
        applicant_count,
    })))
}

/// GET /recruiter/jobs
pub async fn manage_jobs(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<ManagedJob>>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let jobs = state
        .shared
        .jobs
        .manage_list(&identity.token, identity.user.id)
        .await?;

    Ok(Json(ApiResponse::success(jobs)))
}

/// POST /recruiter/jobs
pub async fn post_job(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<NewJob>,
) -> Result<Json<ApiResponse<Job>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let job = state
        .shared
        .jobs
        .post(&identity.token, identity.user.id, &payload)
        .await?;

    events::publish(
        &state.shared.event_bus,
        NotificationEvent::JobPosted {
            job_id: job.id,
            title: job.title.clone(),
        },
    );

    Ok(Json(ApiResponse::success(job)))
}

/// PUT /recruiter/jobs/{id}/active
pub async fn set_active(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(job_id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<ApiResponse<Job>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let job = state
        .shared
        .jobs
        .set_active(&identity.token, identity.user.id, job_id, payload.is_active)
        .await?;

    Ok(Json(ApiResponse::success(job)))
}

/// DELETE /recruiter/jobs/{id}
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    state
        .shared
        .jobs
        .delete(&identity.token, identity.user.id, job_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /recruiter/jobs/{id}/applicants
pub async fn applicants(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(job_id): Path<Uuid>,
    Query(query): Query<ApplicantsQuery>,
) -> Result<Json<ApiResponse<Vec<ApplicantRow>>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let status = query.status.map(ApplicationStatus::from);
    let rows = state
        .shared
        .applications
        .for_job(&identity.token, identity.user.id, job_id, status.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(rows)))
}

/// PUT /recruiter/applications/{id}/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Application>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let status = ApplicationStatus::from(payload.status);
    if !status.is_canonical() {
        return Err(ApiError::validation(format!(
            "Unknown status '{status}'"
        )));
    }

    let application = state
        .shared
        .applications
        .update_status(&identity.token, identity.user.id, application_id, status)
        .await?;

    events::publish(
        &state.shared.event_bus,
        NotificationEvent::ApplicationStatusChanged {
            application_id,
            status: application.status.as_str().to_string(),
        },
    );

    Ok(Json(ApiResponse::success(application)))
}

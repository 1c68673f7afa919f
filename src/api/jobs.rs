use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;
use tower_sessions::Session;
use uuid::Uuid;

use super::{
    ApiError, ApiResponse, AppState, ApplyRequest, JobsQuery, NotificationEvent, auth, events,
};
use crate::models::{Application, Job};

/// GET /jobs
/// Public board: active listings, newest first.
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<ApiResponse<Vec<Job>>>, ApiError> {
    let jobs = state.shared.jobs.list_active(query.limit).await?;
    Ok(Json(ApiResponse::success(jobs)))
}

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Job>>, ApiError> {
    let job = state
        .shared
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job {id} not found")))?;

    Ok(Json(ApiResponse::success(job)))
}

/// POST /jobs/{id}/apply
/// Candidate-gated; one application per candidate per job.
pub async fn apply(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(job_id): Path<Uuid>,
    Json(payload): Json<ApplyRequest>,
) -> Result<Json<ApiResponse<Application>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let application = state
        .shared
        .applications
        .apply(
            &identity.token,
            identity.user.id,
            job_id,
            payload.cover_letter,
            payload.resume_id,
        )
        .await?;

    events::publish(
        &state.shared.event_bus,
        NotificationEvent::ApplicationSubmitted {
            application_id: application.id,
            job_id,
        },
    );

    Ok(Json(ApiResponse::success(application)))
}

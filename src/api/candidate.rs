use axum::{
    Json,
    extract::{Multipart, State},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{
    ApiError, ApiResponse, AppState, ApplicationsResponse, CandidateHomeResponse,
    UpdateProfileRequest, auth, resumes,
};
use crate::models::Profile;

/// Listings shown on the candidate landing page.
const HOME_JOB_LIMIT: u32 = 5;

/// Applications shown on the candidate landing page.
const HOME_APPLICATION_LIMIT: usize = 5;

/// GET /candidate/home
pub async fn home(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<CandidateHomeResponse>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let recent_jobs = state.shared.jobs.list_active(Some(HOME_JOB_LIMIT)).await?;

    let mut recent_applications = state
        .shared
        .applications
        .for_candidate(&identity.token, identity.user.id)
        .await?;
    recent_applications.truncate(HOME_APPLICATION_LIMIT);

    let has_resume = !state
        .shared
        .resumes
        .list(&identity.token, identity.user.id)
        .await?
        .is_empty();

    Ok(Json(ApiResponse::success(CandidateHomeResponse {
        recent_jobs,
        recent_applications,
        has_resume,
    })))
}

/// GET /candidate/applications
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<ApplicationsResponse>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let applications = state
        .shared
        .applications
        .for_candidate(&identity.token, identity.user.id)
        .await?;

    Ok(Json(ApiResponse::success(ApplicationsResponse {
        applications,
    })))
}

/// PUT /candidate/profile
/// Updates the display name and refreshes the cached session profile so the
/// next read reflects the change.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<Profile>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let profile = state
        .shared
        .profiles
        .update_name(&identity.token, identity.user.id, &payload.full_name)
        .await?;

    identity.store.refresh_profile().await;

    Ok(Json(ApiResponse::success(profile)))
}

/// POST /candidate/avatar
/// Multipart image upload; the picture lands in the avatar bucket and the
/// profile row is pointed at its public URL.
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Profile>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let (file_name, content_type, bytes) = resumes::read_upload(multipart).await?;

    let profile = state
        .shared
        .profiles
        .upload_avatar(
            &identity.token,
            identity.user.id,
            &file_name,
            &content_type,
            bytes,
        )
        .await?;

    identity.store.refresh_profile().await;

    Ok(Json(ApiResponse::success(profile)))
}

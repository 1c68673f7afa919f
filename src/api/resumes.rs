use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tower_sessions::Session;
use uuid::Uuid;

use super::{ApiError, ApiResponse, AppState, CurrentResumeResponse, NotificationEvent, auth, events};
use crate::models::Resume;
use crate::services::resumes::Uploader;

/// GET /candidate/resumes
pub async fn list(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<Resume>>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let resumes = state
        .shared
        .resumes
        .list(&identity.token, identity.user.id)
        .await?;

    Ok(Json(ApiResponse::success(resumes)))
}

/// Pulls the `file` part out of a multipart body: name, content type and
/// bytes. Browsers usually set the part's content type; the extension is the
/// fallback when they don't.
pub(super) async fn read_upload(
    mut multipart: Multipart,
) -> Result<(String, String, Vec<u8>), ApiError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let declared_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;

        let content_type = declared_type.unwrap_or_else(|| {
            mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .to_string()
        });

        file = Some((file_name, content_type, bytes.to_vec()));
    }

    file.ok_or_else(|| ApiError::validation("No file provided"))
}

/// POST /candidate/resumes
/// Multipart upload; the CV travels in a `file` field.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Resume>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let (file_name, content_type, bytes) = read_upload(multipart).await?;

    let uploader = Uploader {
        id: identity.user.id,
        email: identity.user.email.clone(),
        full_name: identity
            .store
            .current()
            .profile
            .and_then(|p| p.full_name),
    };

    let resume = state
        .shared
        .resumes
        .upload(&identity.token, &uploader, &file_name, &content_type, bytes)
        .await?;

    events::publish(
        &state.shared.event_bus,
        NotificationEvent::ResumeUploaded {
            resume_id: resume.id,
            file_name: resume.file_name.clone(),
        },
    );

    Ok(Json(ApiResponse::success(resume)))
}

/// GET /candidate/resumes/current
/// Public URL of the newest resume, or nothing if none survives
/// verification against the bucket.
pub async fn current(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<CurrentResumeResponse>>, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let url = state
        .shared
        .resumes
        .current_url(&identity.token, identity.user.id)
        .await?;

    Ok(Json(ApiResponse::success(CurrentResumeResponse { url })))
}

/// DELETE /candidate/resumes/{id}
pub async fn remove(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(resume_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = auth::identity(&state, &session).await?;

    let uploader = Uploader {
        id: identity.user.id,
        email: identity.user.email.clone(),
        full_name: identity
            .store
            .current()
            .profile
            .and_then(|p| p.full_name),
    };

    state
        .shared
        .resumes
        .delete(&identity.token, &uploader, resume_id)
        .await?;

    events::publish(
        &state.shared.event_bus,
        NotificationEvent::ResumeDeleted { resume_id },
    );

    Ok(StatusCode::NO_CONTENT)
}

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::str::FromStr;
use std::sync::Arc;
use tower_sessions::Session;
use uuid::Uuid;

use super::{
    ApiError, ApiResponse, AppState, LoginRequest, NotificationEvent, RegisterRequest,
    RegisterResponse, SessionResponse, events,
};
use crate::clients::{AuthUser, SignUpOutcome};
use crate::models::Role;
use crate::session::SessionStore;

/// Session key holding the server-side session id.
pub(crate) const SESSION_SID: &str = "sid";

/// Everything a gated handler needs about the caller.
pub struct Identity {
    pub store: Arc<SessionStore>,
    pub user: AuthUser,
    pub token: String,
}

/// POST /auth/register
/// Creates an account. An existing email is reported in-band, not as an
/// error, mirroring how the auth service reports it.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<RegisterResponse>>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::validation(
            "Password must be at least 6 characters",
        ));
    }
    if payload.full_name.trim().is_empty() {
        return Err(ApiError::validation("Full name is required"));
    }
    let role = Role::from_str(&payload.role).map_err(ApiError::validation)?;

    let outcome = state
        .shared
        .auth
        .sign_up(
            payload.email.trim(),
            &payload.password,
            payload.full_name.trim(),
            role,
        )
        .await?;

    let response = match outcome {
        SignUpOutcome::AlreadyRegistered => RegisterResponse {
            status: "already_registered".to_string(),
            message: "An account with this email already exists".to_string(),
        },
        SignUpOutcome::ConfirmationSent => RegisterResponse {
            status: "confirmation_sent".to_string(),
            message: "Check your email to confirm your account".to_string(),
        },
    };

    Ok(Json(ApiResponse::success(response)))
}

/// POST /auth/login
/// Establishes a session; the response carries the resolved user and
/// profile so the frontend can route by role immediately.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let sid = Uuid::new_v4().to_string();
    let store = state.shared.sessions.store_for(&sid).await;

    let auth_session = store.sign_in(payload.email.trim(), &payload.password).await;
    if let Err(err) = auth_session {
        state.shared.sessions.remove(&sid).await;
        return Err(err.into());
    }

    session
        .insert(SESSION_SID, &sid)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    let auth_state = store.current();
    let user = auth_state.user.ok_or_else(ApiError::unauthorized)?;

    events::publish(
        &state.shared.event_bus,
        NotificationEvent::SignedIn { user_id: user.id },
    );

    Ok(Json(ApiResponse::success(SessionResponse {
        user,
        profile: auth_state.profile,
    })))
}

/// POST /auth/logout
/// Revokes the backend session and drops the server-side state. A dead
/// token upstream still counts as signed out.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    if let Ok(Some(sid)) = session.get::<String>(SESSION_SID).await {
        if let Some(store) = state.shared.sessions.get(&sid).await {
            let user_id = store.current().user.map(|u| u.id);

            if let Err(err) = store.sign_out().await {
                tracing::warn!("Backend sign-out failed: {err}");
            }

            if let Some(user_id) = user_id {
                events::publish(
                    &state.shared.event_bus,
                    NotificationEvent::SignedOut { user_id },
                );
            }
        }
        state.shared.sessions.remove(&sid).await;
    }

    let _ = session.flush().await;
    Ok((StatusCode::OK, "Logged out"))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let identity = identity(&state, &session).await?;
    let profile = identity.store.current().profile;

    Ok(Json(ApiResponse::success(SessionResponse {
        user: identity.user,
        profile,
    })))
}

/// Resolves the per-session store for the caller, or 401.
pub async fn session_store(
    state: &AppState,
    session: &Session,
) -> Result<Arc<SessionStore>, ApiError> {
    let sid: Option<String> = session
        .get(SESSION_SID)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;
    let sid = sid.ok_or_else(ApiError::unauthorized)?;

    state
        .shared
        .sessions
        .get(&sid)
        .await
        .ok_or_else(ApiError::unauthorized)
}

/// The caller's store, user and access token, or 401 if any is missing.
pub async fn identity(state: &AppState, session: &Session) -> Result<Identity, ApiError> {
    let store = session_store(state, session).await?;
    let user = store.current().user.ok_or_else(ApiError::unauthorized)?;
    let token = store
        .access_token()
        .await
        .ok_or_else(ApiError::unauthorized)?;

    Ok(Identity { store, user, token })
}

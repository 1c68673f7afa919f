use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::AppState;
use super::auth::SESSION_SID;
use crate::guard::{RouteDecision, decide};
use crate::models::Role;
use crate::session::AuthState;

/// Route guard middleware for candidate-only routes.
pub async fn require_candidate(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    guard(&state, &session, &[Role::Candidate], request, next).await
}

/// Route guard middleware for recruiter-only routes.
pub async fn require_recruiter(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    guard(&state, &session, &[Role::Recruiter], request, next).await
}

/// Applies the route decision: signed-out callers bounce to the login page,
/// wrong-role callers to their own landing page, with no error surfaced.
async fn guard(
    state: &AppState,
    session: &Session,
    allowed: &[Role],
    request: Request,
    next: Next,
) -> Response {
    let auth_state = resolve_auth_state(state, session).await;

    match decide(&auth_state, allowed) {
        RouteDecision::Allow => next.run(request).await,
        RouteDecision::RedirectToLogin => Redirect::to("/login").into_response(),
        RouteDecision::RedirectTo(path) => Redirect::to(path).into_response(),
        // Server-side sessions resolve before login returns, so this only
        // shows up if a store was created but never initialized.
        RouteDecision::Pending => Redirect::to("/login").into_response(),
    }
}

async fn resolve_auth_state(state: &AppState, session: &Session) -> AuthState {
    let Ok(Some(sid)) = session.get::<String>(SESSION_SID).await else {
        return AuthState::signed_out();
    };

    match state.shared.sessions.get(&sid).await {
        Some(store) => store.current(),
        None => AuthState::signed_out(),
    }
}

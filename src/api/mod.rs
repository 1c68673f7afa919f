use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod candidate;
mod error;
pub mod events;
mod guard;
mod jobs;
mod recruiter;
mod resumes;
mod types;

pub use error::ApiError;
pub use events::NotificationEvent;
pub use types::*;

use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn event_bus(&self) -> &tokio::sync::broadcast::Sender<NotificationEvent> {
        &self.shared.event_bus
    }
}

pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState { shared })
}

pub fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config)?);
    Ok(create_app_state(shared))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies, max_upload_bytes) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.uploads.max_size_bytes,
        )
    };

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(60)));

    let api_router = Router::new()
        .merge(candidate_router(state.clone()))
        .merge(recruiter_router(state.clone()))
        .merge(events::router())
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .layer(session_layer)
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    // Multipart framing overhead on top of the configured CV size limit.
    let body_limit = usize::try_from(max_upload_bytes).unwrap_or(usize::MAX).saturating_add(64 * 1024);

    Router::new()
        .nest("/api", api_router)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn candidate_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/candidate/home", get(candidate::home))
        .route("/candidate/applications", get(candidate::list_applications))
        .route("/candidate/profile", put(candidate::update_profile))
        .route("/candidate/avatar", post(candidate::upload_avatar))
        .route(
            "/candidate/resumes",
            get(resumes::list).post(resumes::upload),
        )
        .route("/candidate/resumes/current", get(resumes::current))
        .route("/candidate/resumes/{id}", delete(resumes::remove))
        .route("/jobs/{id}/apply", post(jobs::apply))
        .route_layer(middleware::from_fn_with_state(
            state,
            guard::require_candidate,
        ))
}

fn recruiter_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/recruiter/dashboard", get(recruiter::dashboard))
        .route(
            "/recruiter/jobs",
            get(recruiter::manage_jobs).post(recruiter::post_job),
        )
        .route("/recruiter/jobs/{id}/active", put(recruiter::set_active))
        .route("/recruiter/jobs/{id}", delete(recruiter::delete_job))
        .route(
            "/recruiter/jobs/{id}/applicants",
            get(recruiter::applicants),
        )
        .route(
            "/recruiter/applications/{id}/status",
            put(recruiter::update_status),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            guard::require_recruiter,
        ))
}

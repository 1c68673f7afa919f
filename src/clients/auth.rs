use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::Role;

/// Errors from the hosted auth service.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Auth service error: {0}")]
    Service(String),

    #[error("Auth transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Identity as reported by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,

    #[serde(default)]
    pub email: Option<String>,
}

/// An established session: bearer token pair plus the user it belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    pub user: AuthUser,
}

/// Result of a signup attempt. The service reports an existing account by
/// returning a user with zero identities instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    AlreadyRegistered,
    ConfirmationSent,
}

/// Client for the password-auth surface of the hosted backend.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl AuthClient {
    #[must_use]
    pub fn new(client: Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    /// Registers a new account. Full name and role travel as signup
    /// metadata; the backend materializes the profile row from them.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> Result<SignUpOutcome, AuthError> {
        let body = json!({
            "email": email,
            "password": password,
            "data": {
                "full_name": full_name,
                "role": role.as_str(),
            }
        });

        let response = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(service_error(response).await);
        }

        let payload: serde_json::Value = response.json().await?;
        let identities = payload
            .get("identities")
            .or_else(|| payload.pointer("/user/identities"))
            .and_then(serde_json::Value::as_array);

        if identities.is_some_and(Vec::is_empty) {
            debug!(email, "Signup hit an existing account");
            return Ok(SignUpOutcome::AlreadyRegistered);
        }

        Ok(SignUpOutcome::ConfirmationSent)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let body = json!({ "email": email, "password": password });

        let response = self
            .client
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(AuthError::InvalidCredentials)
            }
            _ => Err(service_error(response).await),
        }
    }

    /// Resolves the user behind an access token, i.e. session retrieval.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::Unauthorized),
            _ => Err(service_error(response).await),
        }
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        // An already-dead token is as signed out as we need.
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(service_error(response).await)
        }
    }
}

async fn service_error(response: reqwest::Response) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|k| v.get(k).and_then(serde_json::Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| format!("status={status}"));

    AuthError::Service(message)
}

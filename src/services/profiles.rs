use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::clients::storage::avatar_object_path;
use crate::clients::{DataClient, StorageClient};
use crate::config::UploadConfig;
use crate::errors::ServiceError;
use crate::models::Profile;

#[derive(Debug, Clone)]
pub struct ProfileService {
    data: DataClient,
    storage: StorageClient,
    avatar_bucket: String,
    uploads: UploadConfig,
}

impl ProfileService {
    #[must_use]
    pub fn new(
        data: DataClient,
        storage: StorageClient,
        avatar_bucket: &str,
        uploads: UploadConfig,
    ) -> Self {
        Self {
            data,
            storage,
            avatar_bucket: avatar_bucket.to_string(),
            uploads,
        }
    }

    /// Missing rows are a valid state, not an error.
    pub async fn fetch(&self, token: &str, user_id: Uuid) -> Result<Option<Profile>, ServiceError> {
        Ok(self
            .data
            .from("profiles")
            .eq("id", user_id)
            .auth(token)
            .maybe_single()
            .await?)
    }

    /// Sets the display name, creating the row if signup never materialized
    /// one. Returns the resulting profile.
    pub async fn update_name(
        &self,
        token: &str,
        user_id: Uuid,
        full_name: &str,
    ) -> Result<Profile, ServiceError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ServiceError::validation("Full name cannot be empty"));
        }

        self.data
            .from("profiles")
            .auth(token)
            .upsert(&json!({ "id": user_id, "full_name": full_name }))
            .await?;

        info!(%user_id, "Profile name updated");

        self.fetch(token, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Profile not found after update"))
    }

    /// Pre-flight checks for an avatar image, cheapest first; nothing
    /// touches the network until all of them pass.
    pub fn validate_avatar(
        &self,
        file_name: &str,
        content_type: &str,
        size: u64,
    ) -> Result<(), ServiceError> {
        if file_name.trim().is_empty() {
            return Err(ServiceError::validation("No file provided"));
        }

        if !self
            .uploads
            .allowed_avatar_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
        {
            return Err(ServiceError::validation(format!(
                "Unsupported image type '{content_type}'; accepted: {}",
                self.uploads.allowed_avatar_mime_types.join(", ")
            )));
        }

        if size == 0 {
            return Err(ServiceError::validation("File is empty"));
        }

        if size > self.uploads.avatar_max_size_bytes {
            return Err(ServiceError::validation(format!(
                "File exceeds the {} byte limit",
                self.uploads.avatar_max_size_bytes
            )));
        }

        Ok(())
    }

    /// Stores a new avatar image and points the profile at its public URL.
    pub async fn upload_avatar(
        &self,
        token: &str,
        user_id: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Profile, ServiceError> {
        self.validate_avatar(file_name, content_type, bytes.len() as u64)?;

        let path = avatar_object_path(user_id, Utc::now().timestamp_millis(), file_name);

        self.storage
            .upload(token, &self.avatar_bucket, &path, bytes, content_type)
            .await?;

        let url = self.storage.public_url(&self.avatar_bucket, &path);

        self.data
            .from("profiles")
            .auth(token)
            .upsert(&json!({ "id": user_id, "avatar_url": url }))
            .await?;

        info!(%user_id, "Avatar updated");

        self.fetch(token, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Profile not found after update"))
    }
}

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::storage::resume_object_path;
use crate::clients::webhook::{EVENT_RESUME_DELETED, EVENT_RESUME_UPLOADED, ResumeEvent};
use crate::clients::{DataClient, StorageClient, WebhookNotifier};
use crate::config::UploadConfig;
use crate::errors::ServiceError;
use crate::models::Resume;

/// Who is uploading; carried into the outbound resume event.
#[derive(Debug, Clone)]
pub struct Uploader {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// CV upload workflow: validate, store the bytes, record the metadata row,
/// then emit a best-effort event.
///
/// There is no transaction across the object store and the table. If the
/// row insert fails after the bytes landed, the orphaned object is logged
/// and left behind rather than risking a delete of someone else's data.
#[derive(Debug, Clone)]
pub struct ResumeService {
    data: DataClient,
    storage: StorageClient,
    notifier: WebhookNotifier,
    bucket: String,
    uploads: UploadConfig,
}

impl ResumeService {
    #[must_use]
    pub fn new(
        data: DataClient,
        storage: StorageClient,
        notifier: WebhookNotifier,
        bucket: &str,
        uploads: UploadConfig,
    ) -> Self {
        Self {
            data,
            storage,
            notifier,
            bucket: bucket.to_string(),
            uploads,
        }
    }

    /// Pre-flight checks, cheapest first; nothing touches the network until
    /// all of them pass.
    pub fn validate_upload(
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
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
        {
            return Err(ServiceError::validation(format!(
                "Unsupported file type '{content_type}'; accepted: {}",
                self.uploads.allowed_mime_types.join(", ")
            )));
        }

        if size == 0 {
            return Err(ServiceError::validation("File is empty"));
        }

        if size > self.uploads.max_size_bytes {
            return Err(ServiceError::validation(format!(
                "File exceeds the {} byte limit",
                self.uploads.max_size_bytes
            )));
        }

        Ok(())
    }

    pub async fn upload(
        &self,
        token: &str,
        uploader: &Uploader,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Resume, ServiceError> {
        self.validate_upload(file_name, content_type, bytes.len() as u64)?;

        let path = resume_object_path(uploader.id, Utc::now().timestamp_millis(), file_name);

        self.storage
            .upload(token, &self.bucket, &path, bytes, content_type)
            .await?;

        let row = json!({
            "candidate_id": uploader.id,
            "file_name": file_name,
            "storage_path": path,
            "file_type": content_type,
            "uploaded_at": Utc::now(),
        });

        let resume: Resume = match self.data.from("resumes").auth(token).insert(&row).await {
            Ok(resume) => resume,
            Err(err) => {
                // The object is already in the bucket with no row pointing
                // at it; record where so it can be reclaimed.
                warn!(%path, "Resume row insert failed, object orphaned: {err}");
                return Err(err.into());
            }
        };

        info!(resume_id = %resume.id, candidate_id = %uploader.id, "Resume uploaded");

        self.notifier.notify(ResumeEvent::new(
            EVENT_RESUME_UPLOADED,
            uploader.id,
            uploader.email.clone(),
            uploader.full_name.clone(),
            &resume,
        ));

        Ok(resume)
    }

    /// Removes a resume the uploader owns: object first, then the row,
    /// then the event.
    pub async fn delete(
        &self,
        token: &str,
        uploader: &Uploader,
        resume_id: Uuid,
    ) -> Result<(), ServiceError> {
        let resume: Option<Resume> = self
            .data
            .from("resumes")
            .eq("id", resume_id)
            .eq("candidate_id", uploader.id)
            .auth(token)
            .maybe_single()
            .await?;
        let Some(resume) = resume else {
            return Err(ServiceError::not_found("Resume not found"));
        };

        self.storage
            .remove(token, &self.bucket, &[resume.storage_path.clone()])
            .await?;

        self.data
            .from("resumes")
            .eq("id", resume_id)
            .auth(token)
            .delete()
            .await?;

        info!(%resume_id, candidate_id = %uploader.id, "Resume deleted");

        self.notifier.notify(ResumeEvent::new(
            EVENT_RESUME_DELETED,
            uploader.id,
            uploader.email.clone(),
            uploader.full_name.clone(),
            &resume,
        ));

        Ok(())
    }

    /// The candidate's resumes, newest first.
    pub async fn list(&self, token: &str, candidate_id: Uuid) -> Result<Vec<Resume>, ServiceError> {
        Ok(self
            .data
            .from("resumes")
            .eq("candidate_id", candidate_id)
            .order_desc("uploaded_at")
            .auth(token)
            .fetch()
            .await?)
    }

    /// Public URL of the newest resume, verified against the bucket listing
    /// so a dangling row does not hand out a dead link.
    pub async fn current_url(
        &self,
        token: &str,
        candidate_id: Uuid,
    ) -> Result<Option<String>, ServiceError> {
        let rows: Vec<Resume> = self
            .data
            .from("resumes")
            .eq("candidate_id", candidate_id)
            .order_desc("uploaded_at")
            .limit(1)
            .auth(token)
            .fetch()
            .await?;
        let Some(resume) = rows.into_iter().next() else {
            return Ok(None);
        };

        let prefix = format!("cv/{candidate_id}");
        let objects = self.storage.list(token, &self.bucket, &prefix).await?;

        let object_name = resume.storage_path.rsplit('/').next().unwrap_or_default();
        if objects.iter().any(|o| o.name == object_name) {
            Ok(Some(self.storage.public_url(&self.bucket, &resume.storage_path)))
        } else {
            warn!(resume_id = %resume.id, "Resume row points at a missing object");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;

    fn service() -> ResumeService {
        let client = Client::new();
        ResumeService::new(
            DataClient::new(client.clone(), "http://localhost:54321", "anon"),
            StorageClient::new(client, "http://localhost:54321", "anon"),
            WebhookNotifier::disabled(),
            "cvs",
            UploadConfig::default(),
        )
    }

    #[test]
    fn test_validate_rejects_missing_file() {
        let err = service()
            .validate_upload("", "application/pdf", 10)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m) if m.contains("No file")));
    }

    #[test]
    fn test_validate_rejects_wrong_type() {
        let err = service()
            .validate_upload("cv.png", "image/png", 10)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m) if m.contains("image/png")));
    }

    #[test]
    fn test_validate_enforces_size_limit() {
        let svc = service();
        assert!(svc
            .validate_upload("cv.pdf", "application/pdf", 5 * 1024 * 1024)
            .is_ok());
        assert!(svc
            .validate_upload("cv.pdf", "application/pdf", 5 * 1024 * 1024 + 1)
            .is_err());
        assert!(svc.validate_upload("cv.pdf", "application/pdf", 0).is_err());
    }

    #[test]
    fn test_validate_type_is_case_insensitive() {
        assert!(service()
            .validate_upload("cv.pdf", "Application/PDF", 10)
            .is_ok());
    }
}

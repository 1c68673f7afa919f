use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

/// Client for the object storage surface of the hosted backend.
///
/// Objects are addressed as `{bucket}/{path}`. Buckets used here are
/// public-read, so download links are plain URLs with no signing step.
#[derive(Debug, Clone)]
pub struct StorageClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

/// One entry from a bucket listing.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageObject {
    pub name: String,
}

impl StorageClient {
    #[must_use]
    pub fn new(client: Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn object_endpoint(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{path}", self.base_url)
    }

    /// Uploads `bytes` to `{bucket}/{path}`, failing if the object exists.
    pub async fn upload(
        &self,
        token: &str,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.object_endpoint(bucket, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .context("Storage upload request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Storage upload failed: status={status}, body={body}")
        }

        debug!(bucket, path, "Uploaded storage object");
        Ok(())
    }

    /// Permanent public download URL for an object in a public bucket.
    #[must_use]
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }

    /// Removes the given objects. Missing paths are not an error.
    pub async fn remove(&self, token: &str, bucket: &str, paths: &[String]) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/storage/v1/object/{bucket}", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await
            .context("Storage remove request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Storage remove failed: status={status}, body={body}")
        }

        debug!(bucket, count = paths.len(), "Removed storage objects");
        Ok(())
    }

    /// Lists objects under `prefix` in a bucket.
    pub async fn list(
        &self,
        token: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<StorageObject>> {
        let response = self
            .client
            .post(format!("{}/storage/v1/object/list/{bucket}", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .json(&json!({ "prefix": prefix }))
            .send()
            .await
            .context("Storage list request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            bail!("Storage list failed: status={status}")
        }

        response
            .json()
            .await
            .context("Failed to parse storage listing")
    }
}

/// Object path for a candidate's CV: `cv/{user}/{millis}-{name}`. The
/// timestamp keeps repeated uploads of the same file name distinct.
#[must_use]
pub fn resume_object_path(candidate_id: Uuid, timestamp_millis: i64, file_name: &str) -> String {
    format!(
        "cv/{candidate_id}/{timestamp_millis}-{}",
        sanitize_file_name(file_name)
    )
}

/// Object path for a profile avatar: `{user}/{millis}-{name}`. The avatar
/// bucket is already avatar-only, so there is no leading kind segment.
#[must_use]
pub fn avatar_object_path(user_id: Uuid, timestamp_millis: i64, file_name: &str) -> String {
    format!(
        "{user_id}/{timestamp_millis}-{}",
        sanitize_file_name(file_name)
    )
}

/// Keeps object keys URL-safe. Alphanumerics, dot, dash and underscore pass
/// through; everything else becomes an underscore.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_passes_simple_names() {
        assert_eq!(sanitize_file_name("resume-2024.pdf"), "resume-2024.pdf");
    }

    #[test]
    fn test_sanitize_replaces_specials() {
        assert_eq!(sanitize_file_name("my resume (final).pdf"), "my_resume__final_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
    }

    #[test]
    fn test_sanitize_never_empty() {
        assert_eq!(sanitize_file_name("???"), "file");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[test]
    fn test_resume_object_path_layout() {
        let id = Uuid::nil();
        let path = resume_object_path(id, 1_700_000_000_000, "cv.pdf");
        assert_eq!(
            path,
            "cv/00000000-0000-0000-0000-000000000000/1700000000000-cv.pdf"
        );
    }

    #[test]
    fn test_avatar_object_path_layout() {
        let path = avatar_object_path(Uuid::nil(), 1_700_000_000_000, "me!.png");
        assert_eq!(
            path,
            "00000000-0000-0000-0000-000000000000/1700000000000-me_.png"
        );
    }

    #[test]
    fn test_public_url_shape() {
        let storage = StorageClient::new(Client::new(), "http://localhost:54321/", "anon");
        assert_eq!(
            storage.public_url("cvs", "cv/u/1-a.pdf"),
            "http://localhost:54321/storage/v1/object/public/cvs/cv/u/1-a.pdf"
        );
    }
}

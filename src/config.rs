use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub backend: BackendConfig,

    pub uploads: UploadConfig,

    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
            event_bus_buffer_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production safety. Set to false for local development without HTTPS.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 4350,
            cors_allowed_origins: vec![
                "http://localhost:4350".to_string(),
                "http://127.0.0.1:4350".to_string(),
            ],
            secure_cookies: true,
        }
    }
}

/// Connection details for the hosted backend (auth, data store, storage).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,

    /// Anonymous API key sent with every request; a signed-in caller's
    /// bearer token is layered on top so row-level security applies.
    pub anon_key: String,

    /// Bucket holding uploaded CVs.
    pub cv_bucket: String,

    /// Bucket holding profile avatars.
    pub avatar_bucket: String,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            cv_bucket: "cvs".to_string(),
            avatar_bucket: "avatars".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// MIME types accepted for CV uploads. Some page revisions were
    /// PDF-only; the default admits PDF and both Word types, and a stricter
    /// deployment can shrink the list.
    pub allowed_mime_types: Vec<String>,

    /// Maximum CV size in bytes (default: 5 MiB).
    pub max_size_bytes: u64,

    /// Image types accepted for profile avatars.
    pub allowed_avatar_mime_types: Vec<String>,

    /// Maximum avatar size in bytes (default: 2 MiB).
    pub avatar_max_size_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: vec![
                "application/pdf".to_string(),
                "application/msword".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    .to_string(),
            ],
            max_size_bytes: 5 * 1024 * 1024,
            allowed_avatar_mime_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/webp".to_string(),
                "image/gif".to_string(),
            ],
            avatar_max_size_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Best-effort resume event notifications. Delivery failures are logged and
/// never abort the upload or delete that triggered them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,

    pub url: String,

    /// Delivery attempts per event before it is dropped with a warning.
    pub max_attempts: u32,

    pub retry_delay_seconds: u64,

    /// Queue capacity; events beyond it are dropped with a warning.
    pub queue_size: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            max_attempts: 3,
            retry_delay_seconds: 2,
            queue_size: 64,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            backend: BackendConfig::default(),
            uploads: UploadConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });

        // The anon key is a credential; allow it to come from the
        // environment instead of the config file.
        if let Ok(key) = std::env::var("HIREBOARD_ANON_KEY") {
            config.backend.anon_key = key;
        }

        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("hireboard").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".hireboard").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.is_empty() {
            anyhow::bail!("Backend base URL cannot be empty");
        }

        if self.webhook.enabled && self.webhook.url.is_empty() {
            anyhow::bail!("Webhook URL cannot be empty when enabled");
        }

        if self.uploads.max_size_bytes == 0 || self.uploads.avatar_max_size_bytes == 0 {
            anyhow::bail!("Upload size limit must be > 0");
        }

        Ok(())
    }
}

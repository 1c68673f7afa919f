use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::api::NotificationEvent;
use crate::clients::{AuthClient, DataClient, StorageClient, WebhookNotifier};
use crate::config::Config;
use crate::services::{ApplicationService, JobService, ProfileService, ResumeService};
use crate::session::SessionRegistry;

/// Build a shared HTTP client with reasonable defaults for backend calls.
/// This client is reused across every client type to enable connection
/// pooling and avoid socket exhaustion.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Hireboard/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub auth: AuthClient,

    pub data: DataClient,

    pub storage: StorageClient,

    pub sessions: SessionRegistry,

    pub jobs: Arc<JobService>,

    pub applications: Arc<ApplicationService>,

    pub profiles: Arc<ProfileService>,

    pub resumes: Arc<ResumeService>,

    pub event_bus: broadcast::Sender<NotificationEvent>,
}

impl SharedState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::with_event_bus(config, event_bus)
    }

    pub fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(config.backend.request_timeout_seconds)?;

        let base_url = config.backend.base_url.clone();
        let anon_key = config.backend.anon_key.clone();

        let auth = AuthClient::new(http_client.clone(), &base_url, &anon_key);
        let data = DataClient::new(http_client.clone(), &base_url, &anon_key);
        let storage = StorageClient::new(http_client.clone(), &base_url, &anon_key);

        let notifier = WebhookNotifier::start(http_client, &config.webhook);

        let sessions = SessionRegistry::new(auth.clone(), data.clone());

        let jobs = Arc::new(JobService::new(data.clone()));
        let applications = Arc::new(ApplicationService::new(data.clone()));
        let profiles = Arc::new(ProfileService::new(
            data.clone(),
            storage.clone(),
            &config.backend.avatar_bucket,
            config.uploads.clone(),
        ));
        let resumes = Arc::new(ResumeService::new(
            data.clone(),
            storage.clone(),
            notifier,
            &config.backend.cv_bucket,
            config.uploads.clone(),
        ));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            auth,
            data,
            storage,
            sessions,
            jobs,
            applications,
            profiles,
            resumes,
            event_bus,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}

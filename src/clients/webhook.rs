use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::WebhookConfig;
use crate::models::Resume;

/// Event kinds the notifier reports.
pub const EVENT_RESUME_UPLOADED: &str = "resume.uploaded";
pub const EVENT_RESUME_DELETED: &str = "resume.deleted";

/// Envelope posted to the configured webhook URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeEvent {
    pub event: String,
    pub user: EventUser,
    pub resume: EventResume,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventUser {
    pub id: Uuid,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResume {
    pub id: Uuid,
    pub file_name: String,
    pub storage_path: String,

    #[serde(default)]
    pub file_type: Option<String>,

    pub uploaded_at: DateTime<Utc>,
}

impl ResumeEvent {
    #[must_use]
    pub fn new(
        event: &str,
        user_id: Uuid,
        email: Option<String>,
        full_name: Option<String>,
        resume: &Resume,
    ) -> Self {
        Self {
            event: event.to_string(),
            user: EventUser {
                id: user_id,
                email,
                full_name,
            },
            resume: EventResume {
                id: resume.id,
                file_name: resume.file_name.clone(),
                storage_path: resume.storage_path.clone(),
                file_type: resume.file_type.clone(),
                uploaded_at: resume.uploaded_at,
            },
        }
    }
}

/// Best-effort delivery of resume events to an external endpoint.
///
/// Events go through a bounded queue drained by a background task, so a slow
/// or dead endpoint never blocks an upload. Each event gets a fixed number of
/// delivery attempts and is then dropped with a warning.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    sender: Option<mpsc::Sender<ResumeEvent>>,
}

impl WebhookNotifier {
    /// Builds the notifier and spawns its delivery task. A disabled config
    /// yields an inert notifier whose `notify` is a no-op.
    #[must_use]
    pub fn start(client: Client, config: &WebhookConfig) -> Self {
        if !config.enabled {
            return Self { sender: None };
        }

        let (sender, receiver) = mpsc::channel(config.queue_size);
        tokio::spawn(deliver_loop(client, config.clone(), receiver));

        Self {
            sender: Some(sender),
        }
    }

    /// Notifier that never delivers anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Queues an event. Never fails; a full queue drops the event with a
    /// warning.
    pub fn notify(&self, event: ResumeEvent) {
        let Some(sender) = &self.sender else {
            return;
        };

        if let Err(err) = sender.try_send(event) {
            warn!("Webhook queue full, dropping event: {err}");
        }
    }
}

async fn deliver_loop(
    client: Client,
    config: WebhookConfig,
    mut receiver: mpsc::Receiver<ResumeEvent>,
) {
    while let Some(event) = receiver.recv().await {
        deliver(&client, &config, &event).await;
    }
}

async fn deliver(client: &Client, config: &WebhookConfig, event: &ResumeEvent) {
    let attempts = config.max_attempts.max(1);

    for attempt in 1..=attempts {
        match client.post(&config.url).json(event).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(event = %event.event, attempt, "Webhook delivered");
                return;
            }
            Ok(response) => {
                warn!(
                    event = %event.event,
                    attempt,
                    status = %response.status(),
                    "Webhook endpoint rejected event"
                );
            }
            Err(err) => {
                warn!(event = %event.event, attempt, "Webhook delivery failed: {err}");
            }
        }

        if attempt < attempts {
            tokio::time::sleep(Duration::from_secs(config.retry_delay_seconds)).await;
        }
    }

    warn!(
        event = %event.event,
        resume_id = %event.resume.id,
        "Dropping webhook event after {attempts} attempts"
    );
}

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use serde::Serialize;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::api::AppState;

/// In-process notifications emitted as operations complete. Consumers
/// subscribe via the event bus; with no subscribers events are dropped.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    SignedIn {
        user_id: Uuid,
    },
    SignedOut {
        user_id: Uuid,
    },

    JobPosted {
        job_id: Uuid,
        title: String,
    },

    ApplicationSubmitted {
        application_id: Uuid,
        job_id: Uuid,
    },
    ApplicationStatusChanged {
        application_id: Uuid,
        status: String,
    },

    ResumeUploaded {
        resume_id: Uuid,
        file_name: String,
    },
    ResumeDeleted {
        resume_id: Uuid,
    },
}

/// Fire-and-forget publish; a bus with no subscribers is not an error.
pub fn publish(bus: &broadcast::Sender<NotificationEvent>, event: NotificationEvent) {
    let _ = bus.send(event);
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events", get(sse_handler))
}

/// GET /events
/// Server-sent event stream of the notification bus.
async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_bus().subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(event) => {
                let json = serde_json::to_string(&event).unwrap_or_default();
                Some((Ok(Event::default().data(json)), rx))
            }
            Err(broadcast::error::RecvError::Lagged(count)) => {
                warn!("Client lagged by {} messages", count);

                Some((
                    Ok(Event::default().event("warning").data("Missed some events")),
                    rx,
                ))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

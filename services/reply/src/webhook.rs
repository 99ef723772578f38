//! Webhook listener for mention events.
//!
//! Receives the publisher's event payloads, keeps only posts whose text is
//! exactly the configured mention, and spawns one pipeline run per accepted
//! event. Runs are independent: each uses per-run artifact paths, so
//! concurrent triggers do not interfere.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use huebot_pipeline::{PublishPipeline, RunReport};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Inbound webhook payload.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub post_create_events: Vec<PostEvent>,
}

/// One post-creation event inside a webhook payload.
#[derive(Debug, Deserialize)]
pub struct PostEvent {
    pub text: String,
    pub id: String,
    #[serde(default)]
    pub in_reply_to_status_id: Option<String>,
    pub user: EventUser,
}

/// Author of the triggering post.
#[derive(Debug, Deserialize)]
pub struct EventUser {
    pub screen_name: String,
}

/// Parameters of one accepted trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Post whose media the palette is taken from
    pub parent_post_id: String,
    /// The mention post the reply goes under
    pub trigger_post_id: String,
    /// Screen name addressed in the reply status
    pub requester: String,
}

/// Filter a webhook payload down to actionable triggers.
///
/// Only events whose text is exactly `mention` qualify, and only when they
/// reply to another post; a bare mention has no parent image to work with.
pub fn accept_events(event: &WebhookEvent, mention: &str) -> Vec<Trigger> {
    event
        .post_create_events
        .iter()
        .filter(|e| e.text == mention)
        .filter_map(|e| {
            let parent = e.in_reply_to_status_id.clone()?;
            Some(Trigger {
                parent_post_id: parent,
                trigger_post_id: e.id.clone(),
                requester: e.user.screen_name.clone(),
            })
        })
        .collect()
}

/// State shared by webhook handlers.
///
/// `runs` tracks every spawned pipeline run so the binary can wait for
/// in-flight replies to finish after the server stops accepting events.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PublishPipeline>,
    pub mention: String,
    pub runs: Arc<Mutex<JoinSet<()>>>,
}

/// Build the webhook router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(receive_event))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Wait for every tracked pipeline run to finish.
///
/// Called after the server loop returns so a shutdown signal never aborts a
/// reply mid-publish.
pub async fn drain_runs(runs: &Mutex<JoinSet<()>>) {
    let mut runs = runs.lock().await;
    if runs.is_empty() {
        return;
    }
    info!(in_flight = runs.len(), "Waiting for in-flight reply runs");
    while let Some(result) = runs.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Reply run task panicked");
        }
    }
}

async fn receive_event(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> StatusCode {
    let triggers = accept_events(&event, &state.mention);
    if triggers.is_empty() {
        debug!(
            events = event.post_create_events.len(),
            "Webhook payload had no matching mention"
        );
        return StatusCode::OK;
    }

    let mut runs = state.runs.lock().await;
    for trigger in triggers {
        let pipeline = state.pipeline.clone();
        runs.spawn(async move {
            let outcome = pipeline
                .run_reply(
                    &trigger.parent_post_id,
                    &trigger.requester,
                    &trigger.trigger_post_id,
                )
                .await;

            match outcome {
                Ok(RunReport::Published { post_id, .. }) => {
                    info!(
                        post_id = %post_id,
                        requester = %trigger.requester,
                        "Reply published"
                    );
                }
                Ok(RunReport::Skipped) => {
                    info!(
                        parent_post_id = %trigger.parent_post_id,
                        "Trigger skipped, parent post has no media"
                    );
                }
                Err(e) => {
                    error!(
                        parent_post_id = %trigger.parent_post_id,
                        error = %e,
                        "Reply run failed"
                    );
                }
            }
        });
    }

    StatusCode::OK
}

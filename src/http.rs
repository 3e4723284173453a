//! Trigger surface and read-only inspection endpoints.

use crate::db;
use crate::render::Renderer;
use crate::rotate::{self, RotateError};
use crate::storage::AssetStore;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub pool: db::Pool,
    pub renderer: Arc<dyn Renderer>,
    pub store: Arc<dyn AssetStore>,
    pub key_prefix: String,
}

/// Uniform JSON response envelope. Callers get a single boolean outcome plus
/// best-effort diagnostic text; there is no partial-success reporting.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Envelope {
    fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
            error: None,
            details: None,
        }
    }

    fn err(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error.into()),
            details,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/rotate", get(rotation_usage).post(trigger_rotation))
        .route("/api/posts/current", get(current_post))
        .route("/api/queue", get(list_queue))
        .with_state(state)
}

async fn trigger_rotation(State(state): State<AppState>) -> (StatusCode, Json<Envelope>) {
    match rotate::rotate_and_schedule(
        &state.pool,
        state.renderer.as_ref(),
        state.store.as_ref(),
        &state.key_prefix,
    )
    .await
    {
        Ok(outcome) => {
            let data = serde_json::to_value(&outcome).ok();
            (
                StatusCode::OK,
                Json(Envelope::ok("rotation complete", data)),
            )
        }
        Err(err) => {
            error!(%err, "rotation failed");
            let (status, details) = classify(&err);
            (status, Json(Envelope::err(err.to_string(), details)))
        }
    }
}

/// Precondition failures map to 4xx and are safe to retry immediately;
/// upstream and internal failures map to 5xx.
fn classify(err: &RotateError) -> (StatusCode, Option<String>) {
    match err {
        RotateError::Busy | RotateError::EmptyQueue => (StatusCode::CONFLICT, None),
        RotateError::ContentNotFound(_) => (StatusCode::NOT_FOUND, None),
        RotateError::Render(src) | RotateError::Upload(src) => {
            (StatusCode::BAD_GATEWAY, Some(format!("{:#}", src)))
        }
        RotateError::Internal(src) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Some(format!("{:#}", src)))
        }
    }
}

async fn rotation_usage() -> (StatusCode, Json<Envelope>) {
    (
        StatusCode::OK,
        Json(Envelope::ok(
            "POST to this endpoint to rotate the queue and schedule the next post; \
             GET performs no action",
            None,
        )),
    )
}

async fn current_post(State(state): State<AppState>) -> (StatusCode, Json<Envelope>) {
    match db::get_scheduled_post(&state.pool).await {
        Ok(Some(post)) => {
            let data = serde_json::to_value(&post).ok();
            (StatusCode::OK, Json(Envelope::ok("current post", data)))
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(Envelope::err("no scheduled post", None)),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Envelope::err("database error", Some(format!("{:#}", err)))),
        ),
    }
}

async fn list_queue(State(state): State<AppState>) -> (StatusCode, Json<Envelope>) {
    match db::list_queue(&state.pool).await {
        Ok(entries) => {
            let data = serde_json::to_value(&entries).ok();
            (StatusCode::OK, Json(Envelope::ok("queue", data)))
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Envelope::err("database error", Some(format!("{:#}", err)))),
        ),
    }
}

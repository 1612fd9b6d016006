use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::dispatcher::DispatchError;

pub mod broadcast;
pub mod stats;
pub mod webhook;

#[instrument]
pub async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Broadcast task did not complete")]
    Broadcast(#[from] tokio::task::JoinError),

    #[error("Webhook updates are disabled while the bot is polling")]
    WebhookDisabled,
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Dispatch(DispatchError::EmptyMessage | DispatchError::MessageTooLong { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Dispatch(
                DispatchError::NoAttachment | DispatchError::AttachmentUnavailable { .. },
            )
            | Self::Broadcast(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::WebhookDisabled => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = json!({
            "error": self.to_string(),
            "timestamp": Utc::now(),
        });
        (status, Json(body)).into_response()
    }
}

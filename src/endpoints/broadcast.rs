use axum::extract::State;
use axum::{Json, debug_handler};
use axum_valid::Valid;
use serde::Serialize;
use tracing::{Instrument, instrument};

use super::ApiError;
use crate::dispatcher::DispatchError;
use crate::models::{BroadcastRequest, BroadcastResult, RecipientId};
use crate::state::SharedState;

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[must_use]
pub struct BroadcastResponse {
    pub success: bool,
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
    pub failed_users: Vec<RecipientId>,
}

impl From<BroadcastResult> for BroadcastResponse {
    fn from(result: BroadcastResult) -> Self {
        Self {
            success: true,
            successful: result.successful,
            failed: result.failed,
            total: result.total,
            failed_users: result.failed_recipients,
        }
    }
}

#[instrument(
    skip_all,
    fields(message_len = request.message.len(), with_image = request.with_image)
)]
#[debug_handler]
pub async fn send(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<BroadcastRequest>>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let recipients = state.repository.recipients.snapshot().await;
    tracing::info!(total = recipients.len(), "Broadcast requested");

    // Owned by its own task so a dropped connection cannot stop the broadcast.
    let dispatcher = state.dispatcher.clone();
    let broadcasts = state.repository.broadcasts.clone();
    let task = tokio::spawn(async move {
        let result = dispatcher.dispatch(&recipients, &request).await?;
        Ok::<_, DispatchError>(broadcasts.record(result).await)
    }
    .in_current_span());
    let record = task.await??;

    Ok(Json(BroadcastResponse::from(record.result)))
}

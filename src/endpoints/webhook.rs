use axum::extract::State;
use axum::{Json, debug_handler};
use tracing::instrument;

use super::ApiError;
use crate::state::SharedState;
use crate::telegram::Update;

#[instrument(skip_all, fields(update_id = update.update_id))]
#[debug_handler]
pub async fn receive(
    State(state): State<SharedState>,
    Json(update): Json<Update>,
) -> Result<&'static str, ApiError> {
    if !state.webhook_enabled {
        return Err(ApiError::WebhookDisabled);
    }

    let action = state.updates.handle(&update).await;
    tracing::debug!(?action, "Webhook update processed");
    Ok("OK")
}

use axum::extract::State;
use axum::{Json, debug_handler};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::models::RecipientId;
use crate::state::SharedState;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
#[must_use]
pub struct StatsResponse {
    pub total_users: usize,
    pub last_broadcast: Option<DateTime<Utc>>,
    pub users: Vec<RecipientId>,
}

#[instrument(skip_all)]
#[debug_handler]
pub async fn show(State(state): State<SharedState>) -> Json<StatsResponse> {
    let users: Vec<_> = state
        .repository
        .recipients
        .snapshot()
        .await
        .into_iter()
        .collect();
    let last_broadcast = state
        .repository
        .broadcasts
        .last()
        .await
        .map(|record| record.completed_at);

    tracing::debug!(total_users = users.len(), ?last_broadcast, "Serving stats");
    Json(StatsResponse {
        total_users: users.len(),
        last_broadcast,
        users,
    })
}

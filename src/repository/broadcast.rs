use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::BroadcastResult;

#[derive(Debug, Clone)]
#[must_use]
pub struct BroadcastRecord {
    pub completed_at: DateTime<Utc>,
    pub result: BroadcastResult,
}

/// Keeps the outcome of the most recent completed broadcast.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct BroadcastLogRepository {
    pub(super) last: Arc<RwLock<Option<BroadcastRecord>>>,
}

impl BroadcastLogRepository {
    pub async fn record(&self, result: BroadcastResult) -> BroadcastRecord {
        let record = BroadcastRecord {
            completed_at: Utc::now(),
            result,
        };
        *self.last.write().await = Some(record.clone());
        record
    }

    pub async fn last(&self) -> Option<BroadcastRecord> {
        self.last.read().await.clone()
    }
}

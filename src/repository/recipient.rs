use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::instrument;

use crate::models::RecipientId;

/// In-memory set of recipients registered through the bot.
///
/// Cloning the repository shares the underlying set. Readers never iterate
/// the live set: [`RecipientRepository::snapshot`] hands out a copy.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct RecipientRepository {
    pub(super) recipients: Arc<RwLock<BTreeSet<RecipientId>>>,
}

impl RecipientRepository {
    /// Returns `true` when the recipient was not registered before.
    #[instrument(skip(self))]
    pub async fn register(&self, recipient: RecipientId) -> bool {
        let mut recipients = self.recipients.write().await;
        let inserted = recipients.insert(recipient);
        if inserted {
            tracing::info!(total = recipients.len(), "Registered new recipient");
        } else {
            tracing::debug!(total = recipients.len(), "Recipient already registered");
        }
        inserted
    }

    pub async fn snapshot(&self) -> BTreeSet<RecipientId> {
        self.recipients.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.recipients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.recipients.read().await.is_empty()
    }
}

use std::time::Duration;

use tracing::instrument;

use super::UpdateHandler;
use crate::telegram::TelegramClient;

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Pulls updates with `getUpdates` when no webhook is configured.
#[derive(Debug, Clone)]
#[must_use]
pub struct Poller {
    client: TelegramClient,
    handler: UpdateHandler,
    timeout_secs: u64,
}

impl Poller {
    pub const fn new(client: TelegramClient, handler: UpdateHandler, timeout_secs: u64) -> Self {
        Self {
            client,
            handler,
            timeout_secs,
        }
    }

    /// Polls until the task is aborted.
    #[instrument(name = "poller", skip_all, fields(timeout_secs = self.timeout_secs))]
    pub async fn run(self) {
        // getUpdates is refused while a webhook is registered.
        let _ = self
            .client
            .delete_webhook()
            .await
            .inspect_err(|error| tracing::warn!(?error, "Failed to remove webhook"));

        tracing::info!("Polling for updates");
        let mut offset = 0;
        loop {
            offset = self.poll_once(offset).await;
        }
    }

    /// Handles one batch and returns the offset for the next request.
    pub async fn poll_once(&self, offset: i64) -> i64 {
        match self.client.get_updates(offset, self.timeout_secs).await {
            Ok(updates) => {
                let mut next = offset;
                for update in &updates {
                    next = next.max(update.update_id + 1);
                    self.handler.handle(update).await;
                }
                if !updates.is_empty() {
                    tracing::debug!(count = updates.len(), next_offset = next, "Handled updates");
                }
                next
            }
            Err(error) => {
                tracing::error!(?error, backoff = ?ERROR_BACKOFF, "Polling failed, backing off");
                tokio::time::sleep(ERROR_BACKOFF).await;
                offset
            }
        }
    }
}

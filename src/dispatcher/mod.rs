use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::instrument;
use uuid::Uuid;

use crate::delivery::{DeliveryClient, DeliveryError};
use crate::models::{
    BroadcastRequest, BroadcastResult, DeliveryOutcome, MAX_CAPTION_LEN, MAX_TEXT_LEN, RecipientId,
};

pub mod policy;

pub use policy::{Backoff, DispatchConfig, FanOut, RetryPolicy};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Broadcast message is empty")]
    EmptyMessage,

    #[error("Broadcast message has {len} characters, the limit is {max}")]
    MessageTooLong { len: usize, max: usize },

    #[error("An image was requested but no attachment is configured")]
    NoAttachment,

    #[error("Attachment {} is unavailable", .path.display())]
    AttachmentUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy)]
enum Payload<'a> {
    Text(&'a str),
    Image { caption: &'a str, image: &'a Path },
}

#[derive(Debug, Clone)]
#[must_use]
pub struct Dispatcher {
    client: Arc<dyn DeliveryClient>,
    config: DispatchConfig,
    attachment: Option<PathBuf>,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn DeliveryClient>,
        config: DispatchConfig,
        attachment: Option<PathBuf>,
    ) -> Self {
        Self {
            client,
            config,
            attachment,
        }
    }

    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Delivers `request` to every recipient in `recipients`.
    ///
    /// The returned result always satisfies
    /// `successful + failed == total == recipients.len()`.
    #[instrument(
        skip_all,
        fields(
            broadcast_id = %Uuid::new_v4(),
            total = recipients.len(),
            with_image = request.with_image,
        ),
        err(Debug)
    )]
    pub async fn dispatch(
        &self,
        recipients: &BTreeSet<RecipientId>,
        request: &BroadcastRequest,
    ) -> Result<BroadcastResult, DispatchError> {
        let payload = self.payload(request).await?;
        tracing::info!(fan_out = ?self.config.fan_out, "Starting broadcast");

        let outcomes = match self.config.fan_out {
            FanOut::Sequential { pause } => {
                let mut outcomes = Vec::with_capacity(recipients.len());
                for &recipient in recipients {
                    let outcome = self.send_with_retry(recipient, payload).await;
                    outcomes.push((recipient, outcome));
                    tokio::time::sleep(pause).await;
                }
                outcomes
            }
            FanOut::Concurrent { limit, pause } => {
                stream::iter(recipients.iter().copied())
                    .map(|recipient| async move {
                        let outcome = self.send_with_retry(recipient, payload).await;
                        tokio::time::sleep(pause).await;
                        (recipient, outcome)
                    })
                    .buffer_unordered(limit.get())
                    .collect::<Vec<_>>()
                    .await
            }
        };

        let result = BroadcastResult::from_outcomes(outcomes);
        tracing::info!(
            total = result.total,
            successful = result.successful,
            failed = result.failed,
            "Broadcast finished"
        );
        if result.failed > 0 {
            tracing::warn!(failed_recipients = ?result.failed_recipients, "Some recipients were not reached");
        }

        Ok(result)
    }

    async fn payload<'a>(
        &'a self,
        request: &'a BroadcastRequest,
    ) -> Result<Payload<'a>, DispatchError> {
        let text = request.message.as_str();
        if text.trim().is_empty() {
            return Err(DispatchError::EmptyMessage);
        }

        let max = if request.with_image {
            MAX_CAPTION_LEN
        } else {
            MAX_TEXT_LEN
        };
        let len = text.chars().count();
        if len > max {
            return Err(DispatchError::MessageTooLong { len, max });
        }

        if !request.with_image {
            return Ok(Payload::Text(text));
        }

        let image = self.attachment.as_deref().ok_or(DispatchError::NoAttachment)?;
        tokio::fs::metadata(image)
            .await
            .and_then(|metadata| {
                if metadata.is_file() {
                    Ok(())
                } else {
                    Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"))
                }
            })
            .inspect_err(|error| tracing::error!(?error, ?image, "Attachment is not readable"))
            .map_err(|source| DispatchError::AttachmentUnavailable {
                path: image.to_path_buf(),
                source,
            })?;

        Ok(Payload::Image {
            caption: text,
            image,
        })
    }

    #[instrument(skip_all, fields(%recipient))]
    async fn send_with_retry(&self, recipient: RecipientId, payload: Payload<'_>) -> DeliveryOutcome {
        let max_attempts = self.config.retry.max_attempts.get();
        let mut attempt = 1;

        loop {
            match self.attempt(recipient, payload).await {
                Ok(()) => {
                    tracing::debug!(attempt, "Delivered");
                    return DeliveryOutcome::Delivered { attempts: attempt };
                }
                Err(error) if attempt < max_attempts => {
                    let delay = self.config.retry.backoff.delay(attempt);
                    tracing::warn!(attempt, ?delay, %error, "Delivery attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(attempts = attempt, %error, "All delivery attempts failed");
                    return DeliveryOutcome::Failed {
                        attempts: attempt,
                        reason: error.to_string(),
                    };
                }
            }
        }
    }

    async fn attempt(&self, recipient: RecipientId, payload: Payload<'_>) -> Result<(), DeliveryError> {
        match payload {
            Payload::Text(text) => self.client.send_text(recipient, text).await,
            Payload::Image { caption, image } => {
                self.client.send_image(recipient, caption, image).await
            }
        }
    }
}

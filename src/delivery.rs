use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::models::RecipientId;

/// Sends messages to a single recipient on the messaging platform.
///
/// Implementations are shared between concurrent dispatch tasks, so every
/// method takes `&self`. Any returned error is treated by callers as
/// transient and opaque.
#[async_trait]
pub trait DeliveryClient: fmt::Debug + Send + Sync {
    async fn send_text(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError>;

    async fn send_image(
        &self,
        recipient: RecipientId,
        caption: &str,
        image: &Path,
    ) -> Result<(), DeliveryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} rejected with status {status}: {description}")]
    Rejected {
        method: &'static str,
        status: u16,
        description: String,
    },

    #[error("Failed to read attachment: {0}")]
    Attachment(#[from] std::io::Error),
}

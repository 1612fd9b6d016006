use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Longest text accepted by the platform for a plain message.
pub const MAX_TEXT_LEN: usize = 4096;

/// Longest text accepted by the platform as an image caption.
pub const MAX_CAPTION_LEN: usize = 1024;

/// Chat identifier of a registered recipient.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RecipientId(pub i64);

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Validate, Clone, Debug)]
#[serde(rename_all = "camelCase")]
#[must_use]
pub struct BroadcastRequest {
    #[validate(length(min = 1, max = 4096))]
    pub message: String,
    #[serde(default)]
    pub with_image: bool,
}

impl BroadcastRequest {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            with_image: false,
        }
    }

    pub fn with_image(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            with_image: true,
        }
    }
}

/// Terminal state of one recipient within a dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Failed { attempts: u32, reason: String },
}

impl DeliveryOutcome {
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts } | Self::Failed { attempts, .. } => *attempts,
        }
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct BroadcastResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub failed_recipients: Vec<RecipientId>,
}

impl BroadcastResult {
    /// Reduces per-recipient outcomes into counters. Failed recipients come
    /// back sorted so the result does not depend on completion order.
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (RecipientId, DeliveryOutcome)>,
    {
        let mut result = Self::default();
        for (recipient, outcome) in outcomes {
            result.total += 1;
            if outcome.is_delivered() {
                result.successful += 1;
            } else {
                result.failed_recipients.push(recipient);
            }
        }
        result.failed_recipients.sort_unstable();
        result.failed = result.failed_recipients.len();
        result
    }
}

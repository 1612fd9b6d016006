pub mod broadcast;
pub mod recipient;

#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Repository {
    pub recipients: recipient::RecipientRepository,
    pub broadcasts: broadcast::BroadcastLogRepository,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }
}

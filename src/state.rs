use std::sync::Arc;

use crate::bot::UpdateHandler;
use crate::dispatcher::Dispatcher;
use crate::repository::Repository;

#[derive(Debug, Clone)]
#[must_use]
pub struct SharedState {
    pub repository: Repository,
    pub dispatcher: Arc<Dispatcher>,
    pub updates: UpdateHandler,
    pub webhook_enabled: bool,
}

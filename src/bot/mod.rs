use std::sync::Arc;

use tracing::instrument;

use crate::delivery::DeliveryClient;
use crate::models::RecipientId;
use crate::repository::recipient::RecipientRepository;
use crate::telegram::{Message, Update, User};

pub mod polling;

pub const WELCOME_TEXT: &str = "🚀 Welcome!\n\nYou are subscribed and will be notified as soon as we launch. Stay tuned!";
pub const USAGE_HINT: &str = "Send /start to subscribe to launch notifications.";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Start,
    Other(&'a str),
}

impl<'a> Command<'a> {
    /// Parses `/name`, `/name@bot` and `/name args` forms.
    fn parse(text: &'a str) -> Option<Self> {
        let rest = text.trim_start().strip_prefix('/')?;
        let token = rest.split_whitespace().next().unwrap_or_default();
        let name = token.split('@').next().unwrap_or(token);
        match name {
            "start" => Some(Self::Start),
            _ => Some(Self::Other(name)),
        }
    }
}

/// What the handler did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Registered { newly: bool },
    Hinted,
    Ignored,
}

#[derive(Debug, Clone)]
#[must_use]
pub struct UpdateHandler {
    recipients: RecipientRepository,
    client: Arc<dyn DeliveryClient>,
}

impl UpdateHandler {
    pub fn new(recipients: RecipientRepository, client: Arc<dyn DeliveryClient>) -> Self {
        Self { recipients, client }
    }

    #[instrument(skip_all, fields(update_id = update.update_id))]
    pub async fn handle(&self, update: &Update) -> UpdateAction {
        let Some(message) = &update.message else {
            tracing::trace!("Ignoring update without a message");
            return UpdateAction::Ignored;
        };

        Self::log_message(message);
        let chat = RecipientId(message.chat.id);

        // Media without text is answered like plain text.
        match message.text.as_deref().and_then(Command::parse) {
            Some(Command::Start) => {
                let newly = self.recipients.register(chat).await;
                let total = self.recipients.len().await;
                tracing::info!(%chat, newly, total, "User started the bot");
                self.reply(chat, WELCOME_TEXT).await;
                UpdateAction::Registered { newly }
            }
            Some(Command::Other(name)) => {
                tracing::debug!(command = name, "Ignoring unknown command");
                UpdateAction::Ignored
            }
            None => {
                self.reply(chat, USAGE_HINT).await;
                UpdateAction::Hinted
            }
        }
    }

    fn log_message(message: &Message) {
        let user = message.from.as_ref();
        let name = user.map(User::display_name).unwrap_or_default();
        tracing::info!(
            chat_id = message.chat.id,
            user_id = user.map(|user| user.id),
            username = user.and_then(|user| user.username.as_deref()).unwrap_or("-"),
            name = %name,
            kind = %message.kind(),
            content = message.text.as_deref().unwrap_or("-"),
            "Received message"
        );
    }

    async fn reply(&self, chat: RecipientId, text: &str) {
        let _ = self
            .client
            .send_text(chat, text)
            .await
            .inspect_err(|error| tracing::warn!(%chat, ?error, "Failed to reply"));
    }
}

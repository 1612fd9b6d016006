#![allow(clippy::missing_errors_doc)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use bot::UpdateHandler;
use bot::polling::Poller;
use clap::{Parser, ValueEnum};
use delivery::DeliveryClient;
use dispatcher::{Backoff, DispatchConfig, Dispatcher, FanOut, RetryPolicy};
use repository::Repository;
use state::SharedState;
use telegram::TelegramClient;
use telegram::client::BotToken;
use tokio::net::TcpListener;
use tracing::instrument;

pub mod bot;
pub mod delivery;
pub mod dispatcher;
pub mod endpoints;
pub mod layers;
pub mod models;
pub mod repository;
pub mod state;
pub mod telegram;

#[cfg(test)]
mod test_support;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackoffKind {
    Exponential,
    Linear,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FanOutKind {
    Sequential,
    Concurrent,
}

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
#[must_use]
pub struct Settings {
    #[arg(env = "LISTEN_ADDR", default_value_t = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3000))]
    pub socket_addr: SocketAddr,

    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<BotToken>,

    /// Public URL of `/api/webhook`. Updates are polled when unset.
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    #[arg(long, env = "TELEGRAM_API_URL", default_value = "https://api.telegram.org")]
    pub api_base_url: String,

    /// Image attached to broadcasts sent with `withImage`.
    #[arg(long, env = "BROADCAST_IMAGE", default_value = "img/broadcast.jpeg")]
    pub image_path: PathBuf,

    #[arg(long, env = "BROADCAST_MAX_ATTEMPTS", default_value_t = 3)]
    pub max_attempts: u32,

    #[arg(long, env = "BROADCAST_BACKOFF", value_enum, default_value_t = BackoffKind::Exponential)]
    pub backoff: BackoffKind,

    /// First backoff delay (exponential) or step (linear).
    #[arg(long, env = "BROADCAST_BACKOFF_BASE_MS", default_value_t = 1000)]
    pub backoff_base_ms: u64,

    #[arg(long, env = "BROADCAST_FAN_OUT", value_enum, default_value_t = FanOutKind::Sequential)]
    pub fan_out: FanOutKind,

    #[arg(long, env = "BROADCAST_CONCURRENCY", default_value_t = 8)]
    pub concurrency_limit: usize,

    /// Pause after each recipient's attempts.
    #[arg(long, env = "BROADCAST_PAUSE_MS", default_value_t = 200)]
    pub recipient_pause_ms: u64,

    #[arg(long, env = "POLL_TIMEOUT_SECS", default_value_t = 30)]
    pub poll_timeout_secs: u64,
}

impl Settings {
    pub fn dispatch_config(&self) -> Result<DispatchConfig, ConfigError> {
        let max_attempts = NonZeroU32::new(self.max_attempts).ok_or(ConfigError::ZeroAttempts)?;
        let base = Duration::from_millis(self.backoff_base_ms);
        let backoff = match self.backoff {
            BackoffKind::Exponential => Backoff::Exponential { base },
            BackoffKind::Linear => Backoff::Linear { step: base },
        };

        let pause = Duration::from_millis(self.recipient_pause_ms);
        let fan_out = match self.fan_out {
            FanOutKind::Sequential => FanOut::Sequential { pause },
            FanOutKind::Concurrent => FanOut::Concurrent {
                limit: NonZeroUsize::new(self.concurrency_limit)
                    .ok_or(ConfigError::ZeroConcurrency)?,
                pause,
            },
        };

        Ok(DispatchConfig {
            retry: RetryPolicy {
                max_attempts,
                backoff,
            },
            fan_out,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BOT_TOKEN is required")]
    MissingBotToken,

    #[error("Broadcast attempt count must be at least 1")]
    ZeroAttempts,

    #[error("Broadcast concurrency limit must be at least 1")]
    ZeroConcurrency,

    #[error("Failed to build the HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(endpoints::health))
        .route("/api/broadcast", post(endpoints::broadcast::send))
        .route("/api/stats", get(endpoints::stats::show))
        .route("/api/webhook", post(endpoints::webhook::receive))
        .layer(layers::trace_layer())
        .with_state(state)
}

#[instrument(skip_all, fields(socket_addr = %settings.socket_addr))]
pub async fn run(settings: Settings) -> Result<(), color_eyre::eyre::Report> {
    let dispatch_config = settings.dispatch_config()?;
    let token = settings
        .bot_token
        .as_ref()
        .ok_or(ConfigError::MissingBotToken)?;
    let client = TelegramClient::new(&settings.api_base_url, token)?;
    let delivery: Arc<dyn DeliveryClient> = Arc::new(client.clone());

    if !tokio::fs::try_exists(&settings.image_path).await? {
        tracing::warn!(image_path = ?settings.image_path, "Broadcast image not found, image broadcasts will be refused");
    }

    let repository = Repository::new();
    let dispatcher = Dispatcher::new(
        delivery.clone(),
        dispatch_config,
        Some(settings.image_path.clone()),
    );
    tracing::info!(config = ?dispatcher.config(), "Dispatcher ready");
    let updates = UpdateHandler::new(repository.recipients.clone(), delivery);

    let poller = if let Some(url) = &settings.webhook_url {
        client.set_webhook(url).await?;
        tracing::info!(%url, "Receiving updates through the webhook");
        None
    } else {
        let poller = Poller::new(client, updates.clone(), settings.poll_timeout_secs);
        Some(tokio::spawn(poller.run()))
    };

    let shared_state = SharedState {
        repository,
        dispatcher: Arc::new(dispatcher),
        updates,
        webhook_enabled: settings.webhook_url.is_some(),
    };

    let listener = TcpListener::bind(settings.socket_addr).await?;
    tracing::info!(listen_addr = ?listener.local_addr()?, "Bound to local socket");

    axum::serve(listener, router(shared_state))
        .with_graceful_shutdown(self::shutdown_signal())
        .await?;

    if let Some(poller) = poller {
        poller.abort();
        tracing::debug!("Stopped update poller");
    }

    Ok(())
}

#[instrument]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c()
        .await
        .inspect(|()| tracing::info!("Caught CTRL+C signal, shutting down"))
        .inspect_err(|error| tracing::error!(?error, "Failed to await CTRL+C signal"));
}

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use super::Update;
use crate::ConfigError;
use crate::delivery::{DeliveryClient, DeliveryError};
use crate::models::RecipientId;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PARSE_MODE: &str = "HTML";

/// Bot API token. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct BotToken(String);

impl BotToken {
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for BotToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotToken(***)")
    }
}

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone)]
#[must_use]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base_url: String,
    endpoint: String,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(api_base_url: &str, token: &BotToken) -> Result<Self, ConfigError> {
        let token = token.expose().trim();
        if token.is_empty() {
            return Err(ConfigError::MissingBotToken);
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ConfigError::HttpClient)?;
        let api_base_url = api_base_url.trim_end_matches('/').to_owned();
        let endpoint = format!("{api_base_url}/bot{token}");

        Ok(Self {
            http,
            api_base_url,
            endpoint,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.endpoint)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, DeliveryError> {
        // Transport errors carry the request URL, which embeds the token.
        let response = request.send().await.map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let envelope = response
            .json::<ApiResponse<T>>()
            .await
            .map_err(reqwest::Error::without_url)?;

        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } if status.is_success() => Ok(result),
            ApiResponse { description, .. } => Err(DeliveryError::Rejected {
                method,
                status: status.as_u16(),
                description: description.unwrap_or_else(|| "no description".to_owned()),
            }),
        }
    }

    /// Long-polls for updates newer than `offset`.
    #[instrument(skip(self), err(Debug, level = tracing::Level::WARN))]
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, DeliveryError> {
        let request = self
            .http
            .post(self.url("getUpdates"))
            .timeout(REQUEST_TIMEOUT + Duration::from_secs(timeout_secs))
            .json(&json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }));
        self.execute("getUpdates", request).await
    }

    #[instrument(skip(self), err(Debug))]
    pub async fn set_webhook(&self, url: &str) -> Result<(), DeliveryError> {
        let request = self.http.post(self.url("setWebhook")).json(&json!({ "url": url }));
        self.execute::<IgnoredAny>("setWebhook", request).await?;
        tracing::info!("Webhook registered");
        Ok(())
    }

    #[instrument(skip(self), err(Debug))]
    pub async fn delete_webhook(&self) -> Result<(), DeliveryError> {
        let request = self.http.post(self.url("deleteWebhook"));
        self.execute::<IgnoredAny>("deleteWebhook", request).await?;
        tracing::debug!("Webhook removed, updates will be polled");
        Ok(())
    }
}

#[async_trait]
impl DeliveryClient for TelegramClient {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn send_text(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError> {
        let request = self.http.post(self.url("sendMessage")).json(&json!({
            "chat_id": recipient,
            "text": text,
            "parse_mode": PARSE_MODE,
            "disable_web_page_preview": true,
        }));
        self.execute::<IgnoredAny>("sendMessage", request).await?;
        tracing::trace!("Message sent");
        Ok(())
    }

    #[instrument(skip(self, caption), fields(caption_len = caption.len()))]
    async fn send_image(
        &self,
        recipient: RecipientId,
        caption: &str,
        image: &Path,
    ) -> Result<(), DeliveryError> {
        let file = tokio::fs::File::open(image)
            .await
            .inspect_err(|error| tracing::error!(?error, "Failed to open attachment"))?;
        let length = file.metadata().await?.len();
        let file_name = image
            .file_name()
            .map_or_else(|| "image".to_owned(), |name| name.to_string_lossy().into_owned());

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let photo = Part::stream_with_length(body, length).file_name(file_name);
        let form = Form::new()
            .text("chat_id", recipient.to_string())
            .text("caption", caption.to_owned())
            .text("parse_mode", PARSE_MODE)
            .part("photo", photo);

        let request = self.http.post(self.url("sendPhoto")).multipart(form);
        self.execute::<IgnoredAny>("sendPhoto", request).await?;
        tracing::trace!("Photo sent");
        Ok(())
    }
}

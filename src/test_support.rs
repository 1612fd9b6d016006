use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::delivery::{DeliveryClient, DeliveryError};
use crate::models::RecipientId;

#[derive(Debug, Clone, Copy)]
enum Script {
    FailTimes(u32),
    AlwaysFail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    Text,
    Image(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub recipient: RecipientId,
    pub kind: CallKind,
    pub text: String,
    pub at: Instant,
}

/// Records every call and fails recipients according to a script.
/// Recipients without a script always succeed.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: Mutex<HashMap<RecipientId, Script>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    pub fn fail_times(self, recipient: i64, times: u32) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(RecipientId(recipient), Script::FailTimes(times));
        self
    }

    pub fn always_fail(self, recipient: i64) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(RecipientId(recipient), Script::AlwaysFail);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, recipient: i64) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.recipient == RecipientId(recipient))
            .collect()
    }

    fn answer(&self, recipient: RecipientId, kind: CallKind, text: &str) -> Result<(), DeliveryError> {
        self.calls.lock().unwrap().push(Call {
            recipient,
            kind,
            text: text.to_owned(),
            at: Instant::now(),
        });

        let mut script = self.script.lock().unwrap();
        let fail = match script.get_mut(&recipient) {
            Some(Script::AlwaysFail) => true,
            Some(Script::FailTimes(remaining)) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };

        if fail {
            Err(DeliveryError::Rejected {
                method: "scripted",
                status: 403,
                description: format!("scripted failure for {recipient}"),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DeliveryClient for ScriptedClient {
    async fn send_text(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError> {
        self.answer(recipient, CallKind::Text, text)
    }

    async fn send_image(
        &self,
        recipient: RecipientId,
        caption: &str,
        image: &Path,
    ) -> Result<(), DeliveryError> {
        self.answer(recipient, CallKind::Image(image.to_path_buf()), caption)
    }
}

pub const TEST_TOKEN: &str = "123456:test-token";

/// Local stand-in for the Bot API. Records raw request bodies per method.
#[derive(Debug, Clone, Default)]
pub struct MockBotApi {
    requests: Arc<Mutex<Vec<(String, String)>>>,
    blocked: Arc<Mutex<HashSet<i64>>>,
    updates: Arc<Mutex<Vec<Value>>>,
}

impl MockBotApi {
    /// `sendMessage` to `chat_id` answers 403 like a chat that blocked the bot.
    pub fn block(self, chat_id: i64) -> Self {
        self.blocked.lock().unwrap().insert(chat_id);
        self
    }

    pub fn push_update(&self, update: Value) {
        self.updates.lock().unwrap().push(update);
    }

    pub fn requests(&self, method: &str) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == method)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Serves the mock on an ephemeral port and returns its base URL.
    pub async fn spawn(&self) -> String {
        let router = Router::new()
            .route("/{bot}/{method}", post(Self::handle))
            .with_state(self.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    async fn handle(
        State(api): State<Self>,
        UrlPath((bot, method)): UrlPath<(String, String)>,
        body: Bytes,
    ) -> (StatusCode, Json<Value>) {
        if bot != format!("bot{TEST_TOKEN}") {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "ok": false, "error_code": 404, "description": "Not Found" })),
            );
        }

        let body = String::from_utf8_lossy(&body).into_owned();
        api.requests.lock().unwrap().push((method.clone(), body.clone()));

        match method.as_str() {
            "sendMessage" => {
                let chat_id = serde_json::from_str::<Value>(&body).unwrap()["chat_id"]
                    .as_i64()
                    .unwrap();
                if api.blocked.lock().unwrap().contains(&chat_id) {
                    return (
                        StatusCode::FORBIDDEN,
                        Json(json!({
                            "ok": false,
                            "error_code": 403,
                            "description": "Forbidden: bot was blocked by the user",
                        })),
                    );
                }
                (StatusCode::OK, Json(json!({ "ok": true, "result": { "message_id": 1 } })))
            }
            "sendPhoto" => (StatusCode::OK, Json(json!({ "ok": true, "result": { "message_id": 2 } }))),
            "getUpdates" => {
                let updates = std::mem::take(&mut *api.updates.lock().unwrap());
                if updates.is_empty() {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                (StatusCode::OK, Json(json!({ "ok": true, "result": updates })))
            }
            "setWebhook" | "deleteWebhook" => {
                (StatusCode::OK, Json(json!({ "ok": true, "result": true })))
            }
            _ => (
                StatusCode::NOT_FOUND,
                Json(json!({ "ok": false, "error_code": 404, "description": "Not Found" })),
            ),
        }
    }
}

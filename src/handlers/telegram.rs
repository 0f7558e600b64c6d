use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use serenity::async_trait;
use tokio::time::sleep;

use crate::error::DeliveryError;
use crate::events::queue::{BotEvent, ChatKind, EventBus, Inbound};
use crate::handlers::sender::MessageSender;
use crate::models::ChatId;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Bot API client used both for long polling and for sending messages.
pub struct TelegramClient {
    token: String,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self::with_base(token, API_BASE.to_string())
    }

    pub fn with_base(token: String, api_base: String) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
            api_base,
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    pub async fn get_updates(&self, offset: i64, poll_timeout: u64) -> Result<Vec<Update>, String> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": poll_timeout,
            "allowed_updates": ["message"],
        });
        let response = self
            .client
            .post(self.url("getUpdates"))
            .timeout(Duration::from_secs(poll_timeout + 10))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("getUpdates request failed: {e}"))?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| format!("getUpdates returned invalid json: {e}"))?;
        parse_updates(payload)
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send_message(&self, chat_id: ChatId, content: &str) -> Result<(), DeliveryError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": content,
        });
        let response = self
            .client
            .post(self.url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        classify_send_response(status, &payload)
    }
}

/// Maps a `sendMessage` reply onto a delivery outcome. A `migrate_to_chat_id`
/// parameter means the group was upgraded and now lives under a new id.
pub fn classify_send_response(status: u16, payload: &Value) -> Result<(), DeliveryError> {
    if payload.get("ok") == Some(&Value::Bool(true)) {
        return Ok(());
    }
    let parameters = payload.get("parameters");
    if let Some(new_chat_id) = parameters
        .and_then(|p| p.get("migrate_to_chat_id"))
        .and_then(Value::as_i64)
    {
        return Err(DeliveryError::Migrated { new_chat_id });
    }
    let description = payload
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("unknown Telegram API error")
        .to_string();
    if status == 429 || status >= 500 {
        return Err(DeliveryError::Transport(format!("{status}: {description}")));
    }
    Err(DeliveryError::Rejected(description))
}

pub fn parse_updates(payload: Value) -> Result<Vec<Update>, String> {
    if payload.get("ok") != Some(&Value::Bool(true)) {
        let description = payload
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown Telegram API error");
        return Err(format!("getUpdates failed: {description}"));
    }
    let result = payload.get("result").cloned().unwrap_or(Value::Array(Vec::new()));
    serde_json::from_value(result).map_err(|e| format!("unexpected update shape: {e}"))
}

pub fn inbound_from_update(update: &Update) -> Option<Inbound> {
    let message = update.message.as_ref()?;
    let text = message.text.as_ref()?;
    let chat_kind = match message.chat.kind.as_str() {
        "private" => ChatKind::Private,
        _ => ChatKind::Group,
    };
    Some(Inbound {
        chat_id: message.chat.id,
        chat_kind,
        text: text.clone(),
    })
}

/// Long-polls for updates and forwards text messages to the command worker.
pub async fn run_telegram_polling(client: &TelegramClient, bus: EventBus, poll_timeout: u64) {
    let mut offset = 0;
    tracing::info!("telegram polling started");
    loop {
        let updates = match client.get_updates(offset, poll_timeout).await {
            Ok(updates) => updates,
            Err(err) => {
                tracing::warn!(error = %err, "telegram polling failed, backing off");
                sleep(Duration::from_secs(5)).await;
                continue;
            }
        };
        for update in updates {
            offset = offset.max(update.update_id + 1);
            if let Some(inbound) = inbound_from_update(&update) {
                bus.emit(BotEvent::Command(inbound)).await;
            }
        }
    }
}

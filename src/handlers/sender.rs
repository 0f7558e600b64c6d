use std::time::Duration;

use serenity::async_trait;

use crate::error::DeliveryError;
use crate::models::ChatId;

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: ChatId, content: &str) -> Result<(), DeliveryError>;
}

/// Sends one message, giving up after `limit` so a stalled transport cannot hold a sweep.
pub async fn deliver<S: MessageSender + ?Sized>(
    sender: &S,
    chat_id: ChatId,
    content: &str,
    limit: Duration,
) -> Result<(), DeliveryError> {
    match tokio::time::timeout(limit, sender.send_message(chat_id, content)).await {
        Ok(result) => result,
        Err(_) => Err(DeliveryError::Timeout),
    }
}

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::ChatId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

/// A line of text received from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub text: String,
}

#[derive(Debug)]
pub enum BotEvent {
    Command(Inbound),
    ConfirmationExpired { chat_id: ChatId, token: Uuid },
}

#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<BotEvent>,
}

impl EventBus {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<BotEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    pub async fn emit(&self, event: BotEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::warn!("command worker is gone, dropping event");
        }
    }
}

use inquire::Text;
use serenity::async_trait;

use crate::error::DeliveryError;
use crate::events::queue::{BotEvent, ChatKind, EventBus, Inbound};
use crate::handlers::sender::MessageSender;
use crate::models::ChatId;

/// Prints outgoing messages to stdout, tagged with the target chat.
pub struct ConsoleSender;

#[async_trait]
impl MessageSender for ConsoleSender {
    async fn send_message(&self, chat_id: ChatId, content: &str) -> Result<(), DeliveryError> {
        println!("[{}] {}", chat_id, content);
        Ok(())
    }
}

fn read_line() -> Option<String> {
    Text::new(">").prompt().ok()
}

/// Local chat session: every line typed is handled as a private message from `chat_id`.
/// Ends on `exit`, `quit` or when the prompt is cancelled.
pub async fn run_console(bus: EventBus, chat_id: ChatId) {
    tracing::info!(chat_id, "console session started");
    loop {
        let line = match tokio::task::spawn_blocking(read_line).await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::error!(error = %err, "console reader failed");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if matches!(trimmed, "exit" | "quit") {
            break;
        }
        bus.emit(BotEvent::Command(Inbound {
            chat_id,
            chat_kind: ChatKind::Private,
            text: trimmed.to_string(),
        }))
        .await;
    }
    tracing::info!("console session ended");
}

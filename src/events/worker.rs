use chrono::Utc;
use tokio::sync::mpsc;

use crate::events::queue::BotEvent;
use crate::handlers::command::CommandHandler;

/// Single writer for command handling: events are processed strictly one at a time.
pub async fn run_command_worker(mut rx: mpsc::Receiver<BotEvent>, mut handler: CommandHandler) {
    tracing::info!("command worker started");
    while let Some(event) = rx.recv().await {
        handler.handle_event(event, Utc::now()).await;
    }
    tracing::info!("command worker stopped");
}

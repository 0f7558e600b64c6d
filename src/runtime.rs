use std::sync::Arc;

use chrono::Duration as ChronoDuration;

use crate::config::{RunMode, Settings};
use crate::error::RunError;
use crate::events::queue::EventBus;
use crate::events::worker;
use crate::handlers::command::{CommandHandler, HandlerOptions};
use crate::handlers::console::{self, ConsoleSender};
use crate::handlers::discord::{self, DiscordHandler, DiscordSender};
use crate::handlers::sender::MessageSender;
use crate::handlers::telegram::{self, TelegramClient};
use crate::models::ChatId;
use crate::state::AppState;
use crate::tasks::reminder_loop;
use crate::tasks::sweeper_loop;
use crate::tasks::task_runner::TaskRunner;

const EVENT_BUFFER: usize = 64;

enum Transport {
    Telegram(Arc<TelegramClient>, u64),
    Discord(Box<serenity::Client>),
    Console(ChatId),
}

async fn connect(
    settings: &Settings,
    bus: &EventBus,
) -> Result<(Arc<dyn MessageSender>, Transport), RunError> {
    match settings.run_mode {
        RunMode::Telegram => {
            let client = Arc::new(TelegramClient::new(settings.telegram_token()?.to_string()));
            let sender: Arc<dyn MessageSender> = client.clone();
            Ok((sender, Transport::Telegram(client, settings.telegram_poll_timeout)))
        }
        RunMode::Discord => {
            let token = settings.discord_token()?;
            let client = serenity::Client::builder(token, discord::intents())
                .event_handler(DiscordHandler::new(bus.clone()))
                .await?;
            let sender: Arc<dyn MessageSender> = Arc::new(DiscordSender::new(token));
            Ok((sender, Transport::Discord(Box::new(client))))
        }
        RunMode::Console => {
            let sender: Arc<dyn MessageSender> = Arc::new(ConsoleSender);
            Ok((sender, Transport::Console(settings.console_chat_id)))
        }
    }
}

async fn serve(transport: Transport, bus: EventBus) -> Result<(), RunError> {
    match transport {
        Transport::Telegram(client, poll_timeout) => {
            telegram::run_telegram_polling(&client, bus, poll_timeout).await;
            Ok(())
        }
        Transport::Discord(mut client) => {
            client.start().await?;
            Ok(())
        }
        Transport::Console(chat_id) => {
            console::run_console(bus, chat_id).await;
            Ok(())
        }
    }
}

/// Starts the command worker and background loops, serves the configured
/// transport until it stops or Ctrl-C arrives, then flushes the stores.
pub async fn run(settings: Settings, state: AppState) -> Result<(), RunError> {
    let (bus, rx) = EventBus::new(EVENT_BUFFER);
    let (sender, transport) = connect(&settings, &bus).await?;

    if settings.admin_password.is_none() {
        tracing::warn!("ADMIN_PASSWORD is not set, admin registration is disabled");
    }
    let options = HandlerOptions {
        timezone: settings.timezone,
        admin_password: settings.admin_password.clone(),
        confirm_ttl: ChronoDuration::from_std(settings.confirm_timeout)
            .unwrap_or_else(|_| ChronoDuration::seconds(30)),
        delivery_timeout: settings.delivery_timeout,
    };
    let handler = CommandHandler::new(state.clone(), sender.clone(), bus.clone(), options);

    let mut task_runner = TaskRunner::new();
    task_runner.add_task("command_worker", move || {
        tokio::spawn(worker::run_command_worker(rx, handler))
    });
    task_runner.add_task("sweeper", {
        let calendar = state.calendar.clone();
        let interval = settings.sweep_interval;
        move || tokio::spawn(sweeper_loop::run_sweeper_loop(calendar, interval))
    });
    task_runner.add_task("reminder", {
        let state = state.clone();
        let sender = sender.clone();
        let interval = settings.reminder_interval;
        let timeout = settings.delivery_timeout;
        move || tokio::spawn(reminder_loop::run_reminder_loop(state, sender, interval, timeout))
    });
    let running = task_runner.start_all();
    tracing::info!(mode = %settings.run_mode, tasks = running.len(), "bot running");

    let outcome = tokio::select! {
        result = serve(transport, bus) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
            Ok(())
        }
    };

    running.abort_all();
    if let Err(err) = state.flush().await {
        tracing::error!(error = %err, "failed to flush stores on shutdown");
    }
    tracing::info!("bot stopped");
    outcome
}

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tokio::time::sleep;
use uuid::Uuid;

use crate::error::{AdminError, CalendarError};
use crate::events::queue::{BotEvent, ChatKind, EventBus, Inbound};
use crate::handlers::sender::{MessageSender, deliver};
use crate::models::ChatId;
use crate::models::event::parse_event_args;
use crate::service::broadcast_service::{BroadcastReport, notify_admins, notify_subscribers};
use crate::service::confirmation::{ConfirmationGate, GateError, PendingAction};
use crate::service::format::{full_time, render_history, render_schedule};
use crate::service::routing::{Command, parse_ordinal, route_command};
use crate::state::AppState;

const WELCOME_MESSAGE: &str = "Hello! This is the schedule reminder bot.\nSend /help to see how to use it.\n\n🔔 Reminders: 3 hours, 1 day and 1 week before each event";
const FALLBACK_MESSAGE: &str = "⚠️ Please use a command.\n/list shows scheduled events\n/history shows the last 30 days\n\nSend /help for everything else.";
const PERMISSION_DENIED: &str = "❌ This command requires admin rights.";
const EXPIRED_MESSAGE: &str = "❌ Time is up, the request was cancelled.";
const NOT_A_NUMBER: &str = "❌ The event number must be a number.";
const SAVE_FAILED: &str = "❌ Could not save the change, please try again.";
const USAGE_ADD: &str = "❌ Could not add the event. Check the format.\ne.g. /add 241231 1500 new year preparations";
const USAGE_EDIT: &str = "❌ Could not edit the event. Check the format.\ne.g. /edit 3 241231 1500 new year preparations";
const USAGE_DEL: &str = "❌ Please enter a valid event number.\ne.g. /del 1";
const USAGE_MUTE: &str = "❌ Please enter the event number.\ne.g. /mute 4";
const USAGE_UNMUTE: &str = "❌ Please enter the event number.\ne.g. /unmute 4";
const USAGE_NOTICE: &str = "❌ Please enter the notice text.\ne.g. /noti Meeting today at 3 PM.";
const USAGE_ADMIN_NOTICE: &str = "❌ Please enter the notice text.\ne.g. /adminnoti Urgent admin meeting.";
const USAGE_ADMINDEL: &str = "❌ Please enter the admin number.\ne.g. /admindel 1";

const HELP_MESSAGE: &str = "📖 Schedule reminder bot

1. Scheduled events
/list - all scheduled events

2. Past events
/history - the last 30 days
/history365 - the last year

🔔 Reminders are sent 3 hours, 1 day and 1 week before each event.

=======================
⚠️ Admin only

3. Notices
/noti <text> - message every subscriber
/adminnoti <text> - message every admin

4. Add an event
/add YYMMDD HHMM <description>
e.g. /add 241225 0900 Christmas

5. Edit an event
/edit <number> YYMMDD HHMM <description>
e.g. /edit 3 241231 1800 year-end party

6. Delete an event
/del <number>

7. Delete every event
/delall (confirm with /ok)

8. Clear past events
/delhistory (confirm with /ok)

9. Mute reminders
/mute <number>, /unmute <number>

10. Subscriber count
/user

🔑 Admin setup
· private chat: /admin <password> <name>
· group chat: /adminroom <password> <room name>
· list: /adminlist, remove: /admindel <number>";

#[derive(Debug, Clone)]
pub struct HandlerOptions {
    pub timezone: Tz,
    pub admin_password: Option<String>,
    pub confirm_ttl: Duration,
    pub delivery_timeout: std::time::Duration,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Seoul,
            admin_password: None,
            confirm_ttl: Duration::seconds(30),
            delivery_timeout: std::time::Duration::from_secs(10),
        }
    }
}

/// Executes chat commands against the shared stores and replies through the sender.
///
/// Owned by the command worker, so commands never interleave with each other.
/// Store locks are released before any reply is sent.
pub struct CommandHandler {
    state: AppState,
    sender: Arc<dyn MessageSender>,
    bus: EventBus,
    gate: ConfirmationGate,
    options: HandlerOptions,
}

impl CommandHandler {
    pub fn new(
        state: AppState,
        sender: Arc<dyn MessageSender>,
        bus: EventBus,
        options: HandlerOptions,
    ) -> Self {
        Self {
            state,
            sender,
            bus,
            gate: ConfirmationGate::new(options.confirm_ttl),
            options,
        }
    }

    pub async fn handle_event(&mut self, event: BotEvent, now: DateTime<Utc>) {
        match event {
            BotEvent::Command(inbound) => self.handle_inbound(&inbound, now).await,
            BotEvent::ConfirmationExpired { chat_id, token } => {
                self.handle_expired(chat_id, token).await
            }
        }
    }

    pub async fn handle_inbound(&mut self, inbound: &Inbound, now: DateTime<Utc>) {
        let chat = inbound.chat_id;
        let Some(command) = route_command(&inbound.text) else {
            if inbound.chat_kind == ChatKind::Private {
                self.reply(chat, FALLBACK_MESSAGE).await;
            }
            return;
        };
        tracing::debug!(chat_id = chat, ?command, "command received");

        if command.requires_admin() && !self.state.admins.lock().await.is_admin(chat) {
            tracing::info!(chat_id = chat, ?command, "gated command refused");
            self.reply(chat, PERMISSION_DENIED).await;
            return;
        }

        match command {
            Command::Start => self.start(chat).await,
            Command::Help => self.reply(chat, HELP_MESSAGE).await,
            Command::List => {
                let body = render_schedule(&*self.state.calendar.lock().await, now);
                self.reply(chat, &body).await;
            }
            Command::History => self.history(chat, Duration::days(30), "last 30 days", now).await,
            Command::History365 => self.history(chat, Duration::days(365), "last year", now).await,
            Command::Add(args) => self.add(chat, &args, now).await,
            Command::Edit(args) => self.edit(chat, &args, now).await,
            Command::Delete(args) => self.delete(chat, &args).await,
            Command::DeleteAll => self.arm(chat, PendingAction::ClearEvents, now).await,
            Command::DeleteHistory => self.arm(chat, PendingAction::ClearHistory, now).await,
            Command::Confirm => self.confirm(chat, now).await,
            Command::Mute(args) => self.mute(chat, &args, true).await,
            Command::Unmute(args) => self.mute(chat, &args, false).await,
            Command::Notice(text) => self.notice(chat, &text).await,
            Command::AdminNotice(text) => self.admin_notice(chat, &text).await,
            Command::UserCount => {
                let count = self.state.subscribers.lock().await.len();
                self.reply(chat, &format!("👥 {count} chats are currently registered."))
                    .await;
            }
            Command::Admin(args) => self.register_admin(inbound, &args).await,
            Command::AdminRoom(args) => self.register_room(inbound, &args).await,
            Command::AdminList => self.admin_list(chat).await,
            Command::AdminDelete(args) => self.admin_delete(chat, &args).await,
            Command::Unknown(name) => {
                if inbound.chat_kind == ChatKind::Private {
                    let message = format!("❓ Unknown command /{name}. Send /help for the list of commands.");
                    self.reply(chat, &message).await;
                }
            }
        }
    }

    async fn reply(&self, chat_id: ChatId, content: &str) {
        if let Err(err) = deliver(
            self.sender.as_ref(),
            chat_id,
            content,
            self.options.delivery_timeout,
        )
        .await
        {
            tracing::warn!(chat_id, error = %err, "reply failed");
        }
    }

    fn describe(err: &CalendarError, usage: &str) -> String {
        match err {
            CalendarError::Parse(_) => usage.to_string(),
            CalendarError::PastTimestamp => "❌ Events in the past cannot be scheduled.".to_string(),
            CalendarError::InvalidOrdinal(_) => "❌ Please enter a valid event number.".to_string(),
            CalendarError::NotMuted => "❌ That event is not muted.".to_string(),
            CalendarError::Store(source) => {
                tracing::error!(error = %source, "calendar persist failed");
                SAVE_FAILED.to_string()
            }
        }
    }

    async fn start(&self, chat: ChatId) {
        if let Err(err) = self.state.subscribers.lock().await.register(chat) {
            tracing::error!(chat_id = chat, error = %err, "could not register subscriber");
        }
        self.reply(chat, WELCOME_MESSAGE).await;
    }

    async fn history(&self, chat: ChatId, window: Duration, label: &str, now: DateTime<Utc>) {
        let body = {
            let calendar = self.state.calendar.lock().await;
            if calendar.history_len() == 0 {
                "🔍 No past events are stored.".to_string()
            } else {
                let events = calendar.history_within(window, now);
                render_history(&events, label, &self.options.timezone, now)
            }
        };
        self.reply(chat, &body).await;
    }

    async fn add(&self, chat: ChatId, args: &[String], now: DateTime<Utc>) {
        let tz = self.options.timezone;
        let message = match parse_event_args(args) {
            Err(_) => USAGE_ADD.to_string(),
            Ok((time, description)) => {
                let mut calendar = self.state.calendar.lock().await;
                match calendar.add(time, &description, now) {
                    Ok(event) => format!(
                        "✅ Event added\nEvent: {}\nTime: {}",
                        event.description,
                        full_time(&event, &tz)
                    ),
                    Err(err) => Self::describe(&err, USAGE_ADD),
                }
            }
        };
        self.reply(chat, &message).await;
    }

    async fn edit(&self, chat: ChatId, args: &[String], now: DateTime<Utc>) {
        let tz = self.options.timezone;
        let message = if args.len() < 4 {
            USAGE_EDIT.to_string()
        } else if let Some(ordinal) = parse_ordinal(args) {
            match parse_event_args(&args[1..]) {
                Err(_) => USAGE_EDIT.to_string(),
                Ok((time, description)) => {
                    let mut calendar = self.state.calendar.lock().await;
                    match calendar.edit(ordinal, time, &description, now) {
                        Ok((_, event)) => format!(
                            "✅ Event updated\nEvent: {}\nTime: {}",
                            event.description,
                            full_time(&event, &tz)
                        ),
                        Err(err) => Self::describe(&err, USAGE_EDIT),
                    }
                }
            }
        } else {
            NOT_A_NUMBER.to_string()
        };
        self.reply(chat, &message).await;
    }

    async fn delete(&self, chat: ChatId, args: &[String]) {
        let tz = self.options.timezone;
        let message = match parse_ordinal(args) {
            None => USAGE_DEL.to_string(),
            Some(ordinal) => match self.state.calendar.lock().await.delete(ordinal) {
                Ok(event) => format!(
                    "✅ Event deleted\nEvent: {}\nTime: {}",
                    event.description,
                    full_time(&event, &tz)
                ),
                Err(err) => Self::describe(&err, USAGE_DEL),
            },
        };
        self.reply(chat, &message).await;
    }

    async fn mute(&self, chat: ChatId, args: &[String], mute: bool) {
        let usage = if mute { USAGE_MUTE } else { USAGE_UNMUTE };
        let message = match parse_ordinal(args) {
            None if args.is_empty() => usage.to_string(),
            None => NOT_A_NUMBER.to_string(),
            Some(ordinal) => {
                let mut calendar = self.state.calendar.lock().await;
                let result = if mute {
                    calendar.mute(ordinal)
                } else {
                    calendar.unmute(ordinal)
                };
                match result {
                    Ok(event) if mute => format!("✅ Reminders muted for:\n{}", event.description),
                    Ok(event) => format!("✅ Reminders unmuted for:\n{}", event.description),
                    Err(err) => Self::describe(&err, usage),
                }
            }
        };
        self.reply(chat, &message).await;
    }

    async fn arm(&mut self, chat: ChatId, action: PendingAction, now: DateTime<Utc>) {
        let seconds = self.gate.ttl().num_seconds();
        let message = match self.gate.arm(chat, action, now) {
            Err(_) => format!(
                "❌ Another confirmation is pending.\nSend /ok or try again after {seconds} seconds."
            ),
            Ok(token) => {
                self.schedule_expiry(chat, token);
                let what = match action {
                    PendingAction::ClearEvents => "Delete ALL scheduled events?",
                    PendingAction::ClearHistory => "Clear ALL past events?",
                };
                format!(
                    "⚠️ {what}\nThis cannot be undone.\nSend /ok to confirm.\n\n⏳ Cancelled automatically if there is no reply within {seconds} seconds."
                )
            }
        };
        self.reply(chat, &message).await;
    }

    fn schedule_expiry(&self, chat_id: ChatId, token: Uuid) {
        let bus = self.bus.clone();
        let ttl = self
            .gate
            .ttl()
            .to_std()
            .unwrap_or_else(|_| std::time::Duration::from_secs(30));
        tokio::spawn(async move {
            sleep(ttl).await;
            bus.emit(BotEvent::ConfirmationExpired { chat_id, token }).await;
        });
    }

    async fn confirm(&mut self, chat: ChatId, now: DateTime<Utc>) {
        let message = match self.gate.confirm(chat, now) {
            Err(GateError::Expired(action)) => {
                tracing::info!(chat_id = chat, ?action, "confirmation arrived after expiry");
                EXPIRED_MESSAGE.to_string()
            }
            Err(_) => "❌ There is nothing to confirm.".to_string(),
            Ok(PendingAction::ClearEvents) => match self.state.calendar.lock().await.clear() {
                Ok(_) => "✅ All scheduled events were deleted.".to_string(),
                Err(err) => Self::describe(&err, SAVE_FAILED),
            },
            Ok(PendingAction::ClearHistory) => {
                match self.state.calendar.lock().await.clear_history() {
                    Ok(_) => "✅ Past events were cleared.".to_string(),
                    Err(err) => Self::describe(&err, SAVE_FAILED),
                }
            }
        };
        self.reply(chat, &message).await;
    }

    async fn handle_expired(&mut self, chat: ChatId, token: Uuid) {
        if let Some(action) = self.gate.expire(chat, token) {
            tracing::info!(chat_id = chat, ?action, "confirmation expired");
            self.reply(chat, EXPIRED_MESSAGE).await;
        }
    }

    async fn notice(&self, chat: ChatId, text: &str) {
        if text.is_empty() {
            self.reply(chat, USAGE_NOTICE).await;
            return;
        }
        if self.state.subscribers.lock().await.is_empty() {
            self.reply(chat, "❌ There is nobody to notify.").await;
            return;
        }
        let result = notify_subscribers(
            &self.state.subscribers,
            self.sender.as_ref(),
            text,
            self.options.delivery_timeout,
        )
        .await;
        match result {
            Ok(report) => {
                self.report_remaps(chat, &report).await;
                let summary = if report.removed.is_empty() {
                    format!("✅ Notice sent to all {} chats.", report.delivered)
                } else {
                    format!(
                        "⚠️ Delivery failed for {} chats (blocked or gone); they were removed from the subscriber list.\n✅ Notice sent to {} chats.",
                        report.removed.len(),
                        report.delivered
                    )
                };
                self.reply(chat, &summary).await;
            }
            Err(err) => {
                tracing::error!(error = %err, "subscriber registry persist failed");
                self.reply(chat, SAVE_FAILED).await;
            }
        }
    }

    async fn admin_notice(&self, chat: ChatId, text: &str) {
        if text.is_empty() {
            self.reply(chat, USAGE_ADMIN_NOTICE).await;
            return;
        }
        let result = notify_admins(
            &self.state.admins,
            self.sender.as_ref(),
            text,
            self.options.delivery_timeout,
        )
        .await;
        match result {
            Ok(report) => {
                self.report_remaps(chat, &report).await;
                let summary = if report.failed.is_empty() {
                    format!("✅ Admin notice sent to all {} admins.", report.delivered)
                } else {
                    format!(
                        "⚠️ Delivery failed for {} admins.\n✅ Admin notice sent to {} admins.",
                        report.failed.len(),
                        report.delivered
                    )
                };
                self.reply(chat, &summary).await;
            }
            Err(err) => {
                tracing::error!(error = %err, "admin registry persist failed");
                self.reply(chat, SAVE_FAILED).await;
            }
        }
    }

    async fn report_remaps(&self, chat: ChatId, report: &BroadcastReport) {
        for (old, new) in &report.remapped {
            let message = format!("ℹ️ Chat {old} changed its id, updated to {new}.");
            self.reply(chat, &message).await;
        }
    }

    fn password_matches(&self, candidate: &str) -> Option<bool> {
        self.options
            .admin_password
            .as_deref()
            .map(|password| password == candidate)
    }

    async fn register_admin(&self, inbound: &Inbound, args: &[String]) {
        let chat = inbound.chat_id;
        let message = if inbound.chat_kind == ChatKind::Group {
            "❌ This command only works in a private chat.\nIn a group, use /adminroom <password> <room name>.".to_string()
        } else if self.state.admins.lock().await.is_admin(chat) {
            "✅ This chat is already registered as an admin.".to_string()
        } else if args.len() < 2 {
            "❌ Usage: /admin <password> <name>".to_string()
        } else {
            let name = args[1..].join(" ");
            match self.password_matches(&args[0]) {
                None => "❌ Admin registration is disabled.".to_string(),
                Some(false) => {
                    tracing::warn!(chat_id = chat, "admin registration with wrong password");
                    "❌ Wrong password.".to_string()
                }
                Some(true) => match self.state.admins.lock().await.register(&name, chat) {
                    Ok(_) => format!("✅ {name} is now an admin."),
                    Err(err) => {
                        tracing::error!(error = %err, "admin registry persist failed");
                        SAVE_FAILED.to_string()
                    }
                },
            }
        };
        self.reply(chat, &message).await;
    }

    async fn register_room(&self, inbound: &Inbound, args: &[String]) {
        let chat = inbound.chat_id;
        let message = if inbound.chat_kind == ChatKind::Private {
            "❌ This command only works in a group chat.".to_string()
        } else if args.len() < 2 {
            "❌ Usage: /adminroom <password> <room name>".to_string()
        } else {
            let room = args[1..].join(" ");
            match self.password_matches(&args[0]) {
                None => "❌ Admin registration is disabled.".to_string(),
                Some(false) => {
                    tracing::warn!(chat_id = chat, "room registration with wrong password");
                    "❌ Wrong password.".to_string()
                }
                Some(true) => {
                    let mut admins = self.state.admins.lock().await;
                    match admins.register(&format!("{room}(group)"), chat) {
                        Ok(true) => format!("✅ Admin rights granted to the '{room}' group."),
                        Ok(false) => "✅ This group already has admin rights.".to_string(),
                        Err(err) => {
                            tracing::error!(error = %err, "admin registry persist failed");
                            SAVE_FAILED.to_string()
                        }
                    }
                }
            }
        };
        self.reply(chat, &message).await;
    }

    async fn admin_list(&self, chat: ChatId) {
        let message = {
            let admins = self.state.admins.lock().await;
            if admins.list().is_empty() {
                "❌ No admins are registered.".to_string()
            } else {
                let mut body = String::from("📋 Admins:\n");
                for (idx, admin) in admins.list().iter().enumerate() {
                    body.push_str(&format!("{}. {}\n", idx + 1, admin.name));
                }
                body.trim_end().to_string()
            }
        };
        self.reply(chat, &message).await;
    }

    async fn admin_delete(&self, chat: ChatId, args: &[String]) {
        let message = match parse_ordinal(args) {
            None => USAGE_ADMINDEL.to_string(),
            Some(ordinal) => match self.state.admins.lock().await.remove(ordinal) {
                Ok(admin) => format!("✅ {} was removed from the admins.", admin.name),
                Err(AdminError::InvalidOrdinal(_)) => "❌ Please enter a valid admin number.".to_string(),
                Err(AdminError::Store(err)) => {
                    tracing::error!(error = %err, "admin registry persist failed");
                    SAVE_FAILED.to_string()
                }
            },
        };
        self.reply(chat, &message).await;
    }
}

use std::sync::Arc;

use serenity::async_trait;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::id::ChannelId;
use serenity::prelude::*;

use crate::error::DeliveryError;
use crate::events::queue::{BotEvent, ChatKind, EventBus, Inbound};
use crate::handlers::sender::MessageSender;
use crate::models::ChatId;

pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Sends to Discord channels. Chat ids are channel ids.
pub struct DiscordSender {
    http: Arc<Http>,
}

impl DiscordSender {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
        }
    }
}

#[async_trait]
impl MessageSender for DiscordSender {
    async fn send_message(&self, chat_id: ChatId, content: &str) -> Result<(), DeliveryError> {
        let channel = u64::try_from(chat_id)
            .ok()
            .filter(|id| *id > 0)
            .map(ChannelId::new)
            .ok_or_else(|| DeliveryError::Rejected(format!("invalid channel id {chat_id}")))?;
        channel
            .say(self.http.as_ref(), content)
            .await
            .map(|_| ())
            .map_err(classify_error)
    }
}

fn classify_error(err: serenity::Error) -> DeliveryError {
    match err {
        serenity::Error::Http(http) => DeliveryError::Rejected(http.to_string()),
        other => DeliveryError::Transport(format!("{other:?}")),
    }
}

/// Turns a gateway message into a command for the worker. Bot authors are ignored.
pub fn inbound_from_parts(
    channel_id: u64,
    in_guild: bool,
    author_is_bot: bool,
    content: &str,
) -> Option<Inbound> {
    if author_is_bot || content.trim().is_empty() {
        return None;
    }
    let chat_id = ChatId::try_from(channel_id).ok()?;
    Some(Inbound {
        chat_id,
        chat_kind: if in_guild {
            ChatKind::Group
        } else {
            ChatKind::Private
        },
        text: content.to_string(),
    })
}

pub struct DiscordHandler {
    bus: EventBus,
}

impl DiscordHandler {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, "discord gateway connected");
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let inbound = inbound_from_parts(
            msg.channel_id.get(),
            msg.guild_id.is_some(),
            msg.author.bot,
            &msg.content,
        );
        if let Some(inbound) = inbound {
            self.bus.emit(BotEvent::Command(inbound)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guild_messages_are_group_chats() {
        let inbound = inbound_from_parts(77, true, false, "/list").unwrap();
        assert_eq!(inbound.chat_id, 77);
        assert_eq!(inbound.chat_kind, ChatKind::Group);
        assert_eq!(inbound.text, "/list");
    }

    #[test]
    fn direct_messages_are_private_chats() {
        let inbound = inbound_from_parts(5, false, false, "/start").unwrap();
        assert_eq!(inbound.chat_kind, ChatKind::Private);
    }

    #[test]
    fn bot_and_empty_messages_are_ignored() {
        assert!(inbound_from_parts(5, false, true, "/start").is_none());
        assert!(inbound_from_parts(5, false, false, "   ").is_none());
        assert!(inbound_from_parts(u64::MAX, true, false, "/list").is_none());
    }

    #[tokio::test]
    async fn negative_ids_are_rejected_without_network() {
        let sender = DiscordSender::new("token");
        let result = sender.send_message(-100, "hello").await;
        assert!(matches!(result, Err(DeliveryError::Rejected(_))));
    }
}

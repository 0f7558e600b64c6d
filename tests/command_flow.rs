use std::env;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Asia::Seoul;
use scheduleBot::db::BlobStore;
use scheduleBot::error::DeliveryError;
use scheduleBot::events::queue::{BotEvent, ChatKind, EventBus, Inbound};
use scheduleBot::handlers::command::{CommandHandler, HandlerOptions};
use scheduleBot::handlers::sender::MessageSender;
use scheduleBot::models::ChatId;
use scheduleBot::state::AppState;
use tokio::sync::{Mutex, mpsc};

const ADMIN: ChatId = 1;

struct MockSender {
    sent: Mutex<Vec<(ChatId, String)>>,
}

impl MockSender {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    async fn last_to(&self, chat_id: ChatId) -> String {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|(id, _)| *id == chat_id)
            .map(|(_, text)| text.clone())
            .unwrap_or_default()
    }

    async fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[serenity::async_trait]
impl MessageSender for MockSender {
    async fn send_message(&self, chat_id: ChatId, content: &str) -> Result<(), DeliveryError> {
        self.sent.lock().await.push((chat_id, content.to_string()));
        Ok(())
    }
}

struct Harness {
    handler: CommandHandler,
    sender: Arc<MockSender>,
    state: AppState,
    _rx: mpsc::Receiver<BotEvent>,
}

fn harness() -> Harness {
    let dir = env::temp_dir().join(format!("schedulebot_cmd_{}", uuid::Uuid::new_v4()));
    let state = AppState::load(BlobStore::new(dir), Seoul).unwrap();
    let sender = MockSender::new();
    let (bus, rx) = EventBus::new(16);
    let options = HandlerOptions {
        admin_password: Some("pw".to_string()),
        ..HandlerOptions::default()
    };
    let handler = CommandHandler::new(state.clone(), sender.clone(), bus, options);
    Harness {
        handler,
        sender,
        state,
        _rx: rx,
    }
}

fn now() -> DateTime<Utc> {
    Seoul
        .with_ymd_and_hms(2024, 12, 1, 12, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn private(chat_id: ChatId, text: &str) -> Inbound {
    Inbound {
        chat_id,
        chat_kind: ChatKind::Private,
        text: text.to_string(),
    }
}

fn group(chat_id: ChatId, text: &str) -> Inbound {
    Inbound {
        chat_id,
        chat_kind: ChatKind::Group,
        text: text.to_string(),
    }
}

impl Harness {
    async fn as_admin(&mut self) {
        self.state.admins.lock().await.register("ops", ADMIN).unwrap();
    }

    async fn say(&mut self, chat_id: ChatId, text: &str) -> String {
        self.handler.handle_inbound(&private(chat_id, text), now()).await;
        self.sender.last_to(chat_id).await
    }
}

#[tokio::test]
async fn list_is_sorted_regardless_of_insertion_order() {
    let mut h = harness();
    h.as_admin().await;

    let reply = h.say(ADMIN, "/add 241231 1500 year-end party").await;
    assert!(reply.starts_with("✅ Event added"), "{reply}");
    h.say(ADMIN, "/add 241225 0900 Christmas").await;

    let list = h.say(ADMIN, "/list").await;
    let christmas = list.find("1. 12/25(Wed) AM 09:00 - Christmas").expect(&list);
    let party = list.find("2. 12/31(Tue) PM 03:00 - year-end party").expect(&list);
    assert!(christmas < party);
}

#[tokio::test]
async fn non_admins_cannot_change_the_calendar() {
    let mut h = harness();
    let reply = h.say(7, "/add 241231 1500 sneaky").await;
    assert_eq!(reply, "❌ This command requires admin rights.");
    assert!(h.state.calendar.lock().await.is_empty());

    // read-only commands stay open
    let list = h.say(7, "/list").await;
    assert_eq!(list, "❌ No events scheduled.");
}

#[tokio::test]
async fn past_timestamps_are_rejected_and_nothing_is_stored() {
    let mut h = harness();
    h.as_admin().await;

    let reply = h.say(ADMIN, "/add 241130 1200 yesterday").await;
    assert_eq!(reply, "❌ Events in the past cannot be scheduled.");
    let reply = h.say(ADMIN, "/add 24113 1200 typo").await;
    assert!(reply.contains("Check the format"), "{reply}");
    assert!(h.state.calendar.lock().await.is_empty());
}

#[tokio::test]
async fn edit_moves_the_mute_marker_with_the_event() {
    let mut h = harness();
    h.as_admin().await;
    h.say(ADMIN, "/add 241225 0900 Christmas").await;
    h.say(ADMIN, "/add 241231 1500 party").await;

    let reply = h.say(ADMIN, "/mute 1").await;
    assert!(reply.contains("muted"), "{reply}");

    let reply = h.say(ADMIN, "/edit 1 241226 1000 boxing day").await;
    assert!(reply.starts_with("✅ Event updated"), "{reply}");

    {
        let calendar = h.state.calendar.lock().await;
        assert!(calendar.is_muted("241226 1000_boxing day"));
        assert!(!calendar.is_muted("241225 0900_Christmas"));
        assert!(!calendar.is_muted("241231 1500_party"));
    }
    let list = h.say(ADMIN, "/list").await;
    assert!(list.contains("- *boxing day"), "{list}");
    assert!(list.contains("- party"), "{list}");
}

#[tokio::test]
async fn unmute_of_an_audible_event_is_reported() {
    let mut h = harness();
    h.as_admin().await;
    h.say(ADMIN, "/add 241225 0900 Christmas").await;

    assert_eq!(h.say(ADMIN, "/unmute 1").await, "❌ That event is not muted.");
    assert_eq!(h.say(ADMIN, "/unmute 9").await, "❌ Please enter a valid event number.");
    assert_eq!(h.say(ADMIN, "/unmute one").await, "❌ The event number must be a number.");
}

#[tokio::test]
async fn delete_uses_the_listed_ordinal() {
    let mut h = harness();
    h.as_admin().await;
    h.say(ADMIN, "/add 241231 1500 party").await;
    h.say(ADMIN, "/add 241225 0900 Christmas").await;

    let reply = h.say(ADMIN, "/del 1").await;
    assert!(reply.contains("Christmas"), "{reply}");
    let remaining = h.state.calendar.lock().await.list();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].description, "party");
}

#[tokio::test]
async fn admin_registration_requires_the_password_and_chat_kind() {
    let mut h = harness();

    assert_eq!(h.say(3, "/admin nope alice").await, "❌ Wrong password.");
    assert!(!h.state.admins.lock().await.is_admin(3));

    let reply = h.say(3, "/admin pw alice").await;
    assert_eq!(reply, "✅ alice is now an admin.");
    assert!(h.state.admins.lock().await.is_admin(3));

    h.handler
        .handle_inbound(&group(-50, "/admin pw team"), now())
        .await;
    assert!(h.sender.last_to(-50).await.contains("only works in a private chat"));

    h.handler
        .handle_inbound(&group(-50, "/adminroom pw team"), now())
        .await;
    assert_eq!(
        h.sender.last_to(-50).await,
        "✅ Admin rights granted to the 'team' group."
    );

    let list = h.say(3, "/adminlist").await;
    assert!(list.contains("1. alice"), "{list}");
    assert!(list.contains("2. team(group)"), "{list}");

    assert_eq!(h.say(3, "/admindel 2").await, "✅ team(group) was removed from the admins.");
    assert!(!h.state.admins.lock().await.is_admin(-50));
}

#[tokio::test]
async fn notice_reaches_every_subscriber() {
    let mut h = harness();
    h.as_admin().await;
    h.say(5, "/start").await;
    h.say(6, "/start").await;
    h.say(6, "/start").await;

    assert_eq!(h.say(ADMIN, "/user").await, "👥 2 chats are currently registered.");

    let summary = h.say(ADMIN, "/noti Meeting at 3 PM").await;
    assert_eq!(summary, "✅ Notice sent to all 2 chats.");
    for chat in [5, 6] {
        assert_eq!(h.sender.last_to(chat).await, "📢 Notice:\n\nMeeting at 3 PM");
    }
}

#[tokio::test]
async fn plain_text_gets_a_hint_only_in_private_chats() {
    let mut h = harness();
    let reply = h.say(9, "hello bot").await;
    assert!(reply.starts_with("⚠️ Please use a command."), "{reply}");

    h.handler.handle_inbound(&group(-9, "hello all"), now()).await;
    assert!(h.sender.sent_to(-9).await.is_empty());
}

#[tokio::test]
async fn bot_name_suffix_is_accepted_in_groups() {
    let mut h = harness();
    h.handler.handle_inbound(&group(-9, "/list@schedule_bot"), now()).await;
    assert_eq!(h.sender.last_to(-9).await, "❌ No events scheduled.");
}

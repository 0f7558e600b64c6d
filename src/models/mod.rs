pub mod admin;
pub mod calendar;
pub mod event;
pub mod subscriber;

/// Recipient / requester address. Telegram group ids are negative.
pub type ChatId = i64;

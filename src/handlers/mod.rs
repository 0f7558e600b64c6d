pub mod command;
pub mod console;
pub mod discord;
pub mod sender;
pub mod telegram;

use clap::{Parser, Subcommand};

use crate::config::RunMode;

#[derive(Debug, Parser)]
#[command(name = "scheduleBot", about = "Shared calendar bot with tiered reminders")]
pub struct Cli {
    /// KEY=VALUE file read before the process environment.
    #[arg(long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Long-poll the Telegram Bot API.
    Telegram,
    /// Connect to the Discord gateway.
    Discord,
    /// Operate the bot from a local prompt.
    Console,
}

impl Cli {
    /// Run mode chosen on the command line, if any. Overrides `RUN_MODE`.
    pub fn run_mode(&self) -> Option<RunMode> {
        self.command.as_ref().map(|command| match command {
            Commands::Telegram => RunMode::Telegram,
            Commands::Discord => RunMode::Discord,
            Commands::Console => RunMode::Console,
        })
    }
}

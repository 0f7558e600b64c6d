use crate::models::ChatId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("blob io failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("blob {key} is not valid json: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("could not parse date/time: {0}")]
    Parse(String),

    #[error("timestamp is not in the future")]
    PastTimestamp,

    #[error("no event with number {0}")]
    InvalidOrdinal(usize),

    #[error("event is not muted")]
    NotMuted,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("no admin with number {0}")]
    InvalidOrdinal(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a failed send, as reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The chat moved to a new identifier (e.g. a Telegram group upgraded to a supergroup).
    #[error("chat migrated to {new_chat_id}")]
    Migrated { new_chat_id: ChatId },

    /// The platform refused the message (blocked, kicked, chat not found, ...).
    #[error("delivery rejected: {0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("delivery timed out")]
    Timeout,
}

impl DeliveryError {
    /// Whether a broadcast should drop the recipient after this failure.
    pub fn drops_recipient(&self) -> bool {
        !matches!(self, DeliveryError::Migrated { .. } | DeliveryError::Timeout)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config line {line}: {content}")]
    Syntax { line: usize, content: String },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("{0} must be set for this run mode")]
    Missing(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("discord client failed: {0}")]
    Discord(#[from] serenity::Error),
}

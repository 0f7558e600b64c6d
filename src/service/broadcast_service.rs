use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::{DeliveryError, StoreError};
use crate::handlers::sender::{MessageSender, deliver};
use crate::models::ChatId;
use crate::models::admin::AdminRegistry;
use crate::models::subscriber::SubscriberRegistry;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub removed: Vec<ChatId>,
    pub remapped: Vec<(ChatId, ChatId)>,
    pub failed: Vec<(ChatId, DeliveryError)>,
}

/// Sends `content` to each recipient in turn and collects the failures.
pub async fn fan_out<S: MessageSender + ?Sized>(
    sender: &S,
    recipients: &[ChatId],
    content: &str,
    limit: Duration,
) -> (usize, Vec<(ChatId, DeliveryError)>) {
    let mut delivered = 0;
    let mut failures = Vec::new();
    for &chat_id in recipients {
        match deliver(sender, chat_id, content, limit).await {
            Ok(()) => delivered += 1,
            Err(err) => {
                tracing::warn!(chat_id, error = %err, "delivery failed");
                failures.push((chat_id, err));
            }
        }
    }
    (delivered, failures)
}

/// Notice to every subscriber. Migrated chats are remapped, unreachable ones removed.
///
/// The registry lock is only held to snapshot recipients and to apply the outcome.
pub async fn notify_subscribers<S: MessageSender + ?Sized>(
    subscribers: &Mutex<SubscriberRegistry>,
    sender: &S,
    text: &str,
    limit: Duration,
) -> Result<BroadcastReport, StoreError> {
    let recipients = subscribers.lock().await.all();
    let content = format!("📢 Notice:\n\n{text}");
    let (delivered, failures) = fan_out(sender, &recipients, &content, limit).await;

    let mut report = BroadcastReport {
        delivered,
        ..Default::default()
    };
    let mut registry = subscribers.lock().await;
    for (chat_id, err) in failures {
        match err {
            DeliveryError::Migrated { new_chat_id } => {
                registry.remap(chat_id, new_chat_id)?;
                report.remapped.push((chat_id, new_chat_id));
            }
            err if err.drops_recipient() => {
                registry.unregister(chat_id)?;
                report.removed.push(chat_id);
                report.failed.push((chat_id, err));
            }
            err => report.failed.push((chat_id, err)),
        }
    }
    tracing::info!(
        delivered = report.delivered,
        removed = report.removed.len(),
        remapped = report.remapped.len(),
        "notice broadcast finished"
    );
    Ok(report)
}

/// Notice to every admin. Admins are remapped on migration but never removed.
pub async fn notify_admins<S: MessageSender + ?Sized>(
    admins: &Mutex<AdminRegistry>,
    sender: &S,
    text: &str,
    limit: Duration,
) -> Result<BroadcastReport, StoreError> {
    let recipients = admins.lock().await.ids();
    let content = format!("📢 Admin notice:\n\n{text}");
    let (delivered, failures) = fan_out(sender, &recipients, &content, limit).await;

    let mut report = BroadcastReport {
        delivered,
        ..Default::default()
    };
    let mut registry = admins.lock().await;
    for (chat_id, err) in failures {
        match err {
            DeliveryError::Migrated { new_chat_id } => {
                registry.remap(chat_id, new_chat_id)?;
                report.remapped.push((chat_id, new_chat_id));
            }
            err => report.failed.push((chat_id, err)),
        }
    }
    tracing::info!(
        delivered = report.delivered,
        failed = report.failed.len(),
        remapped = report.remapped.len(),
        "admin notice finished"
    );
    Ok(report)
}

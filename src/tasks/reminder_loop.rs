use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::handlers::sender::MessageSender;
use crate::models::calendar::Calendar;
use crate::models::subscriber::SubscriberRegistry;
use crate::service::broadcast_service::fan_out;
use crate::service::reminder_service::ReminderEngine;
use crate::state::AppState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderReport {
    pub fired: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub async fn run_reminder_loop(
    state: AppState,
    sender: Arc<dyn MessageSender>,
    interval: Duration,
    delivery_timeout: Duration,
) {
    let mut engine = ReminderEngine::new();
    loop {
        let report = reminder_tick(
            &state.calendar,
            &state.subscribers,
            &mut engine,
            sender.as_ref(),
            Utc::now(),
            delivery_timeout,
        )
        .await;
        if report.fired > 0 {
            tracing::info!(
                fired = report.fired,
                delivered = report.delivered,
                failed = report.failed,
                "reminder sweep finished"
            );
        }
        sleep(interval).await;
    }
}

/// One reminder sweep. Due tiers are marked fired under the calendar lock, then
/// delivered to every subscriber with no lock held. Failed deliveries are only logged.
pub async fn reminder_tick<S: MessageSender + ?Sized>(
    calendar: &Mutex<Calendar>,
    subscribers: &Mutex<SubscriberRegistry>,
    engine: &mut ReminderEngine,
    sender: &S,
    now: DateTime<Utc>,
    delivery_timeout: Duration,
) -> ReminderReport {
    let recipients = subscribers.lock().await.all();
    if recipients.is_empty() {
        tracing::debug!("no subscribers, reminder sweep skipped");
        return ReminderReport::default();
    }

    let (due, tz) = {
        let calendar = calendar.lock().await;
        (engine.collect_due(&calendar.audible(), now), calendar.timezone())
    };

    let mut report = ReminderReport {
        fired: due.len(),
        ..Default::default()
    };
    for reminder in &due {
        let (delivered, failures) =
            fan_out(sender, &recipients, &reminder.render(&tz), delivery_timeout).await;
        tracing::info!(
            event = %reminder.event.identity(),
            tier = reminder.tier.label(),
            delivered,
            failed = failures.len(),
            "reminder sent"
        );
        report.delivered += delivered;
        report.failed += failures.len();
    }
    report
}

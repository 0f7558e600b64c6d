use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

use crate::models::calendar::Calendar;
use crate::models::event::Event;

const FULL_FORMAT: &str = "%y/%m/%d(%a) %p %I:%M";
const SHORT_FORMAT: &str = "%m/%d(%a) %p %I:%M";

/// `YY/MM/DD(Ddd) AM hh:mm`.
pub fn full_time(event: &Event, tz: &Tz) -> String {
    event.localized(tz).format(FULL_FORMAT).to_string()
}

/// Drops the year when the event falls in the current year.
pub fn list_time(event: &Event, tz: &Tz, now: DateTime<Utc>) -> String {
    let local = event.localized(tz);
    if local.year() == now.with_timezone(tz).year() {
        local.format(SHORT_FORMAT).to_string()
    } else {
        local.format(FULL_FORMAT).to_string()
    }
}

pub fn render_schedule(calendar: &Calendar, now: DateTime<Utc>) -> String {
    let events = calendar.list();
    if events.is_empty() {
        return "❌ No events scheduled.".to_string();
    }
    let tz = calendar.timezone();
    let mut body = String::from("📅 Scheduled events:\n");
    for (idx, event) in events.iter().enumerate() {
        let marker = if calendar.is_muted(&event.identity()) { "*" } else { "" };
        body.push_str(&format!(
            "{}. {} - {}{}\n",
            idx + 1,
            list_time(event, &tz, now),
            marker,
            event.description
        ));
    }
    body.push_str("\n* : reminders are muted for this event");
    body
}

pub fn render_history(events: &[Event], label: &str, tz: &Tz, now: DateTime<Utc>) -> String {
    if events.is_empty() {
        return format!("🔍 No events in the {label}.");
    }
    let mut body = format!("📅 Events in the {label}:\n");
    for (idx, event) in events.iter().enumerate() {
        body.push_str(&format!(
            "{}. {} - {}\n",
            idx + 1,
            list_time(event, tz, now),
            event.description
        ));
    }
    body.trim_end().to_string()
}

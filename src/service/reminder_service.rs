use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::models::event::Event;
use crate::service::format::full_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    ThreeHours,
    OneDay,
    OneWeek,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::ThreeHours, Tier::OneDay, Tier::OneWeek];

    /// `(lower, upper]` bounds on the time left before the event.
    pub fn window(self) -> (Duration, Duration) {
        match self {
            Tier::ThreeHours => (Duration::minutes(179), Duration::minutes(180)),
            Tier::OneDay => (Duration::hours(23), Duration::hours(24)),
            Tier::OneWeek => (Duration::days(6), Duration::days(7)),
        }
    }

    pub fn contains(self, remaining: Duration) -> bool {
        let (lower, upper) = self.window();
        lower < remaining && remaining <= upper
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::ThreeHours => "3 hours before",
            Tier::OneDay => "1 day before",
            Tier::OneWeek => "1 week before",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Tier::ThreeHours => "hour",
            Tier::OneDay => "day",
            Tier::OneWeek => "week",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    pub event: Event,
    pub tier: Tier,
}

impl DueReminder {
    pub fn render(&self, tz: &Tz) -> String {
        format!(
            "🔔 [{}]\nEvent: {}\nTime: {}",
            self.tier.label(),
            self.event.description,
            full_time(&self.event, tz)
        )
    }
}

/// Tracks which (event, tier) pairs already fired in this process.
///
/// Markers are append-only and never persisted; a restart re-arms every tier.
#[derive(Debug, Default)]
pub struct ReminderEngine {
    fired: HashSet<String>,
}

impl ReminderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn marker(event: &Event, tier: Tier) -> String {
        format!("{}_{}", event.identity(), tier.key())
    }

    pub fn has_fired(&self, event: &Event, tier: Tier) -> bool {
        self.fired.contains(&Self::marker(event, tier))
    }

    /// Returns the reminders due at `now` and marks them fired. Callers pass only
    /// unmuted events, paired with their absolute instants.
    pub fn collect_due(
        &mut self,
        events: &[(Event, DateTime<Utc>)],
        now: DateTime<Utc>,
    ) -> Vec<DueReminder> {
        let mut due = Vec::new();
        for (event, at) in events {
            let remaining = *at - now;
            for tier in Tier::ALL {
                if !tier.contains(remaining) {
                    continue;
                }
                if self.fired.insert(Self::marker(event, tier)) {
                    tracing::debug!(event = %event.identity(), tier = tier.label(), "tier fired");
                    due.push(DueReminder {
                        event: event.clone(),
                        tier,
                    });
                }
            }
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::Asia::Seoul;

    fn new_year() -> (Event, DateTime<Utc>) {
        let time = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let event = Event::new(time, "new year");
        let at = Seoul.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap().with_timezone(&Utc);
        (event, at)
    }

    #[test]
    fn windows_are_disjoint_and_upper_inclusive() {
        assert!(Tier::ThreeHours.contains(Duration::minutes(180)));
        assert!(!Tier::ThreeHours.contains(Duration::minutes(181)));
        assert!(!Tier::ThreeHours.contains(Duration::minutes(179)));
        assert!(!Tier::ThreeHours.contains(Duration::minutes(120)));
        assert!(Tier::OneDay.contains(Duration::hours(24)));
        assert!(!Tier::OneDay.contains(Duration::hours(23)));
        assert!(Tier::OneWeek.contains(Duration::days(7)));
        assert!(!Tier::OneWeek.contains(Duration::days(6)));
        for minutes in [180, 23 * 60 + 1, 24 * 60, 6 * 24 * 60 + 1, 7 * 24 * 60] {
            let hits = Tier::ALL
                .iter()
                .filter(|tier| tier.contains(Duration::minutes(minutes)))
                .count();
            assert_eq!(hits, 1, "{minutes} minutes");
        }
    }

    #[test]
    fn tier_fires_once_per_process() {
        let (event, at) = new_year();
        let mut engine = ReminderEngine::new();
        let now = at - Duration::minutes(180);

        let due = engine.collect_due(&[(event.clone(), at)], now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].tier, Tier::ThreeHours);

        let again = engine.collect_due(&[(event.clone(), at)], now + Duration::seconds(60));
        assert!(again.is_empty());
        assert!(engine.has_fired(&event, Tier::ThreeHours));
        assert!(!engine.has_fired(&event, Tier::OneDay));
    }

    #[test]
    fn skipped_window_never_fires() {
        let (event, at) = new_year();
        let mut engine = ReminderEngine::new();
        let due = engine.collect_due(&[(event.clone(), at)], at - Duration::hours(22));
        assert!(due.is_empty());
        let due = engine.collect_due(&[(event.clone(), at)], at - Duration::days(3));
        assert!(due.is_empty());
        let due = engine.collect_due(&[(event, at)], at - Duration::hours(2));
        assert!(due.is_empty());
    }

    #[test]
    fn edited_identity_re_arms() {
        let (event, at) = new_year();
        let mut engine = ReminderEngine::new();
        let now = at - Duration::hours(24);
        assert_eq!(engine.collect_due(&[(event.clone(), at)], now).len(), 1);

        let renamed = Event::new(event.time, "new year party");
        assert_eq!(engine.collect_due(&[(renamed, at)], now).len(), 1);
    }

    #[test]
    fn render_mentions_tier_and_description() {
        let (event, _) = new_year();
        let text = DueReminder {
            event,
            tier: Tier::OneWeek,
        }
        .render(&Seoul);
        assert!(text.contains("[1 week before]"));
        assert!(text.contains("new year"));
        assert!(text.contains("25/01/01(Wed) AM 09:00"));
    }
}

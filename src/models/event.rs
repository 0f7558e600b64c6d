use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// On-disk and command-line format of an event time: `YYMMDD HHMM`.
pub const TIME_FORMAT: &str = "%y%m%d %H%M";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Event {
    #[serde(with = "event_time")]
    pub time: NaiveDateTime,
    pub description: String,
}

impl Event {
    pub fn new(time: NaiveDateTime, description: impl Into<String>) -> Self {
        Self {
            time,
            description: description.into(),
        }
    }

    /// Structural identity: `YYMMDD HHMM_description`. Changes whenever either field does.
    pub fn identity(&self) -> String {
        format!("{}_{}", self.time.format(TIME_FORMAT), self.description)
    }

    pub fn localized(&self, tz: &Tz) -> DateTime<Tz> {
        localize(tz, self.time)
    }
}

/// Resolves a wall-clock time in `tz`. Ambiguous times take the earlier instant,
/// nonexistent ones (DST gaps) are read as UTC.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

pub fn parse_event_time(date: &str, time: &str) -> Result<NaiveDateTime, CalendarError> {
    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(date, 6) || !digits(time, 4) {
        return Err(CalendarError::Parse(format!("{date} {time}")));
    }
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), TIME_FORMAT)
        .map_err(|e| CalendarError::Parse(e.to_string()))
}

/// Splits `YYMMDD HHMM description...` into a time and a non-empty description.
pub fn parse_event_args(args: &[String]) -> Result<(NaiveDateTime, String), CalendarError> {
    let [date, time, rest @ ..] = args else {
        return Err(CalendarError::Parse("missing date or time".to_string()));
    };
    let description = rest.join(" ").trim().to_string();
    if description.is_empty() {
        return Err(CalendarError::Parse("missing description".to_string()));
    }
    Ok((parse_event_time(date, time)?, description))
}

mod event_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIME_FORMAT;

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

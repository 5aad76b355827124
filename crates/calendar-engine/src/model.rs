//! Data types shared by the feed parser, the materializer and the aggregator.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

// ── FeedOccurrence ──────────────────────────────────────────────────────────

/// One event read from an external provider's calendar feed.
///
/// Instances are recomputed on every feed refresh and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedOccurrence {
    /// The `UID` of the event, or `event-<n>` when the feed omits it.
    pub id: String,
    /// Unescaped `SUMMARY` text.
    pub title: String,
    /// Unescaped `DESCRIPTION` text, if any.
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    /// Equal to `start` when the feed has no `DTEND`.
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

// ── ClassAnchor ─────────────────────────────────────────────────────────────

/// A weekly class, stored as a single reference occurrence.
///
/// The weekday and clock time of `scheduled_at` are read in
/// [`REFERENCE_ZONE`](crate::recurrence::REFERENCE_ZONE); an anchor without
/// `scheduled_at` produces no occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAnchor {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: u32,
}

// ── CalendarEvent ───────────────────────────────────────────────────────────

/// The kind of a [`CalendarEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Class,
    Habit,
    Reminder,
    Goal,
}

impl EventType {
    /// Display colour used for events of this type.
    pub fn color(self) -> &'static str {
        match self {
            EventType::Class => "#8b5cf6",
            EventType::Habit => "#10b981",
            EventType::Reminder => "#f59e0b",
            EventType::Goal => "#3b82f6",
        }
    }
}

/// An event in the unified calendar view.
///
/// `date` and `time` carry no zone: they mean "this date / clock time in the
/// viewer's target zone". Materialized classes have `is_repeating = true` and
/// an id derived from the anchor id and the occurrence date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default, with = "clock_time")]
    pub time: Option<NaiveTime>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_repeating: bool,
    #[serde(default)]
    pub original_date: Option<DateTime<Utc>>,
}

/// `Option<NaiveTime>` as `"HH:MM"`.
mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            NaiveTime::parse_from_str(&s, FORMAT)
                .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_time_as_hh_mm() {
        let event = CalendarEvent {
            id: "class-a-2026-10-19".to_string(),
            title: "Morning Flow".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            time: NaiveTime::from_hms_opt(6, 0, 0),
            event_type: EventType::Class,
            color: EventType::Class.color().to_string(),
            description: None,
            is_repeating: true,
            original_date: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["time"], "06:00");
        assert_eq!(json["date"], "2026-10-19");
        assert_eq!(json["type"], "class");
    }

    #[test]
    fn test_event_deserializes_ad_hoc_without_optional_fields() {
        let json = r##"{
            "id": "r1",
            "title": "Drink water",
            "date": "2026-10-20",
            "type": "reminder",
            "color": "#f59e0b"
        }"##;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, EventType::Reminder);
        assert!(event.time.is_none());
        assert!(!event.is_repeating);
    }

    #[test]
    fn test_event_deserializes_time_with_seconds() {
        let json = r#"{"id":"h1","title":"Stretch","date":"2026-10-20","time":"07:30:00","type":"habit","color":"x"}"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.time, NaiveTime::from_hms_opt(7, 30, 0));
    }

    #[test]
    fn test_anchor_without_schedule_deserializes() {
        let anchor: ClassAnchor = serde_json::from_str(r#"{"id":"c1","title":"Yoga"}"#).unwrap();
        assert!(anchor.scheduled_at.is_none());
        assert_eq!(anchor.duration_minutes, 0);
    }
}

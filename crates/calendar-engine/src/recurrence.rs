//! Weekly class materialization.
//!
//! A [`ClassAnchor`] stores one instant. Its weekday and clock time are read
//! in [`REFERENCE_ZONE`]; the clock time is then shifted by the whole-hour
//! offset to the viewer's target zone while the date is left alone, so an
//! occurrence never moves to a neighbouring weekday. Occurrences are emitted
//! every 7 calendar days from the first one on or after "now" until
//! [`HORIZON_MONTHS`] months have passed.
//!
//! All functions take "now" as an argument and never read the system clock.

use std::collections::HashSet;

use chrono::{
    DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc, Weekday,
};
use chrono_tz::Tz;

use crate::error::CalendarError;
use crate::model::{CalendarEvent, ClassAnchor, EventType};
use crate::zone::{self, parse_timezone};

/// The zone in which anchor instants define weekday and clock time.
pub const REFERENCE_ZONE: &str = "America/New_York";

/// Length of the forward window, counted from today in [`REFERENCE_ZONE`].
pub const HORIZON_MONTHS: u32 = 6;

const DAYS_PER_WEEK: u64 = 7;

/// Expand one anchor into weekly class events for `target_zone`.
///
/// An anchor without `scheduled_at` yields an empty list.
///
/// # Errors
///
/// Returns [`CalendarError::InvalidTimezone`] if `target_zone` is not a valid
/// IANA timezone.
///
/// # Examples
///
/// ```
/// use calendar_engine::model::ClassAnchor;
/// use calendar_engine::recurrence::materialize;
/// use chrono::{Datelike, TimeZone, Utc, Weekday};
///
/// let anchor = ClassAnchor {
///     id: "flow".to_string(),
///     title: "Morning Flow".to_string(),
///     description: None,
///     // Monday 2026-01-05 09:00 EST
///     scheduled_at: Some(Utc.with_ymd_and_hms(2026, 1, 5, 14, 0, 0).unwrap()),
///     duration_minutes: 60,
/// };
/// let now = Utc.with_ymd_and_hms(2026, 10, 16, 16, 0, 0).unwrap();
/// let events = materialize(&anchor, "America/Los_Angeles", now).unwrap();
///
/// assert_eq!(events[0].id, "class-flow-2026-10-19");
/// assert!(events.iter().all(|e| e.date.weekday() == Weekday::Mon));
/// assert!(events.iter().all(|e| e.time.unwrap().to_string() == "06:00:00"));
/// ```
pub fn materialize(
    anchor: &ClassAnchor,
    target_zone: &str,
    now: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>, CalendarError> {
    let reference = parse_timezone(REFERENCE_ZONE)?;
    let offset = zone::offset_hours(REFERENCE_ZONE, target_zone)?;
    expand_weekly(anchor, &reference, offset, now)
}

/// Expand every anchor and merge the results by date.
///
/// Events on the same date keep the order of their anchors in `anchors`.
///
/// # Errors
///
/// Returns [`CalendarError::InvalidTimezone`] for an invalid `target_zone`, or
/// [`CalendarError::InvalidAnchor`] if two scheduled anchors share an id
/// (their events would share ids too). Unscheduled anchors are skipped
/// before the check.
pub fn materialize_all(
    anchors: &[ClassAnchor],
    target_zone: &str,
    now: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>, CalendarError> {
    let reference = parse_timezone(REFERENCE_ZONE)?;
    let offset = zone::offset_hours(REFERENCE_ZONE, target_zone)?;

    let mut seen = HashSet::new();
    if let Some(dup) = anchors
        .iter()
        .filter(|a| a.scheduled_at.is_some())
        .find(|a| !seen.insert(a.id.as_str()))
    {
        return Err(CalendarError::InvalidAnchor(format!(
            "duplicate anchor id '{}'",
            dup.id
        )));
    }

    let mut events = Vec::new();
    for anchor in anchors {
        events.extend(expand_weekly(anchor, &reference, offset, now)?);
    }
    // Stable: ties keep anchor order.
    events.sort_by_key(|e| e.date);

    tracing::debug!(
        anchors = anchors.len(),
        events = events.len(),
        target_zone,
        "Materialized class schedule"
    );
    Ok(events)
}

/// Shift a clock time by whole hours, wrapping within the day.
///
/// The day carry is discarded: `01:00` shifted by `-3` is `22:00` on the
/// same calendar date.
pub fn shift_clock_time(time: NaiveTime, offset_hours: i32) -> NaiveTime {
    let (shifted, _days) =
        time.overflowing_add_signed(TimeDelta::hours(i64::from(offset_hours)));
    shifted
}

/// First date on or after `today` that falls on `weekday`, skipping today if
/// `now_time` has already reached `class_time`.
///
/// Returns `None` if that date is past the end of the calendar.
pub fn first_occurrence_date(
    today: NaiveDate,
    now_time: NaiveTime,
    weekday: Weekday,
    class_time: NaiveTime,
) -> Option<NaiveDate> {
    let days_ahead = (i64::from(weekday.num_days_from_monday())
        - i64::from(today.weekday().num_days_from_monday()))
    .rem_euclid(7) as u64;
    let days_ahead = if days_ahead == 0 && now_time >= class_time {
        DAYS_PER_WEEK
    } else {
        days_ahead
    };
    today.checked_add_days(Days::new(days_ahead))
}

/// Weekly dates from `first` through `last` inclusive.
fn weekly_dates(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(first), |d| d.checked_add_days(Days::new(DAYS_PER_WEEK)))
        .take_while(move |d| *d <= last)
}

fn expand_weekly(
    anchor: &ClassAnchor,
    reference: &Tz,
    offset_hours: i32,
    now: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>, CalendarError> {
    let Some(scheduled_at) = anchor.scheduled_at else {
        tracing::debug!(anchor = %anchor.id, "Skipping anchor without a scheduled time");
        return Ok(Vec::new());
    };

    let anchor_local = scheduled_at.with_timezone(reference);
    let weekday = anchor_local.weekday();
    let class_time = minute_precision(anchor_local.time()).ok_or_else(|| {
        CalendarError::InvalidAnchor(format!("'{}': unrepresentable clock time", anchor.id))
    })?;
    let display_time = shift_clock_time(class_time, offset_hours);

    let now_local = now.with_timezone(reference);
    let today = now_local.date_naive();
    let first = first_occurrence_date(today, now_local.time(), weekday, class_time)
        .ok_or_else(|| CalendarError::InvalidDate(format!("no {weekday} after {today}")))?;
    let last = today
        .checked_add_months(Months::new(HORIZON_MONTHS))
        .ok_or_else(|| CalendarError::InvalidDate(format!("no horizon after {today}")))?;

    let events: Vec<CalendarEvent> = weekly_dates(first, last)
        .map(|date| CalendarEvent {
            id: format!("class-{}-{}", anchor.id, date.format("%Y-%m-%d")),
            title: anchor.title.clone(),
            date,
            time: Some(display_time),
            event_type: EventType::Class,
            color: EventType::Class.color().to_string(),
            description: anchor.description.clone(),
            is_repeating: true,
            original_date: Some(scheduled_at),
        })
        .collect();

    tracing::trace!(
        anchor = %anchor.id,
        %weekday,
        %display_time,
        count = events.len(),
        "Expanded weekly anchor"
    );
    Ok(events)
}

fn minute_precision(time: NaiveTime) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0)
}

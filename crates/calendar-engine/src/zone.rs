//! Whole-hour offsets between named timezones.
//!
//! The offset is derived from wall-clock readings of one fixed UTC instant
//! ([`OFFSET_REFERENCE_INSTANT`]), not from the current instant, so the result
//! does not change when either zone enters or leaves daylight saving time.
//! Zones whose offset is not a whole number of hours are rounded to the
//! nearest hour (half-hours round up).

use chrono::{DateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::CalendarError;

/// The instant whose wall-clock readings define every zone offset
/// (2024-01-01T12:00:00Z).
pub const OFFSET_REFERENCE_INSTANT: i64 = 1_704_110_400;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz, CalendarError> {
    s.parse::<Tz>()
        .map_err(|_| CalendarError::InvalidTimezone(format!("'{}'", s)))
}

/// Hours to add to a clock time in `from` to get the same moment's clock time
/// in `to`, read at [`OFFSET_REFERENCE_INSTANT`].
///
/// # Errors
///
/// Returns [`CalendarError::InvalidTimezone`] if either name is not a valid
/// IANA timezone. There is no fallback offset.
///
/// # Examples
///
/// ```
/// use calendar_engine::zone::offset_hours;
///
/// assert_eq!(offset_hours("America/New_York", "America/Los_Angeles").unwrap(), -3);
/// assert_eq!(offset_hours("America/New_York", "Europe/London").unwrap(), 5);
/// ```
pub fn offset_hours(from: &str, to: &str) -> Result<i32, CalendarError> {
    let reference = Utc
        .timestamp_opt(OFFSET_REFERENCE_INSTANT, 0)
        .single()
        .ok_or_else(|| {
            CalendarError::InvalidDatetime("offset reference instant out of range".to_string())
        })?;
    offset_hours_at(from, to, reference)
}

/// Like [`offset_hours`], reading both clocks at `reference` instead.
pub fn offset_hours_at(
    from: &str,
    to: &str,
    reference: DateTime<Utc>,
) -> Result<i32, CalendarError> {
    let from_tz = parse_timezone(from)?;
    let to_tz = parse_timezone(to)?;
    Ok(offset_between(&from_tz, &to_tz, reference))
}

/// Offset between two resolved zones at `reference`.
pub(crate) fn offset_between(from: &Tz, to: &Tz, reference: DateTime<Utc>) -> i32 {
    let from_minutes = minute_of_day(&reference.with_timezone(from));
    let to_minutes = minute_of_day(&reference.with_timezone(to));

    // The two readings may sit on different calendar dates.
    let mut diff = to_minutes - from_minutes;
    if diff > MINUTES_PER_DAY / 2 {
        diff -= MINUTES_PER_DAY;
    } else if diff < -MINUTES_PER_DAY / 2 {
        diff += MINUTES_PER_DAY;
    }

    round_to_hours(diff)
}

fn minute_of_day<T: TimeZone>(dt: &DateTime<T>) -> i32 {
    (dt.hour() * 60 + dt.minute()) as i32
}

/// Nearest whole hour, halves rounded towards positive infinity.
fn round_to_hours(minutes: i32) -> i32 {
    (minutes + 30).div_euclid(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_eastern_to_pacific() {
        assert_eq!(
            offset_hours("America/New_York", "America/Los_Angeles").unwrap(),
            -3
        );
    }

    #[test]
    fn test_offset_pacific_to_eastern() {
        assert_eq!(
            offset_hours("America/Los_Angeles", "America/New_York").unwrap(),
            3
        );
    }

    #[test]
    fn test_offset_same_zone_is_zero() {
        assert_eq!(offset_hours("Asia/Tokyo", "Asia/Tokyo").unwrap(), 0);
    }

    #[test]
    fn test_offset_across_date_boundary_wraps() {
        // 12:00Z reads 07:00 in New York and 21:00 in Tokyo: +14h wraps to -10h.
        assert_eq!(offset_hours("America/New_York", "Asia/Tokyo").unwrap(), -10);
        // 12:00Z reads 02:00 (next day) in Kiritimati, 02:00 in Honolulu the
        // same day: the naive clock difference is 0.
        assert_eq!(
            offset_hours("Pacific/Honolulu", "Pacific/Kiritimati").unwrap(),
            0
        );
    }

    #[test]
    fn test_offset_wraps_to_nearest_twelve() {
        // Auckland is UTC+13 in January: 01:00 next day vs 12:00.
        assert_eq!(offset_hours("UTC", "Pacific/Auckland").unwrap(), -11);
        assert_eq!(offset_hours("Pacific/Auckland", "UTC").unwrap(), 11);
    }

    #[test]
    fn test_offset_ignores_current_dst() {
        // January readings: New York is on EST, London on GMT.
        let summer = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let winter = offset_hours("America/New_York", "Europe/London").unwrap();
        let at_summer = offset_hours_at("America/New_York", "Europe/London", summer).unwrap();
        assert_eq!(winter, 5);
        assert_eq!(at_summer, 5);
        // Phoenix has no DST, so the reading date matters there.
        assert_eq!(offset_hours("America/New_York", "America/Phoenix").unwrap(), -2);
        assert_eq!(
            offset_hours_at("America/New_York", "America/Phoenix", summer).unwrap(),
            -3
        );
    }

    #[test]
    fn test_offset_half_hour_zone_rounds() {
        // Kolkata is UTC+05:30.
        assert_eq!(offset_hours("UTC", "Asia/Kolkata").unwrap(), 6);
        assert_eq!(offset_hours("Asia/Kolkata", "UTC").unwrap(), -5);
    }

    #[test]
    fn test_offset_invalid_timezone_returns_error() {
        let result = offset_hours("America/New_York", "Mars/Olympus_Mons");
        let err = result.unwrap_err();
        assert_eq!(
            err,
            CalendarError::InvalidTimezone("'Mars/Olympus_Mons'".to_string())
        );
        assert!(err.to_string().contains("Invalid timezone"));
    }

    #[test]
    fn test_offset_invalid_source_timezone_returns_error() {
        assert!(offset_hours("Eastern", "UTC").is_err());
    }

    #[test]
    fn test_round_to_hours() {
        assert_eq!(round_to_hours(0), 0);
        assert_eq!(round_to_hours(-180), -3);
        assert_eq!(round_to_hours(330), 6);
        assert_eq!(round_to_hours(-330), -5);
        assert_eq!(round_to_hours(345), 6);
        assert_eq!(round_to_hours(-345), -6);
    }
}

//! Parser for the simplified iCalendar feed published by external providers.
//!
//! The parser is a two-state line scanner: outside an event it waits for
//! `BEGIN:VEVENT`; inside it collects `DTSTART`, `DTEND`, `SUMMARY`,
//! `DESCRIPTION` and `UID` until `END:VEVENT`, then emits a
//! [`FeedOccurrence`] if the block had both a start and a title. Every other
//! line is ignored.
//!
//! # Limitations
//!
//! - Folded lines (a value continued on a line starting with a space or tab)
//!   are skipped, not unfolded, so a wrapped value is cut at the fold.
//! - `TZID` parameters are not resolved. A date-time ending in `Z` is UTC and
//!   any other date-time is read in [`FeedOptions::local_zone`].
//! - Only top-level field prefixes are matched, so fields of nested
//!   components (e.g. a `VALARM`'s `DESCRIPTION`) overwrite the event's.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::CalendarError;
use crate::model::FeedOccurrence;

const BEGIN_EVENT: &str = "BEGIN:VEVENT";
const END_EVENT: &str = "END:VEVENT";

/// Options for [`parse_feed_with_options`].
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Zone used for date-times without a trailing `Z`.
    pub local_zone: Tz,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            local_zone: chrono_tz::UTC,
        }
    }
}

/// The occurrences of one parse, plus how many event blocks were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedParse {
    pub occurrences: Vec<FeedOccurrence>,
    /// Blocks without a start or title, with an unparseable date field, or
    /// left unterminated at end of input.
    pub dropped: usize,
}

// ── parse_feed ──────────────────────────────────────────────────────────────

/// Parse feed text using [`FeedOptions::default`] (floating times as UTC).
///
/// # Examples
///
/// ```
/// use calendar_engine::feed::parse_feed;
///
/// let text = "BEGIN:VEVENT\r\nDTSTART:20250704T150000Z\r\nSUMMARY:Picnic\r\nEND:VEVENT\r\n";
/// let events = parse_feed(text);
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].title, "Picnic");
/// assert!(!events[0].all_day);
/// ```
pub fn parse_feed(text: &str) -> Vec<FeedOccurrence> {
    parse_feed_with_options(text, &FeedOptions::default())
}

/// Parse feed text into occurrences, in feed order.
///
/// Malformed event blocks are dropped; this function never fails.
pub fn parse_feed_with_options(text: &str, options: &FeedOptions) -> Vec<FeedOccurrence> {
    parse_feed_report(text, options).occurrences
}

/// Parse feed text and report how many event blocks were dropped.
#[tracing::instrument(skip(text, options), fields(input_len = text.len()))]
pub fn parse_feed_report(text: &str, options: &FeedOptions) -> FeedParse {
    let mut report = FeedParse::default();
    // `None` while scanning outside an event block.
    let mut current: Option<PendingEvent> = None;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if line.starts_with(' ') || line.starts_with('\t') {
            tracing::trace!(line, "Skipping folded continuation line");
            continue;
        }
        let line = line.trim_end();

        if line == BEGIN_EVENT {
            if current.is_some() {
                // Unterminated block followed by a new one.
                report.dropped += 1;
            }
            current = Some(PendingEvent::default());
        } else if line == END_EVENT {
            let index = report.occurrences.len();
            if let Some(pending) = current.take() {
                match pending.finish(index) {
                    Some(occurrence) => report.occurrences.push(occurrence),
                    None => report.dropped += 1,
                }
            }
        } else if let Some(pending) = current.as_mut() {
            pending.apply(line, options);
        }
    }

    if current.is_some() {
        report.dropped += 1;
    }

    tracing::debug!(
        emitted = report.occurrences.len(),
        dropped = report.dropped,
        "Parsed calendar feed"
    );
    report
}

/// Keep occurrences that start or end after `now`, sorted by start.
///
/// Occurrences with equal starts keep their feed order.
pub fn upcoming(occurrences: Vec<FeedOccurrence>, now: DateTime<Utc>) -> Vec<FeedOccurrence> {
    let mut upcoming: Vec<FeedOccurrence> = occurrences
        .into_iter()
        .filter(|o| o.start > now || o.end > now)
        .collect();
    upcoming.sort_by_key(|o| o.start);
    upcoming
}

// ── Event accumulator ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PendingEvent {
    uid: Option<String>,
    title: Option<String>,
    description: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    all_day: bool,
    malformed: bool,
}

impl PendingEvent {
    fn apply(&mut self, line: &str, options: &FeedOptions) {
        if let Some(rest) = line.strip_prefix("DTSTART") {
            if let Some(parsed) = self.date_field(rest, options) {
                self.start = Some(parsed);
            }
        } else if let Some(rest) = line.strip_prefix("DTEND") {
            if let Some(parsed) = self.date_field(rest, options) {
                self.end = Some(parsed);
            }
        } else if let Some(value) = line.strip_prefix("SUMMARY:") {
            self.title = Some(unescape_text(value));
        } else if let Some(value) = line.strip_prefix("DESCRIPTION:") {
            self.description = Some(unescape_text(value));
        } else if let Some(value) = line.strip_prefix("UID:") {
            self.uid = Some(value.trim().to_string());
        }
    }

    /// Decode the part of a `DTSTART`/`DTEND` line after the property name.
    fn date_field(&mut self, rest: &str, options: &FeedOptions) -> Option<DateTime<Utc>> {
        // "DTSTARTX:..." is some other property.
        if !rest.starts_with(':') && !rest.starts_with(';') {
            return None;
        }
        match parse_date_field(rest, options) {
            Ok((instant, all_day)) => {
                self.all_day |= all_day;
                Some(instant)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Dropping event with unparseable date field");
                self.malformed = true;
                None
            }
        }
    }

    fn finish(self, index: usize) -> Option<FeedOccurrence> {
        if self.malformed {
            return None;
        }
        let start = self.start?;
        let title = self.title.filter(|t| !t.is_empty())?;
        let id = self
            .uid
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("event-{index}"));

        Some(FeedOccurrence {
            id,
            title,
            description: self.description,
            start,
            end: self.end.unwrap_or(start),
            all_day: self.all_day,
        })
    }
}

// ── Field decoding ──────────────────────────────────────────────────────────

/// Decode `[;PARAM=...]:VALUE`, returning the instant and whether it is a
/// date-only (`VALUE=DATE`) value.
fn parse_date_field(
    rest: &str,
    options: &FeedOptions,
) -> Result<(DateTime<Utc>, bool), CalendarError> {
    let (params, value) = rest.split_once(':').ok_or_else(|| {
        CalendarError::InvalidDatetime(format!("missing value separator in '{rest}'"))
    })?;
    let value = value.trim();

    let date_only = params
        .split(';')
        .any(|p| p.trim().eq_ignore_ascii_case("VALUE=DATE"));

    if date_only {
        Ok((parse_date_value(value)?, true))
    } else {
        Ok((parse_datetime_value(value, &options.local_zone)?, false))
    }
}

/// `YYYYMMDD` at UTC midnight.
fn parse_date_value(value: &str) -> Result<DateTime<Utc>, CalendarError> {
    if value.len() != 8 {
        return Err(CalendarError::InvalidDate(format!("'{value}'")));
    }
    let date = NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|e| CalendarError::InvalidDate(format!("'{value}': {e}")))?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CalendarError::InvalidDate(format!("'{value}'")))
}

/// `YYYYMMDDTHHMMSS[Z]`; without `Z` the value is read in `local_zone`.
fn parse_datetime_value(value: &str, local_zone: &Tz) -> Result<DateTime<Utc>, CalendarError> {
    let (digits, is_utc) = match value.strip_suffix(['Z', 'z']) {
        Some(stripped) => (stripped, true),
        None => (value, false),
    };
    if digits.len() != 15 {
        return Err(CalendarError::InvalidDatetime(format!("'{value}'")));
    }
    let naive = NaiveDateTime::parse_from_str(digits, "%Y%m%dT%H%M%S")
        .map_err(|e| CalendarError::InvalidDatetime(format!("'{value}': {e}")))?;

    if is_utc {
        return Ok(naive.and_utc());
    }
    local_zone
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            CalendarError::InvalidDatetime(format!(
                "'{value}' does not exist in {}",
                local_zone.name()
            ))
        })
}

/// Undo iCalendar TEXT escaping: `\n`/`\N`, `\,`, `\;` and `\\`.
///
/// Unknown escapes are kept as written.
fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n' | 'N') => result.push('\n'),
                Some(',') => result.push(','),
                Some(';') => result.push(';'),
                Some('\\') | None => result.push('\\'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

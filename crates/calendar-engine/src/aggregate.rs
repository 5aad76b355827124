//! Merge materialized classes with user-authored events and query by day or
//! month.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};

use crate::model::CalendarEvent;

/// A merged, date-ordered view over recurring and ad-hoc events.
///
/// Construction copies both inputs; neither slice is modified. Building an
/// aggregator twice from equal inputs gives equal results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventAggregator {
    events: Vec<CalendarEvent>,
}

impl EventAggregator {
    /// Merge `recurring` and `ad_hoc` into one list sorted by date.
    ///
    /// Events on the same date keep input order, recurring first. An event
    /// whose id was already taken by an earlier one is dropped.
    pub fn new(recurring: &[CalendarEvent], ad_hoc: &[CalendarEvent]) -> Self {
        let mut seen: HashSet<&str> = HashSet::with_capacity(recurring.len() + ad_hoc.len());
        let mut events = Vec::with_capacity(recurring.len() + ad_hoc.len());

        for event in recurring.iter().chain(ad_hoc) {
            if seen.insert(event.id.as_str()) {
                events.push(event.clone());
            } else {
                tracing::warn!(id = %event.id, "Dropping calendar event with duplicate id");
            }
        }
        events.sort_by_key(|e| e.date);

        Self { events }
    }

    /// Every merged event, ordered by date.
    pub fn merged(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events whose date is exactly `date`.
    pub fn occurrences_on_date(&self, date: NaiveDate) -> Vec<&CalendarEvent> {
        self.events.iter().filter(|e| e.date == date).collect()
    }

    /// Events in the calendar month containing `month_anchor`, grouped by date.
    ///
    /// Only dates with at least one event appear as keys.
    pub fn occurrences_in_month(
        &self,
        month_anchor: NaiveDate,
    ) -> BTreeMap<NaiveDate, Vec<&CalendarEvent>> {
        let mut by_date: BTreeMap<NaiveDate, Vec<&CalendarEvent>> = BTreeMap::new();
        for event in self.events.iter().filter(|e| {
            e.date.year() == month_anchor.year() && e.date.month() == month_anchor.month()
        }) {
            by_date.entry(event.date).or_default().push(event);
        }
        by_date
    }
}

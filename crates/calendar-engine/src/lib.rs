//! # calendar-engine
//!
//! Calendar event materialization for a personal wellness dashboard.
//!
//! The engine turns two kinds of input into calendar events: the text of an
//! external provider's iCalendar feed, and a set of weekly class anchors
//! stored against a fixed reference zone. Everything is pure and synchronous;
//! callers fetch feed text, load anchors and supply "now".
//!
//! ## Modules
//!
//! - [`feed`] — iCalendar feed text → flat list of occurrences
//! - [`zone`] — whole-hour offset between two named timezones
//! - [`recurrence`] — weekly class anchor → dated occurrences in a target zone
//! - [`aggregate`] — merge classes with ad-hoc events, query by day or month
//! - [`source`] — feed sources with fallback, fail-open occurrence cache
//! - [`model`] — shared data types
//! - [`error`] — error types

pub mod aggregate;
pub mod error;
pub mod feed;
pub mod model;
pub mod recurrence;
pub mod source;
pub mod zone;

pub use aggregate::EventAggregator;
pub use error::CalendarError;
pub use feed::{
    parse_feed, parse_feed_report, parse_feed_with_options, upcoming, FeedOptions, FeedParse,
};
pub use model::{CalendarEvent, ClassAnchor, EventType, FeedOccurrence};
pub use recurrence::{materialize, materialize_all, HORIZON_MONTHS, REFERENCE_ZONE};
pub use source::{FallbackSource, FeedCache, FeedSource, TextSource, FEED_REFRESH_INTERVAL};
pub use zone::{offset_hours, offset_hours_at};

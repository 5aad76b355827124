//! Feed text sources and a fail-open cache of parsed occurrences.
//!
//! Fetching is left to the caller's [`FeedSource`] implementations; this
//! module only orders them ([`FallbackSource`]) and decides what stays on
//! screen when a refresh fails ([`FeedCache`]). Nothing here owns a timer:
//! schedulers call [`FeedCache::refresh`] every [`FEED_REFRESH_INTERVAL`].

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::CalendarError;
use crate::feed::{parse_feed_report, upcoming, FeedOptions};
use crate::model::FeedOccurrence;

/// How often schedulers are expected to refresh a provider feed.
pub const FEED_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Something that can produce the full text of a calendar feed.
pub trait FeedSource {
    /// Return the complete feed text.
    ///
    /// Implementations must fail rather than return partial text.
    fn fetch(&self) -> Result<String, CalendarError>;
}

impl<S: FeedSource + ?Sized> FeedSource for &S {
    fn fetch(&self) -> Result<String, CalendarError> {
        (**self).fetch()
    }
}

impl<S: FeedSource + ?Sized> FeedSource for Box<S> {
    fn fetch(&self) -> Result<String, CalendarError> {
        (**self).fetch()
    }
}

/// Already-downloaded feed text.
#[derive(Debug, Clone)]
pub struct TextSource {
    text: String,
}

impl TextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl FeedSource for TextSource {
    fn fetch(&self) -> Result<String, CalendarError> {
        Ok(self.text.clone())
    }
}

/// Tries `primary` (typically a proxy) and falls back to `direct` on error.
#[derive(Debug, Clone)]
pub struct FallbackSource<P, D> {
    primary: P,
    direct: D,
}

impl<P: FeedSource, D: FeedSource> FallbackSource<P, D> {
    pub fn new(primary: P, direct: D) -> Self {
        Self { primary, direct }
    }
}

impl<P: FeedSource, D: FeedSource> FeedSource for FallbackSource<P, D> {
    fn fetch(&self) -> Result<String, CalendarError> {
        match self.primary.fetch() {
            Ok(text) => Ok(text),
            Err(primary_err) => {
                tracing::warn!(error = %primary_err, "Primary feed source failed, trying direct");
                self.direct.fetch().map_err(|direct_err| {
                    CalendarError::FeedUnavailable(format!(
                        "primary: {primary_err}; direct: {direct_err}"
                    ))
                })
            }
        }
    }
}

// ── FeedCache ───────────────────────────────────────────────────────────────

/// The last successfully parsed upcoming occurrences of one feed.
#[derive(Debug, Clone, Default)]
pub struct FeedCache {
    options: FeedOptions,
    occurrences: Vec<FeedOccurrence>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl FeedCache {
    pub fn new(options: FeedOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Fetch, parse and keep the occurrences still upcoming at `now`.
    ///
    /// Returns the number of occurrences kept. On a fetch error the previous
    /// occurrences stay in place and the error is returned.
    pub fn refresh<S: FeedSource + ?Sized>(
        &mut self,
        source: &S,
        now: DateTime<Utc>,
    ) -> Result<usize, CalendarError> {
        let text = match source.fetch() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    kept = self.occurrences.len(),
                    "Feed refresh failed, keeping previous occurrences"
                );
                return Err(e);
            }
        };

        let report = parse_feed_report(&text, &self.options);
        if report.dropped > 0 {
            tracing::info!(dropped = report.dropped, "Dropped malformed feed events");
        }
        self.occurrences = upcoming(report.occurrences, now);
        self.refreshed_at = Some(now);
        Ok(self.occurrences.len())
    }

    pub fn occurrences(&self) -> &[FeedOccurrence] {
        &self.occurrences
    }

    /// When the last successful refresh happened.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// Whether [`FEED_REFRESH_INTERVAL`] has passed since the last success.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.refreshed_at {
            None => true,
            Some(at) => (now - at).num_seconds() >= FEED_REFRESH_INTERVAL.as_secs() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::Cell;

    const FEED: &str = "BEGIN:VEVENT\r\nUID:picnic\r\nDTSTART:20261101T150000Z\r\nSUMMARY:Picnic\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nUID:past\r\nDTSTART:20260101T150000Z\r\nSUMMARY:Old\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nSUMMARY:Broken\r\nEND:VEVENT\r\n";

    struct FailingSource;

    impl FeedSource for FailingSource {
        fn fetch(&self) -> Result<String, CalendarError> {
            Err(CalendarError::FeedUnavailable("connection refused".to_string()))
        }
    }

    /// Counts fetches so tests can see whether a source was consulted.
    struct CountingSource {
        calls: Cell<usize>,
        text: &'static str,
    }

    impl FeedSource for CountingSource {
        fn fetch(&self) -> Result<String, CalendarError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.text.to_string())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    // ── FallbackSource ──────────────────────────────────────────────────

    #[test]
    fn test_fallback_prefers_primary() {
        let direct = CountingSource {
            calls: Cell::new(0),
            text: "direct",
        };
        let source = FallbackSource::new(TextSource::new("proxy"), &direct);
        assert_eq!(source.fetch().unwrap(), "proxy");
        assert_eq!(direct.calls.get(), 0);
    }

    #[test]
    fn test_fallback_uses_direct_on_primary_error() {
        let source = FallbackSource::new(FailingSource, TextSource::new("direct"));
        assert_eq!(source.fetch().unwrap(), "direct");
    }

    #[test]
    fn test_fallback_both_failing_reports_both() {
        let source = FallbackSource::new(FailingSource, FailingSource);
        let err = source.fetch().unwrap_err();
        assert!(matches!(err, CalendarError::FeedUnavailable(_)));
        let message = err.to_string();
        assert!(message.contains("primary"), "got: {message}");
        assert!(message.contains("direct"), "got: {message}");
    }

    #[test]
    fn test_boxed_source() {
        let source: Box<dyn FeedSource> = Box::new(TextSource::new("boxed"));
        assert_eq!(source.fetch().unwrap(), "boxed");
    }

    // ── FeedCache ───────────────────────────────────────────────────────

    #[test]
    fn test_cache_refresh_keeps_upcoming() {
        let mut cache = FeedCache::default();
        let kept = cache.refresh(&TextSource::new(FEED), now()).unwrap();
        assert_eq!(kept, 1);
        assert_eq!(cache.occurrences()[0].id, "picnic");
        assert_eq!(cache.refreshed_at(), Some(now()));
    }

    #[test]
    fn test_cache_fails_open() {
        let mut cache = FeedCache::default();
        cache.refresh(&TextSource::new(FEED), now()).unwrap();

        let later = now() + chrono::TimeDelta::minutes(5);
        let result = cache.refresh(&FailingSource, later);
        assert!(result.is_err());
        assert_eq!(cache.occurrences().len(), 1);
        assert_eq!(cache.refreshed_at(), Some(now()));
    }

    #[test]
    fn test_cache_replaces_on_success() {
        let mut cache = FeedCache::default();
        cache.refresh(&TextSource::new(FEED), now()).unwrap();
        cache.refresh(&TextSource::new(""), now()).unwrap();
        assert!(cache.occurrences().is_empty());
    }

    #[test]
    fn test_cache_uses_options_for_floating_times() {
        let mut cache = FeedCache::new(FeedOptions {
            local_zone: chrono_tz::America::New_York,
        });
        let text = "BEGIN:VEVENT\nDTSTART:20261101T090000\nSUMMARY:Local\nEND:VEVENT\n";
        cache.refresh(&TextSource::new(text), now()).unwrap();
        // November 1 2026 09:00 is EST (UTC-5).
        assert_eq!(
            cache.occurrences()[0].start,
            Utc.with_ymd_and_hms(2026, 11, 1, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_cache_is_due() {
        let mut cache = FeedCache::default();
        assert!(cache.is_due(now()));
        cache.refresh(&TextSource::new(FEED), now()).unwrap();
        assert!(!cache.is_due(now() + chrono::TimeDelta::minutes(4)));
        assert!(cache.is_due(now() + chrono::TimeDelta::minutes(5)));
    }
}

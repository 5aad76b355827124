use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calendar_engine::zone::parse_timezone;
use calendar_engine::{
    materialize_all, offset_hours, parse_feed_report, CalendarError, CalendarEvent, ClassAnchor,
    EventAggregator, FallbackSource, FeedCache, FeedOptions, FeedSource,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Feed text read from a local file.
struct FileSource {
    path: PathBuf,
}

impl FeedSource for FileSource {
    fn fetch(&self) -> Result<String, CalendarError> {
        fs::read_to_string(&self.path).map_err(|e| {
            CalendarError::FeedUnavailable(format!("{}: {e}", self.path.display()))
        })
    }
}

/// Which part of the merged class calendar to print.
pub enum ClassView {
    All,
    Day(NaiveDate),
    Month(NaiveDate),
}

pub fn feed(
    file: PathBuf,
    fallback: Option<PathBuf>,
    all: bool,
    local_zone: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let options = FeedOptions {
        local_zone: parse_timezone(local_zone)?,
    };

    let primary = FileSource { path: file };
    let source: Box<dyn FeedSource> = match fallback {
        Some(path) => Box::new(FallbackSource::new(primary, FileSource { path })),
        None => Box::new(primary),
    };

    if all {
        let text = source.fetch()?;
        let report = parse_feed_report(&text, &options);
        if report.dropped > 0 {
            tracing::info!(dropped = report.dropped, "Dropped malformed feed events");
        }
        return print_json(&report.occurrences);
    }

    let mut cache = FeedCache::new(options);
    cache.refresh(&source, now)?;
    print_json(&cache.occurrences())
}

pub fn offset(from: &str, to: &str) -> Result<()> {
    println!("{}", offset_hours(from, to)?);
    Ok(())
}

pub fn classes(
    anchors_path: &Path,
    events_path: Option<&Path>,
    zone: &str,
    view: ClassView,
    now: DateTime<Utc>,
) -> Result<()> {
    let anchors: Vec<ClassAnchor> = read_json(anchors_path)?;
    let ad_hoc: Vec<CalendarEvent> = match events_path {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let recurring = materialize_all(&anchors, zone, now)?;
    let aggregator = EventAggregator::new(&recurring, &ad_hoc);

    match view {
        ClassView::All => print_json(&aggregator.merged()),
        ClassView::Day(date) => print_json(&aggregator.occurrences_on_date(date)),
        ClassView::Month(month) => print_json(&aggregator.occurrences_in_month(month)),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// wellcal - calendar feed parsing and weekly class schedules
#[derive(Parser)]
#[command(name = "wellcal", version)]
#[command(about = "Parse calendar feeds and materialize weekly classes across timezones", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an iCalendar feed and print its events as JSON
    Feed {
        /// Feed file to read first
        file: PathBuf,

        /// Feed file to read if the first one cannot be read
        #[arg(long)]
        fallback: Option<PathBuf>,

        /// Print past events too, in feed order
        #[arg(long)]
        all: bool,

        /// Zone for date-times without a UTC marker (overrides config)
        #[arg(long)]
        local_zone: Option<String>,

        /// Reference instant instead of the current time (RFC 3339)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Print the whole-hour offset from one timezone to another
    Offset {
        /// Source IANA timezone
        from: String,
        /// Target IANA timezone
        to: String,
    },
    /// Materialize weekly class anchors and print calendar events as JSON
    Classes {
        /// JSON file with an array of class anchors
        anchors: PathBuf,

        /// Target IANA timezone (overrides config)
        #[arg(long)]
        zone: Option<String>,

        /// JSON file with an array of ad-hoc calendar events to merge in
        #[arg(long)]
        events: Option<PathBuf>,

        /// Only print events on this date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "month")]
        date: Option<NaiveDate>,

        /// Print the events of this month grouped by date (YYYY-MM)
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,

        /// Reference instant instead of the current time (RFC 3339)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

fn parse_month(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM, got '{s}': {e}"))
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    init_tracing(&settings.logging.level);
    tracing::debug!(settings = ?settings, "Configuration loaded");

    match cli.command {
        Commands::Feed {
            file,
            fallback,
            all,
            local_zone,
            now,
        } => {
            let local_zone = local_zone.unwrap_or(settings.feed.local_zone);
            commands::feed(
                file,
                fallback,
                all,
                &local_zone,
                now.unwrap_or_else(Utc::now),
            )
        }
        Commands::Offset { from, to } => commands::offset(&from, &to),
        Commands::Classes {
            anchors,
            zone,
            events,
            date,
            month,
            now,
        } => {
            let view = match (date, month) {
                (Some(date), _) => commands::ClassView::Day(date),
                (None, Some(month)) => commands::ClassView::Month(month),
                (None, None) => commands::ClassView::All,
            };
            let zone = zone.unwrap_or(settings.target_zone);
            commands::classes(
                &anchors,
                events.as_deref(),
                &zone,
                view,
                now.unwrap_or_else(Utc::now),
            )
        }
    }
}
